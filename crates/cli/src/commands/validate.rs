//! Validate Command

use alinas_provider::provider::validate_resource_config;
use anyhow::{bail, Result};

use super::ConfigArgs;
use crate::files::read_config;
use crate::output::{print_list, print_success, OutputFormat};

pub fn execute(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    let config = read_config(&args.file)?;
    let diags = validate_resource_config(&args.type_name, &config)?;
    let errors = diags.iter().filter(|d| d.is_error()).count();

    if diags.is_empty() && format == OutputFormat::Table {
        print_success(&format!("{} configuration is valid", args.type_name));
        return Ok(());
    }
    print_list(&diags, format);

    if errors > 0 {
        bail!("{} configuration has {} error(s)", args.type_name, errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &TempDir, body: &str) -> ConfigArgs {
        let file = dir.path().join("rule.json");
        std::fs::write(&file, body).unwrap();
        ConfigArgs {
            type_name: "alicloud_nas_access_rule".to_string(),
            file,
        }
    }

    #[test]
    fn test_valid_config() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir, r#"{"access_group_name": "g", "source_cidr_ip": "10.0.0.0/8"}"#);
        execute(args, OutputFormat::Json).unwrap();
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        let args = args(&dir, r#"{"access_group_name": "g", "priority": 500}"#);
        let err = execute(args, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("error(s)"));
    }
}
