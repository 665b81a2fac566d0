//! Apply Command

use std::path::PathBuf;

use alinas_provider::{NasProvider, PlanAction};
use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use super::ConfigArgs;
use crate::commands::plan::show_plan;
use crate::files::{read_config, StateFile};
use crate::output::{attribute_rows, print_list, print_success, print_warning, OutputFormat};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// State file, created on first apply
    #[arg(short, long)]
    pub state: PathBuf,
}

pub async fn execute(args: ApplyArgs, provider: &NasProvider, format: OutputFormat) -> Result<()> {
    let type_name = args.config.type_name.as_str();
    let config = read_config(&args.config.file)?;
    let state_file = StateFile::new(&args.state);
    let stored = state_file.load()?;

    let diags = provider.validate_resource_config(type_name, &config)?;
    for diag in &diags {
        print_warning(&diag.to_string());
    }
    let errors = diags.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        bail!("{} configuration has {} error(s)", type_name, errors);
    }

    let prior = provider.refresh_prior(type_name, &stored).await?;
    if !stored.is_null() && prior.is_null() {
        print_warning(&format!(
            "{} {} no longer exists; it will be created",
            type_name,
            stored.id().unwrap_or_default()
        ));
    }
    state_file.store(&prior)?;

    let change = provider.plan_resource_change(type_name, &prior, &config)?;
    show_plan(type_name, &prior, &change, format)?;
    if change.action == PlanAction::NoOp {
        return Ok(());
    }

    let new_state = provider
        .apply_resource_change(type_name, &prior, &change.planned_state)
        .await?;
    state_file.store(&new_state)?;
    info!(state = %state_file.path().display(), action = %change.action, "Applied {}", type_name);

    let schema = provider.schema(type_name)?;
    print_list(&attribute_rows(&schema.redact(&new_state), ""), format);
    if format == OutputFormat::Table {
        print_success(&format!("{} {}d", type_name, change.action));
    }
    Ok(())
}
