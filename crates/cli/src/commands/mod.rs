//! CLI Commands

pub mod apply;
pub mod plan;
pub mod schema;
pub mod state;
pub mod validate;

use std::path::{Path, PathBuf};

use alinas_provider::{NasProvider, ProviderConfig};
use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

/// Resource type and configuration file, shared by several commands
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Resource type (alicloud_nas_access_rule, alicloud_nas_smb_acl_attachment)
    #[arg(short = 't', long = "type")]
    pub type_name: String,

    /// JSON file with the resource configuration
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Load provider settings from `path` (if any) and the environment
pub fn load_provider_config(path: Option<&Path>) -> Result<ProviderConfig> {
    let config = match path {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("loading provider config {}", path.display()))?,
        None => {
            let mut config = ProviderConfig::default();
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
    };
    debug!(region = %config.region, endpoint = %config.endpoint_url(), "Provider config loaded");
    Ok(config)
}

/// Build a provider that talks to the API
pub fn connect(path: Option<&Path>) -> Result<NasProvider> {
    let config = load_provider_config(path)?;
    NasProvider::new(config).context("configuring NAS provider")
}
