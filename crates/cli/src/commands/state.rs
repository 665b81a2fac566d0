//! Refresh, destroy and import commands

use std::path::PathBuf;

use alinas_provider::{DynamicValue, NasProvider};
use anyhow::{bail, Result};
use clap::Args;

use crate::files::StateFile;
use crate::output::{attribute_rows, print_list, print_success, print_warning, OutputFormat};

#[derive(Args, Debug)]
pub struct StateArgs {
    /// Resource type
    #[arg(short = 't', long = "type")]
    pub type_name: String,

    /// State file of the resource
    #[arg(short, long)]
    pub state: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub target: StateArgs,

    /// Composite id of the existing object
    #[arg(long)]
    pub id: String,
}

fn print_state(
    provider: &NasProvider,
    type_name: &str,
    state: &DynamicValue,
    format: OutputFormat,
) -> Result<()> {
    let schema = provider.schema(type_name)?;
    print_list(&attribute_rows(&schema.redact(state), ""), format);
    Ok(())
}

pub async fn refresh(args: StateArgs, provider: &NasProvider, format: OutputFormat) -> Result<()> {
    let state_file = StateFile::new(&args.state);
    let current = state_file.load()?;
    if current.is_null() {
        bail!("no state at {}", args.state.display());
    }

    match provider.read_resource(&args.type_name, &current).await? {
        Some(state) => {
            state_file.store(&state)?;
            print_state(provider, &args.type_name, &state, format)
        }
        None => {
            state_file.remove()?;
            print_warning(&format!(
                "{} {} no longer exists; removed it from state",
                args.type_name,
                current.id().unwrap_or_default()
            ));
            Ok(())
        }
    }
}

pub async fn destroy(args: StateArgs, provider: &NasProvider, format: OutputFormat) -> Result<()> {
    let state_file = StateFile::new(&args.state);
    let prior = state_file.load()?;
    if prior.is_null() {
        print_warning(&format!("nothing to destroy at {}", args.state.display()));
        return Ok(());
    }

    provider
        .apply_resource_change(&args.type_name, &prior, &DynamicValue::Null)
        .await?;
    state_file.remove()?;
    if format == OutputFormat::Table {
        print_success(&format!(
            "{} {} destroyed",
            args.type_name,
            prior.id().unwrap_or_default()
        ));
    }
    Ok(())
}

pub async fn import(args: ImportArgs, provider: &NasProvider, format: OutputFormat) -> Result<()> {
    let state_file = StateFile::new(&args.target.state);
    if !state_file.load()?.is_null() {
        bail!(
            "{} already holds a resource; destroy or remove it first",
            args.target.state.display()
        );
    }

    let state = provider
        .import_resource_state(&args.target.type_name, &args.id)
        .await?;
    state_file.store(&state)?;
    print_state(provider, &args.target.type_name, &state, format)?;
    if format == OutputFormat::Table {
        print_success(&format!("imported {}", state.id().unwrap_or(&args.id)));
    }
    Ok(())
}
