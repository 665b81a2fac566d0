//! Plan Command

use std::collections::BTreeSet;
use std::path::PathBuf;

use alinas_provider::provider::{plan_resource_change, resource_schema};
use alinas_provider::{DynamicValue, PlanAction, PlannedChange, Schema};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::ConfigArgs;
use crate::files::{read_config, StateFile};
use crate::output::{print_json, print_list, render_value, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// State file of an already applied resource
    #[arg(short, long)]
    pub state: Option<PathBuf>,
}

/// One attribute that differs between prior state and plan
#[derive(Debug, Serialize)]
pub struct ChangeRow {
    pub attribute: String,
    pub before: String,
    pub after: String,
    pub forces_replacement: bool,
}

impl TableDisplay for ChangeRow {
    fn headers() -> Vec<&'static str> {
        vec!["Attribute", "Before", "After", ""]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.attribute.clone(),
            self.before.clone(),
            self.after.clone(),
            if self.forces_replacement {
                "forces replacement".red().to_string()
            } else {
                String::new()
            },
        ]
    }
}

/// Attributes the change touches, with sensitive values masked
pub fn change_rows(schema: &Schema, prior: &DynamicValue, change: &PlannedChange) -> Vec<ChangeRow> {
    let before = schema.redact(prior);
    let after = schema.redact(&change.planned_state);

    let keys: BTreeSet<&String> = before
        .as_map()
        .into_iter()
        .chain(after.as_map())
        .flat_map(|m| m.keys())
        .collect();

    keys.into_iter()
        .filter(|key| schema.has_change(prior, &change.planned_state, key))
        .map(|key| ChangeRow {
            attribute: key.clone(),
            before: before.get(key).map(|v| render_value(v, "")).unwrap_or_default(),
            after: match (&change.action, after.get(key)) {
                (PlanAction::Delete, _) => String::new(),
                (_, Some(v)) => render_value(v, "(known after apply)"),
                (_, None) => String::new(),
            },
            forces_replacement: change.requires_replace.iter().any(|r| r == key),
        })
        .collect()
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    resource: &'a str,
    action: PlanAction,
    requires_replace: &'a [String],
    changes: Vec<ChangeRow>,
}

/// Print a planned change
pub fn show_plan(
    type_name: &str,
    prior: &DynamicValue,
    change: &PlannedChange,
    format: OutputFormat,
) -> Result<()> {
    let schema = resource_schema(type_name)?;
    let changes = change_rows(&schema, prior, change);

    match format {
        OutputFormat::Json => print_json(&PlanDocument {
            resource: type_name,
            action: change.action,
            requires_replace: &change.requires_replace,
            changes,
        }),
        OutputFormat::Table => {
            let action = match change.action {
                PlanAction::NoOp => "no changes".green(),
                PlanAction::Create => "create".green(),
                PlanAction::Update => "update in-place".yellow(),
                PlanAction::Replace => "replace".red(),
                PlanAction::Delete => "delete".red(),
            };
            println!("{} will be {}", type_name.bold(), action);
            if change.action != PlanAction::NoOp {
                print_list(&changes, format);
            }
        }
    }
    Ok(())
}

pub fn execute(args: PlanArgs, format: OutputFormat) -> Result<()> {
    let type_name = args.config.type_name.as_str();
    let config = read_config(&args.config.file)?;
    let prior = match &args.state {
        Some(path) => StateFile::new(path).load()?,
        None => DynamicValue::Null,
    };

    let change = plan_resource_change(type_name, &prior, &config)?;
    show_plan(type_name, &prior, &change, format)
}
