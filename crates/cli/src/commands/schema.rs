//! Schema Command

use alinas_provider::provider::resource_schema;
use alinas_provider::schema::{all_schemas, Attribute, Schema};
use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::output::{print_json, print_list, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Only show this resource type
    #[arg(short = 't', long = "type")]
    pub type_name: Option<String>,
}

/// One attribute of one resource type
#[derive(Serialize)]
pub struct AttributeDisplay {
    pub resource: String,
    pub name: String,
    pub kind: String,
    pub mode: String,
    pub force_new: bool,
    pub sensitive: bool,
    pub description: String,
}

impl AttributeDisplay {
    fn new(resource: &str, attr: &Attribute) -> Self {
        let mode = match (attr.required, attr.optional, attr.computed) {
            (true, _, _) => "required",
            (false, true, true) => "optional+computed",
            (false, true, false) => "optional",
            (false, false, _) => "computed",
        };
        Self {
            resource: resource.to_string(),
            name: attr.name.to_string(),
            kind: format!("{:?}", attr.kind).to_lowercase(),
            mode: mode.to_string(),
            force_new: attr.force_new,
            sensitive: attr.sensitive,
            description: attr.description.to_string(),
        }
    }
}

impl TableDisplay for AttributeDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Resource", "Attribute", "Type", "Mode", "Force New", "Sensitive", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.resource.clone(),
            self.name.clone(),
            self.kind.clone(),
            self.mode.clone(),
            if self.force_new { "yes" } else { "" }.to_string(),
            if self.sensitive { "yes" } else { "" }.to_string(),
            self.description.clone(),
        ]
    }
}

fn selected(type_name: Option<&str>) -> Result<Vec<Schema>> {
    Ok(match type_name {
        Some(name) => vec![resource_schema(name)?],
        None => all_schemas(),
    })
}

pub fn execute(args: SchemaArgs, format: OutputFormat) -> Result<()> {
    let schemas = selected(args.type_name.as_deref())?;

    match format {
        OutputFormat::Json => print_json(&schemas),
        OutputFormat::Table => {
            let rows: Vec<AttributeDisplay> = schemas
                .iter()
                .flat_map(|s| s.attributes.iter().map(move |a| AttributeDisplay::new(s.type_name, a)))
                .collect();
            print_list(&rows, format);
        }
    }
    Ok(())
}
