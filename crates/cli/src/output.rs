//! Output formatting for CLI

use std::collections::BTreeMap;

use alinas_provider::schema::Severity;
use alinas_provider::{Diagnostic, DynamicValue};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// One attribute of a resource state
#[derive(Debug, Serialize, PartialEq)]
pub struct AttributeRow {
    pub attribute: String,
    pub value: String,
}

impl TableDisplay for AttributeRow {
    fn headers() -> Vec<&'static str> {
        vec!["Attribute", "Value"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.attribute.clone(), self.value.clone()]
    }
}

impl TableDisplay for Diagnostic {
    fn headers() -> Vec<&'static str> {
        vec!["Severity", "Attribute", "Summary", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let severity = match self.severity {
            Severity::Error => "error".red().to_string(),
            Severity::Warning => "warning".yellow().to_string(),
        };
        vec![
            severity,
            self.attribute.clone().unwrap_or_default(),
            self.summary.clone(),
            self.detail.clone(),
        ]
    }
}

/// Render a scalar state value for display; `unknown` stands in for null
pub fn render_value(value: &DynamicValue, unknown: &str) -> String {
    match value {
        DynamicValue::Null => unknown.to_string(),
        DynamicValue::String(s) => s.clone(),
        DynamicValue::Bool(b) => b.to_string(),
        DynamicValue::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// State attributes sorted by name
pub fn attribute_rows(state: &DynamicValue, unknown: &str) -> Vec<AttributeRow> {
    let sorted: BTreeMap<&String, &DynamicValue> = state
        .as_map()
        .map(|m| m.iter().collect())
        .unwrap_or_default();
    sorted
        .into_iter()
        .map(|(attribute, value)| AttributeRow {
            attribute: attribute.clone(),
            value: render_value(value, unknown),
        })
        .collect()
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No items found.");
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// Print any serializable document as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow(), message);
}
