//! Formatting utilities for CLI output.
//!
//! Provides consistent, colored rendering of agent entries and errors for
//! the `agentcfg` commands.

use serde_json::Value;

use crate::config_store::ConfigEntry;

use super::CliError;

/// ANSI color codes for terminal output
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Dim text
    pub const DIM: &'static str = "\x1b[2m";

    /// Red color
    pub const RED: &'static str = "\x1b[31m";
    /// Green color
    pub const GREEN: &'static str = "\x1b[32m";
    /// Yellow color
    pub const YELLOW: &'static str = "\x1b[33m";
    /// Cyan color
    pub const CYAN: &'static str = "\x1b[36m";
}

/// Formats section headers with styling
pub fn format_header(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::CYAN, text, Colors::RESET)
}

/// Formats field labels with styling
pub fn format_label(text: &str) -> String {
    format!(
        "{}{}{}{}",
        Colors::BOLD,
        Colors::YELLOW,
        text,
        Colors::RESET
    )
}

/// Formats success messages with styling
pub fn format_success(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::GREEN, text, Colors::RESET)
}

/// Formats descriptions with muted styling
pub fn format_description(text: &str) -> String {
    format!("{}{}{}", Colors::DIM, text, Colors::RESET)
}

/// Formats error messages with red styling
pub fn format_error(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::RED, text, Colors::RESET)
}

/// Formats a JSON value for a one-line summary.
///
/// Scalars are shown in full; arrays and objects show their size rather
/// than their contents.
///
/// # Examples
///
/// ```
/// use agentcfg::cli::formatting::format_json_value;
/// use serde_json::json;
///
/// assert_eq!(format_json_value(&json!("hello")), "\"hello\"");
/// assert_eq!(format_json_value(&json!(42)), "42");
/// assert_eq!(format_json_value(&json!([1, 2])), "[2]");
/// ```
pub fn format_json_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => format!("[{}]", arr.len()),
        Value::Object(map) => format!("{{{}}}", map.len()),
    }
}

/// Renders one agent entry as a labeled block.
pub fn format_entry(key: &str, entry: &ConfigEntry) -> String {
    let mut lines = vec![
        format_header(key),
        format!("  {} {}", format_label("prompt:"), entry.prompt),
    ];

    let tools = if entry.tools.is_empty() {
        format_description("(none)")
    } else {
        entry.tools.join(", ")
    };
    lines.push(format!("  {} {}", format_label("tools:"), tools));

    if entry.metadata.is_empty() {
        lines.push(format!(
            "  {} {}",
            format_label("metadata:"),
            format_description("(none)")
        ));
    } else {
        lines.push(format!("  {}", format_label("metadata:")));
        for (field, value) in &entry.metadata {
            lines.push(format!("    {field} = {}", format_json_value(value)));
        }
    }

    lines.push(format!(
        "  {} {}",
        format_label("updated:"),
        entry.updated_at.to_rfc3339()
    ));

    lines.join("\n")
}

/// Parses a `field=value` metadata argument.
///
/// The value is read as JSON when it parses as JSON, and kept as a plain
/// string otherwise, so `retries=3` gives a number and `model=llama3` a string.
///
/// # Errors
/// Returns `CliError::InvalidArguments` if there is no `=` or the field is empty.
pub fn parse_meta(raw: &str) -> Result<(String, Value), CliError> {
    let (field, value) = raw.split_once('=').ok_or_else(|| {
        CliError::InvalidArguments(format!("Expected KEY=VALUE for --meta, got '{raw}'"))
    })?;

    let field = field.trim();
    if field.is_empty() {
        return Err(CliError::InvalidArguments(format!(
            "Metadata key is empty in '{raw}'"
        )));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}
