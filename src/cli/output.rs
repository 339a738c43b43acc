//! CLI Output Formatting.
//!
//! Renders command results as styled text, JSON or tables.

use console::style;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
    /// Table format
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "table" | "tbl" => Ok(OutputFormat::Table),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Whether output is machine-readable
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    format: OutputFormat,
    color: bool,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format, color: true }
    }

    /// Enable or disable color
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        self.status_line("success", "✓", message, |s| style(s).green().to_string());
    }

    /// Print error message (stderr)
    pub fn error(&self, message: &str) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ "status": "error", "message": message }));
        } else if self.color {
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        self.status_line("warning", "⚠", message, |s| style(s).yellow().to_string());
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        self.status_line("info", "ℹ", message, |s| style(s).blue().to_string());
    }

    fn status_line(&self, status: &str, symbol: &str, message: &str, paint: impl Fn(&str) -> String) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ "status": status, "message": message }));
        } else if self.color {
            println!("{} {}", paint(symbol), message);
        } else {
            println!("{}: {}", status.to_uppercase(), message);
        }
    }

    /// Print data
    pub fn data<T: Serialize>(&self, data: &T) {
        if self.format.is_json() {
            self.print_json(data);
        } else if let Ok(json) = serde_json::to_value(data) {
            print!("{}", self.render_text(&json));
        }
    }

    /// Print table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.format.is_json() {
            let data: Vec<BTreeMap<&str, &str>> = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (*h, v.as_str()))
                        .collect()
                })
                .collect();
            self.print_json(&data);
        } else {
            print!("{}", self.render_table(headers, rows));
        }
    }

    /// Print key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.format.is_json() {
            self.print_json(&serde_json::json!({ key: value }));
        } else if self.color {
            println!("{}: {}", style(key).bold(), value);
        } else {
            println!("{}: {}", key, value);
        }
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        if self.format.is_json() {
            return;
        }
        println!();
        if self.color {
            println!("{}", style(format!("=== {} ===", title)).cyan().bold());
        } else {
            println!("=== {} ===", title);
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, data: &T) {
        let output = if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };

        if let Ok(json) = output {
            println!("{}", json);
        }
    }

    /// Render a JSON value as indented text
    pub fn render_text(&self, json: &serde_json::Value) -> String {
        let mut out = String::new();
        self.write_text(&mut out, json, 0);
        out
    }

    fn write_text(&self, out: &mut String, json: &serde_json::Value, indent: usize) {
        let prefix = "  ".repeat(indent);

        match json {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let key = if self.color {
                        style(key).bold().to_string()
                    } else {
                        key.clone()
                    };
                    match value {
                        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                            let _ = writeln!(out, "{}{}:", prefix, key);
                            self.write_text(out, value, indent + 1);
                        }
                        _ => {
                            let _ = writeln!(out, "{}{}: {}", prefix, key, format_value(value));
                        }
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for (i, item) in arr.iter().enumerate() {
                    let _ = writeln!(out, "{}[{}]:", prefix, i);
                    self.write_text(out, item, indent + 1);
                }
            }
            _ => {
                let _ = writeln!(out, "{}{}", prefix, format_value(json));
            }
        }
    }

    /// Render rows as an aligned text table
    pub fn render_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut out = String::new();
        if headers.is_empty() {
            return out;
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let header_line: Vec<String> = headers
            .iter()
            .zip(widths.iter())
            .map(|(h, w)| format!("{:w$}", h, w = *w))
            .collect();
        let header_line = header_line.join(" | ");
        if self.color {
            let _ = writeln!(out, "{}", style(header_line).bold());
        } else {
            let _ = writeln!(out, "{}", header_line);
        }

        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", separator.join("-+-"));

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let width = widths.get(i).copied().unwrap_or(0);
                    format!("{:width$}", cell, width = width)
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(" | "));
        }
        out
    }
}

/// Format a JSON value for text output
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "-".into(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::Table.is_json());
    }

    #[test]
    fn test_render_text_nested() {
        let formatter = OutputFormatter::new(OutputFormat::Text).with_color(false);
        let text = formatter.render_text(&serde_json::json!({
            "pool": { "balance": "100000 GBTS" },
            "solvent": true
        }));
        assert_eq!(text, "pool:\n  balance: 100000 GBTS\nsolvent: true\n");
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let formatter = OutputFormatter::new(OutputFormat::Table).with_color(false);
        let table = formatter.render_table(
            &["name", "value"],
            &[
                vec!["min_bet".into(), "25 GBTS".into()],
                vec!["round_timeout".into(), "86400".into()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "name          | value  ");
        assert_eq!(lines[1], "--------------+--------");
        assert_eq!(lines[2], "min_bet       | 25 GBTS");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&serde_json::Value::Null), "-");
        assert_eq!(format_value(&serde_json::json!(42)), "42");
        assert_eq!(format_value(&serde_json::json!("hello")), "hello");
    }
}
