//! Text rendering of outcomes for the terminal

use crate::command::Outcome;
use crate::config::SessionConfig;
use crate::store::{ColumnInfo, SyncReport};
use crate::table::{Column, Table, Value};

/// Limits applied when rendering tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Maximum rows shown
    pub preview_rows: usize,
    /// Maximum characters per cell
    pub cell_width: usize,
}

impl RenderOptions {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            preview_rows: config.preview_rows,
            cell_width: config.cell_width.max(4),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Render an outcome; `None` when there is nothing to print
pub fn render_outcome(outcome: &Outcome, options: &RenderOptions) -> Option<String> {
    match outcome {
        Outcome::None => None,
        Outcome::Message(msg) => Some(format!("{}\n", msg)),
        Outcome::Names(names) => Some(format_names(names)),
        Outcome::Table(table) => Some(format_table(table, options)),
        Outcome::Schema { table, columns } => Some(format_schema(table, columns, options)),
        Outcome::Lines(lines) => Some(lines.iter().map(|l| format!("{}\n", l)).collect()),
        Outcome::Exit(report) => Some(format_flush(report)),
    }
}

/// Format a table as an ASCII grid
pub fn format_table(table: &Table, options: &RenderOptions) -> String {
    if table.has_no_columns() {
        return "(table has no columns)\n".to_string();
    }

    let columns: Vec<String> = table
        .column_names()
        .iter()
        .map(|c| truncate(c, options.cell_width))
        .collect();
    let shown = table.row_count().min(options.preview_rows);
    let rows: Vec<Vec<(String, bool)>> = table
        .rows()
        .take(shown)
        .map(|row| {
            row.iter()
                .map(|v| (truncate(&v.to_string(), options.cell_width), is_numeric(v)))
                .collect()
        })
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (i, (cell, _)) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut output = String::new();

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    // Header
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {} ", pad(c, *w, Align::Center)))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    // Rows
    for row in &rows {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|((cell, numeric), w)| {
                let align = if *numeric { Align::Right } else { Align::Left };
                format!(" {} ", pad(cell, *w, align))
            })
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !rows.is_empty() {
        output.push_str(&separator);
    }

    if shown < table.row_count() {
        output.push_str(&format!(
            "{} row(s), showing first {}\n",
            table.row_count(),
            shown
        ));
    } else {
        output.push_str(&format!("{} row(s)\n", table.row_count()));
    }

    output
}

/// Format the engine's column introspection for a table
pub fn format_schema(name: &str, columns: &[ColumnInfo], options: &RenderOptions) -> String {
    if columns.is_empty() {
        return format!("Table '{}' has no columns in the database.\n", name);
    }

    let mut grid = Table::new();
    let fields: [(&str, Vec<Value>); 6] = [
        ("cid", columns.iter().map(|c| Value::Integer(c.ordinal)).collect()),
        ("name", columns.iter().map(|c| Value::from(c.name.as_str())).collect()),
        (
            "type",
            columns
                .iter()
                .map(|c| Value::from(c.declared_type.as_str()))
                .collect(),
        ),
        ("notnull", columns.iter().map(|c| Value::from(c.not_null)).collect()),
        (
            "default",
            columns.iter().map(|c| Value::from(c.default.clone())).collect(),
        ),
        ("pk", columns.iter().map(|c| Value::from(c.primary_key)).collect()),
    ];
    for (field, values) in fields {
        // every field has one value per column, so lengths always agree
        if grid
            .set_column(field, Column::new(values))
            .is_err()
        {
            break;
        }
    }
    format!("Table '{}':\n{}", name, format_table(&grid, options))
}

/// Format a list of table names
pub fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        return "No tables.\n".to_string();
    }
    let mut output = String::from("Tables:\n");
    for name in names {
        output.push_str(&format!("  {}\n", name));
    }
    output
}

/// Summarize the exit flush
pub fn format_flush(report: &SyncReport) -> String {
    let mut output = format!("Saved {} table(s).", report.synced.len());
    if !report.skipped.is_empty() {
        output.push_str(&format!(
            " Skipped (no columns): {}.",
            report.skipped.join(", ")
        ));
    }
    output.push('\n');
    output
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text, width = width),
        Align::Right => format!("{:>width$}", text, width = width),
        Align::Center => format!("{:^width$}", text, width = width),
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Integer(_) | Value::Real(_))
}

/// Cut `text` to at most `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    let text = text.replace('\n', "\\n");
    if text.chars().count() <= max {
        return text;
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn opts(preview_rows: usize, cell_width: usize) -> RenderOptions {
        RenderOptions {
            preview_rows,
            cell_width,
        }
    }

    #[test]
    fn test_format_table() {
        let table = TableBuilder::new()
            .column("id", vec![1i64, 20])
            .column("name", vec!["a", "bob"])
            .build()
            .unwrap();
        let expected = "\
+----+------+
| id | name |
+----+------+
|  1 | a    |
| 20 | bob  |
+----+------+
2 row(s)
";
        assert_eq!(format_table(&table, &opts(50, 40)), expected);
    }

    #[test]
    fn test_preview_cap_and_truncation() {
        let table = TableBuilder::new()
            .column("text", vec!["abcdefghij", "x", "y"])
            .build()
            .unwrap();
        let out = format_table(&table, &opts(2, 6));
        assert!(out.contains("abc..."));
        assert!(!out.contains("| y"));
        assert!(out.ends_with("3 row(s), showing first 2\n"));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(format_names(&[]), "No tables.\n");
        assert_eq!(
            format_names(&["a".to_string(), "b".to_string()]),
            "Tables:\n  a\n  b\n"
        );
    }

    #[test]
    fn test_format_schema() {
        let columns = vec![ColumnInfo {
            ordinal: 0,
            name: "id".to_string(),
            declared_type: "INTEGER".to_string(),
            not_null: false,
            default: None,
            primary_key: true,
        }];
        let out = format_schema("t", &columns, &opts(50, 40));
        assert!(out.starts_with("Table 't':\n"));
        assert!(out.contains("INTEGER"));
        assert!(out.contains("NULL"));
    }

    #[test]
    fn test_nothing_to_render() {
        assert_eq!(render_outcome(&Outcome::None, &RenderOptions::default()), None);
    }
}
