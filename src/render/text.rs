use super::format::{
    format_duration, format_number, format_number_short, format_readable_size, parse_timestamp,
    relative_time, value_as_f64, value_to_string, RenderContext,
};
use crate::dsl::ColumnFormat;
use crate::executor::{FetchError, Row};
use colored::*;
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::builder::Builder;
use tabled::settings::Style;

const MAX_CELL_CHARS: usize = 60;

/// Terminal rendering of a result, same format dispatch as the HTML table.
pub fn render_text_table(
    columns: &[String],
    rows: &[Row],
    formats: &BTreeMap<String, ColumnFormat>,
    ctx: &RenderContext,
) -> String {
    static TEXT: ColumnFormat = ColumnFormat::Text;
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(columns.iter().map(|column| {
            let format = formats.get(column).unwrap_or(&TEXT);
            render_text_cell(format, row.get(column), ctx)
        }));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

pub fn render_text_cell(
    format: &ColumnFormat,
    value: Option<&Value>,
    ctx: &RenderContext,
) -> String {
    let value = match value {
        None | Some(Value::Null) => return String::new(),
        Some(value) => value,
    };
    let numeric = |f: fn(f64) -> String| value_as_f64(value).map(f);
    let text = match format {
        ColumnFormat::Number | ColumnFormat::BackgroundBar => numeric(format_number),
        ColumnFormat::NumberShort => numeric(format_number_short),
        ColumnFormat::ReadableSize => numeric(format_readable_size),
        ColumnFormat::Duration => numeric(format_duration),
        ColumnFormat::RelatedTime => {
            parse_timestamp(&value_to_string(value)).map(|ts| relative_time(ts, ctx.now))
        }
        _ => None,
    };
    truncate(&text.unwrap_or_else(|| value_to_string(value)))
}

fn truncate(text: &str) -> String {
    let single_line = text.replace(['\n', '\t'], " ");
    if single_line.chars().count() <= MAX_CELL_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(MAX_CELL_CHARS - 1).collect();
    format!("{}…", cut)
}

pub fn print_fetch_error(error: &FetchError) {
    let heading = format!("{}:", error.kind.title());
    if error.kind.is_informational() {
        eprintln!("{} {}", heading.yellow(), error.message);
    } else {
        eprintln!("{} {}", heading.red().bold(), error.message);
    }
    if let Some(query_id) = &error.query_id {
        eprintln!("  {} {}", "query_id".dimmed(), query_id);
    }
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}
