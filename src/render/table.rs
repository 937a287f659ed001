use super::format::{html_escape, render_cell, value_as_f64, RenderContext};
use super::url::PageUrl;
use crate::dsl::{title_from_name, ColumnFormat};
use crate::executor::{Row, SortSpec};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions<'a> {
    /// Headers become sort links built from this URL when set.
    pub sort_url: Option<&'a PageUrl>,
    pub sort: Option<&'a SortSpec>,
}

/// Renders rows as an HTML table. Each cell's renderer is picked by looking
/// its column up in `formats`; columns without an entry render as text.
pub fn render_table(
    columns: &[String],
    rows: &[Row],
    formats: &BTreeMap<String, ColumnFormat>,
    ctx: &RenderContext,
    options: &TableOptions<'_>,
) -> String {
    if rows.is_empty() {
        return r#"<p class="empty">No rows</p>"#.to_string();
    }

    static TEXT: ColumnFormat = ColumnFormat::Text;
    let column_formats: Vec<&ColumnFormat> = columns
        .iter()
        .map(|c| formats.get(c).unwrap_or(&TEXT))
        .collect();
    let maxima: Vec<f64> = columns
        .iter()
        .zip(&column_formats)
        .map(|(column, format)| match format {
            ColumnFormat::BackgroundBar => column_max(rows, column),
            _ => 0.0,
        })
        .collect();

    let mut html = String::from("<table class=\"data-table\">\n<thead><tr>");
    for (column, format) in columns.iter().zip(&column_formats) {
        html.push_str(&format!(
            "<th class=\"{}\">{}</th>",
            cell_class(format),
            header(column, options)
        ));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in rows {
        html.push_str("<tr>");
        for ((column, format), max) in columns.iter().zip(&column_formats).zip(&maxima) {
            html.push_str(&format!(
                "<td class=\"{}\">{}</td>",
                cell_class(format),
                render_cell(format, row.get(column), row, *max, ctx)
            ));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

fn column_max(rows: &[Row], column: &str) -> f64 {
    rows.iter()
        .filter_map(|row| row.get(column).and_then(value_as_f64))
        .fold(0.0, f64::max)
}

fn cell_class(format: &ColumnFormat) -> String {
    if format.is_numeric() {
        format!("fmt-{} numeric", format.name())
    } else {
        format!("fmt-{}", format.name())
    }
}

fn header(column: &str, options: &TableOptions<'_>) -> String {
    let label = html_escape(&title_from_name(column));
    let Some(url) = options.sort_url else {
        return label;
    };

    let current = options.sort.filter(|s| s.column == column);
    let (order, marker) = match current {
        Some(sort) if !sort.descending => ("desc", " ▲"),
        Some(_) => ("asc", " ▼"),
        None => ("desc", ""),
    };
    let href = url.without("page").with("sort", column).with("order", order).href();
    format!(r#"<a href="{}">{}</a>{}"#, html_escape(&href), label, marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            json!({"name": "a", "size": 100}).as_object().cloned().unwrap(),
            json!({"name": "b"}).as_object().cloned().unwrap(),
        ]
    }

    fn columns() -> Vec<String> {
        vec!["name".to_string(), "size".to_string()]
    }

    #[test]
    fn test_missing_value_renders_empty_cell() {
        let formats = BTreeMap::from([("size".to_string(), ColumnFormat::BackgroundBar)]);
        let html = render_table(
            &columns(),
            &rows(),
            &formats,
            &RenderContext::new(0),
            &TableOptions::default(),
        );
        assert!(html.contains("<td class=\"fmt-background_bar numeric\"></td>"));
        assert!(html.contains("width: 100.0%"));
    }

    #[test]
    fn test_sort_links() {
        let url = PageUrl::new("/disks", vec![("page".to_string(), "2".to_string())]);
        let sort = SortSpec {
            column: "size".to_string(),
            descending: false,
        };
        let html = render_table(
            &columns(),
            &rows(),
            &BTreeMap::new(),
            &RenderContext::new(0),
            &TableOptions {
                sort_url: Some(&url),
                sort: Some(&sort),
            },
        );
        assert!(html.contains("/disks?sort=size&amp;order=desc"));
        assert!(html.contains("▲"));
        assert!(html.contains("/disks?sort=name&amp;order=desc"));
    }

    #[test]
    fn test_empty_rows() {
        let html = render_table(
            &columns(),
            &[],
            &BTreeMap::new(),
            &RenderContext::new(0),
            &TableOptions::default(),
        );
        assert!(html.contains("No rows"));
    }
}
