//! Page layout and the report, chart and alert fragments pages are built
//! from. Plain `format!` templates; every interpolated value is escaped.

use super::chart::render_chart;
use super::format::{html_escape, RenderContext};
use super::table::{render_table, TableOptions};
use super::url::PageUrl;
use crate::config::HostConfig;
use crate::dsl::{QueryConfig, QueryRegistry};
use crate::executor::{ChartData, FetchError, ReportData, SortSpec};
use crate::menu::{Menu, MenuItem};

const STYLE: &str = include_str!("../../assets/style.css");

/// Chrome shared by every HTML page.
pub struct Layout<'a> {
    pub title: &'a str,
    pub path: &'a str,
    pub menu: &'a Menu,
    pub hosts: &'a [HostConfig],
    pub host: usize,
    /// Seconds between automatic reloads.
    pub refresh: Option<u64>,
}

impl Layout<'_> {
    pub fn render(&self, body: &str) -> String {
        let refresh = self
            .refresh
            .filter(|secs| *secs > 0)
            .map(|secs| format!(r#"<meta http-equiv="refresh" content="{}">"#, secs))
            .unwrap_or_default();
        let crumbs = self.menu.breadcrumb(self.path);
        let breadcrumb = if crumbs.is_empty() {
            String::new()
        } else {
            let items: Vec<String> = crumbs.iter().map(|c| html_escape(c)).collect();
            format!(
                r#"<nav class="breadcrumb">{}</nav>"#,
                items.join(r#" <span class="sep">/</span> "#)
            )
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
{refresh}
<title>{title} - chmonitor</title>
<style>
{css}
</style>
</head>
<body>
<div class="container">
<nav class="sidebar">
<div class="logo"><a href="/overview?host={host}">chmonitor</a></div>
{hosts}
{nav}
</nav>
<main class="content">
{breadcrumb}
{body}
</main>
</div>
</body>
</html>"#,
            refresh = refresh,
            title = html_escape(self.title),
            css = STYLE,
            host = self.host,
            hosts = self.host_selector(),
            nav = nav_list(self.menu.items(), self.path, self.host),
            breadcrumb = breadcrumb,
            body = body,
        )
    }

    fn host_selector(&self) -> String {
        if self.hosts.len() < 2 {
            return self
                .hosts
                .first()
                .map(|h| format!(r#"<div class="host">{}</div>"#, html_escape(&h.name)))
                .unwrap_or_default();
        }
        let options: Vec<String> = self
            .hosts
            .iter()
            .map(|h| {
                format!(
                    r#"<option value="{}"{}>{}</option>"#,
                    h.id,
                    if h.id == self.host { " selected" } else { "" },
                    html_escape(&h.name)
                )
            })
            .collect();
        format!(
            r#"<form class="host-selector" method="get" action="{}"><select name="host" onchange="this.form.submit()">{}</select></form>"#,
            html_escape(self.path),
            options.join("")
        )
    }
}

fn nav_list(items: &[MenuItem], current: &str, host: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul class=\"nav\">");
    for item in items {
        let active = item.path() == Some(current);
        html.push_str(if active { "<li class=\"active\">" } else { "<li>" });
        match &item.href {
            Some(href) => {
                let sep = if href.contains('?') { '&' } else { '?' };
                html.push_str(&format!(
                    r#"<a href="{}{}host={}" title="{}">{}</a>"#,
                    html_escape(href),
                    sep,
                    host,
                    html_escape(item.description.as_deref().unwrap_or("")),
                    html_escape(&item.title)
                ));
            }
            None => html.push_str(&format!(
                r#"<span class="group">{}</span>"#,
                html_escape(&item.title)
            )),
        }
        html.push_str(&nav_list(&item.items, current, host));
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

/// Alert box for a fetch failure; `no_data` renders as a neutral notice.
pub fn render_alert(error: &FetchError) -> String {
    let class = if error.kind.is_informational() {
        "alert alert-info"
    } else {
        "alert alert-error"
    };
    let mut details = Vec::new();
    if let Some(code) = error.code {
        details.push(format!("code {}", code));
    }
    if let Some(query_id) = &error.query_id {
        details.push(format!("query_id {}", html_escape(query_id)));
    }
    let details = if details.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="alert-details">{}</div>"#, details.join(" · "))
    };
    format!(
        r#"<div class="{}" role="alert" data-kind="{}"><strong>{}</strong><p>{}</p>{}</div>"#,
        class,
        error.kind,
        error.kind.title(),
        html_escape(&error.message),
        details
    )
}

pub fn render_chart_card(config: Option<&QueryConfig>, chart: &ChartData) -> String {
    let body = match (&chart.outcome, config.and_then(|c| c.chart.as_ref())) {
        (Ok(result), Some(def)) => render_chart(def, &result.rows),
        (Ok(_), None) => String::new(),
        (Err(e), _) => render_alert(e),
    };
    format!(
        r#"<section class="card chart-card" id="chart-{}"><h3>{}</h3>{}</section>"#,
        html_escape(&chart.name),
        html_escape(&chart.title),
        body
    )
}

pub fn render_chart_grid(registry: &QueryRegistry, charts: &[ChartData]) -> String {
    if charts.is_empty() {
        return String::new();
    }
    let cards: Vec<String> = charts
        .iter()
        .map(|chart| render_chart_card(registry.find(&chart.name), chart))
        .collect();
    format!(r#"<div class="chart-grid">{}</div>"#, cards.join("\n"))
}

/// Body of a report page: header, filter presets, related charts, the
/// result table (or an alert) and pagination.
pub fn render_report(
    config: &QueryConfig,
    data: &ReportData,
    charts: &str,
    url: &PageUrl,
    sort: Option<&SortSpec>,
    ctx: &RenderContext,
) -> String {
    let mut html = format!("<h1>{}</h1>\n", html_escape(&config.title));
    if let Some(description) = &config.description {
        html.push_str(&format!(
            "<p class=\"description\">{}</p>\n",
            html_escape(description)
        ));
    }
    if let Some(docs) = &config.docs {
        html.push_str(&format!(
            "<p class=\"docs\"><a href=\"{}\" rel=\"noopener\">Documentation</a></p>\n",
            html_escape(docs)
        ));
    }

    html.push_str(&render_filters(config, url));
    html.push_str(charts);

    match &data.outcome {
        Ok(result) => {
            let result_columns = result.column_names();
            let columns = config.display_columns(&result_columns);
            let sort_url = url.without("page");
            let options = TableOptions {
                sort_url: config.sortable.then_some(&sort_url),
                sort,
            };
            html.push_str(&render_table(
                columns,
                &result.rows,
                &config.column_formats,
                ctx,
                &options,
            ));
        }
        Err(e) => html.push_str(&render_alert(e)),
    }

    html.push_str(&render_pagination(data, url));
    html.push_str(&format!(
        "\n<details class=\"sql\"><summary>SQL</summary><pre><code>{}</code></pre></details>",
        html_escape(&data.sql)
    ));
    html
}

fn render_filters(config: &QueryConfig, url: &PageUrl) -> String {
    if config.filters.is_empty() {
        return String::new();
    }
    let selected = url.get_all("filter");
    let base = url.without("page");
    let mut links: Vec<String> = config
        .filters
        .iter()
        .map(|filter| {
            let active = selected.contains(&filter.name.as_str());
            format!(
                r#"<a class="filter{}" href="{}">{}</a>"#,
                if active { " active" } else { "" },
                html_escape(&base.toggle("filter", &filter.name).href()),
                html_escape(&filter.label)
            )
        })
        .collect();
    if !selected.is_empty() {
        links.push(format!(
            r#"<a class="filter clear" href="{}">Clear</a>"#,
            html_escape(&base.without("filter").href())
        ));
    }
    format!(r#"<div class="filters">{}</div>"#, links.join(""))
}

fn render_pagination(data: &ReportData, url: &PageUrl) -> String {
    if data.page_size == 0 || (data.page <= 1 && !data.has_more) {
        return String::new();
    }
    let mut parts = Vec::new();
    if data.page > 1 {
        parts.push(format!(
            r#"<a class="prev" href="{}">← Previous</a>"#,
            html_escape(&url.with("page", &(data.page - 1).to_string()).href())
        ));
    }
    parts.push(format!(r#"<span class="current">Page {}</span>"#, data.page));
    if data.has_more {
        parts.push(format!(
            r#"<a class="next" href="{}">Next →</a>"#,
            html_escape(&url.with("page", &(data.page + 1).to_string()).href())
        ));
    }
    format!(r#"<nav class="pagination">{}</nav>"#, parts.join(" "))
}

/// Standalone error page for request-level failures (unknown report, bad
/// parameter) so they keep the layout.
pub fn render_error_body(title: &str, message: &str) -> String {
    format!(
        r#"<h1>{}</h1><div class="alert alert-error" role="alert"><p>{}</p></div>"#,
        html_escape(title),
        html_escape(message)
    )
}
