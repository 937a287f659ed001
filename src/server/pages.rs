use super::host::{select_host, HostSelection};
use super::params::RequestParams;
use super::state::{AppState, SharedState};
use crate::dsl::QueryParams;
use crate::error::{DashboardError, Result};
use crate::executor::{fetch_data, ChartData, FetchRequest};
use crate::render::{
    html_escape, infer_chart, percent_encode, render_alert, render_chart, render_chart_card,
    render_chart_grid, render_error_body, render_report, render_table, Layout, RenderContext,
    TableOptions,
};
use crate::store::{DashboardChart, Event};
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{HeaderMap, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use futures::future::join_all;
use serde::Deserialize;
use tracing::debug;

type Pairs = Query<Vec<(String, String)>>;

const EXPLORER_TABLE_SECTIONS: [&str; 4] = [
    "explorer-columns",
    "explorer-ddl",
    "explorer-indexes",
    "explorer-projections",
];

pub async fn root(RawQuery(query): RawQuery) -> Redirect {
    match query {
        Some(q) if !q.is_empty() => Redirect::temporary(&format!("/overview?{}", q)),
        _ => Redirect::temporary("/overview"),
    }
}

pub async fn overview(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Response {
    let params = RequestParams::new(pairs);
    let path = "/overview";
    match overview_page(&state, &params, &headers).await {
        Ok(response) => response,
        Err(e) => error_page(&state, path, &params, &headers, e),
    }
}

async fn overview_page(
    state: &SharedState,
    params: &RequestParams,
    headers: &HeaderMap,
) -> Result<Response> {
    let selection = select_host(params.get("host"), headers, state.host_count())?;
    let runner = state.runner(selection.id)?;
    let names: Vec<String> = state.registry.charts().map(|c| c.name.clone()).collect();
    let charts = runner.run_charts(&state.registry, &names, &params.to_map()).await;

    let body = format!(
        "<h1>Overview</h1>\n{}",
        render_chart_grid(&state.registry, &charts)
    );
    Ok(finish(state, &selection, "Overview", "/overview", params.refresh()?, &body))
}

pub async fn report(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Response {
    let params = RequestParams::new(pairs);
    let path = format!("/{}", name);
    match report_page(&state, &name, &params, &headers).await {
        Ok(response) => response,
        Err(e) => error_page(&state, &path, &params, &headers, e),
    }
}

async fn report_page(
    state: &SharedState,
    name: &str,
    params: &RequestParams,
    headers: &HeaderMap,
) -> Result<Response> {
    let selection = select_host(params.get("host"), headers, state.host_count())?;
    let config = state.registry.get(name)?;
    let runner = state.runner(selection.id)?;
    let request = params.to_map();
    let path = format!("/{}", name);
    let ctx = RenderContext::new(selection.id);

    let body = if config.is_chart() {
        let chart = runner.run_chart(config, &request).await?;
        format!(
            "<h1>{}</h1>\n{}",
            html_escape(&config.title),
            render_chart_card(Some(config), &chart)
        )
    } else {
        let options = params.report_options()?;
        let (data, charts) = runner
            .run_report_with_charts(&state.registry, config, &request, &options)
            .await?;
        render_report(
            config,
            &data,
            &render_chart_grid(&state.registry, &charts),
            &params.page_url(&path),
            options.sort.as_ref(),
            &ctx,
        )
    };

    let refresh = params.refresh()?.or(config.refresh_interval);
    Ok(finish(state, &selection, &config.title, &path, refresh, &body))
}

pub async fn explorer(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Response {
    let params = RequestParams::new(pairs);
    match explorer_page(&state, &params, &headers).await {
        Ok(response) => response,
        Err(e) => error_page(&state, "/explorer", &params, &headers, e),
    }
}

async fn explorer_page(
    state: &SharedState,
    params: &RequestParams,
    headers: &HeaderMap,
) -> Result<Response> {
    let selection = select_host(params.get("host"), headers, state.host_count())?;
    let runner = state.runner(selection.id)?;
    let database = params.get("database").filter(|s| !s.is_empty());
    let table = params.get("table").filter(|s| !s.is_empty());
    let sections: Vec<&str> = match (database, table) {
        (None, _) => vec!["explorer-databases"],
        (Some(_), None) => vec!["explorer-tables"],
        (Some(_), Some(_)) => EXPLORER_TABLE_SECTIONS.to_vec(),
    };

    let request = params.to_map();
    let options = params.report_options()?;
    let ctx = RenderContext::new(selection.id);
    let url = params.page_url("/explorer");

    let configs = sections
        .iter()
        .map(|name| state.registry.get(name))
        .collect::<Result<Vec<_>>>()?;
    let reports = join_all(
        configs
            .iter()
            .map(|config| runner.run_report(config, &request, &options)),
    )
    .await;

    let mut body = explorer_trail(selection.id, database, table);
    for (config, data) in configs.iter().zip(reports) {
        let data = data?;
        body.push_str("<section class=\"explorer-section\">");
        body.push_str(&render_report(
            config,
            &data,
            "",
            &url,
            options.sort.as_ref(),
            &ctx,
        ));
        body.push_str("</section>");
    }

    Ok(finish(state, &selection, "Explorer", "/explorer", params.refresh()?, &body))
}

fn explorer_trail(host: usize, database: Option<&str>, table: Option<&str>) -> String {
    let mut crumbs = vec![format!(r#"<a href="/explorer?host={}">Explorer</a>"#, host)];
    if let Some(database) = database {
        crumbs.push(format!(
            r#"<a href="/explorer?host={}&amp;database={}">{}</a>"#,
            host,
            html_escape(&percent_encode(database)),
            html_escape(database)
        ));
        if let Some(table) = table {
            crumbs.push(html_escape(table));
        }
    }
    format!(r#"<nav class="explorer-trail">{}</nav>"#, crumbs.join(" / "))
}

pub async fn dashboard(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Response {
    let params = RequestParams::new(pairs);
    match dashboard_page(&state, &params, &headers).await {
        Ok(response) => response,
        Err(e) => error_page(&state, "/dashboard", &params, &headers, e),
    }
}

async fn dashboard_page(
    state: &SharedState,
    params: &RequestParams,
    headers: &HeaderMap,
) -> Result<Response> {
    let selection = select_host(params.get("host"), headers, state.host_count())?;
    let host = state.host(selection.id)?;
    let ctx = RenderContext::new(selection.id);

    let mut body = String::from("<h1>Dashboard</h1>\n");
    match host.dashboard.list_charts().await {
        Ok(charts) => {
            let outcomes = join_all(charts.iter().map(|chart| async move {
                let params = QueryParams::new();
                let request = FetchRequest::new(&chart.sql, &params).require_rows();
                ChartData {
                    name: chart.title.clone(),
                    title: chart.title.clone(),
                    outcome: fetch_data(host.executor.as_ref(), request).await,
                }
            }))
            .await;

            body.push_str("<div class=\"chart-grid\">");
            for chart in &outcomes {
                body.push_str(&dashboard_card(chart, selection.id, &ctx));
            }
            body.push_str("</div>");
        }
        Err(DashboardError::Fetch(e)) => body.push_str(&render_alert(&e)),
        Err(e) => return Err(e),
    }
    body.push_str(&add_chart_form(selection.id));

    Ok(finish(state, &selection, "Dashboard", "/dashboard", params.refresh()?, &body))
}

fn dashboard_card(chart: &ChartData, host: usize, ctx: &RenderContext) -> String {
    let content = match &chart.outcome {
        Ok(result) => {
            let columns = result.column_names();
            match infer_chart(&columns, &result.rows) {
                Some(def) => render_chart(&def, &result.rows),
                None => render_table(
                    &columns,
                    &result.rows,
                    &Default::default(),
                    ctx,
                    &TableOptions::default(),
                ),
            }
        }
        Err(e) => render_alert(e),
    };
    format!(
        r#"<section class="card chart-card"><h3>{title}</h3>{content}
<form method="post" action="/dashboard/remove?host={host}"><input type="hidden" name="title" value="{title}"><button type="submit">Remove</button></form></section>"#,
        title = html_escape(&chart.title),
        content = content,
        host = host
    )
}

fn add_chart_form(host: usize) -> String {
    format!(
        r#"<section class="card"><h3>Add chart</h3>
<form method="post" action="/dashboard?host={}">
<p><input name="title" placeholder="Title" required></p>
<p><textarea name="sql" rows="4" cols="80" placeholder="SELECT toStartOfHour(event_time) AS t, count() FROM system.query_log GROUP BY t ORDER BY t" required></textarea></p>
<p><input name="ordering" type="number" value="0" min="0"> <button type="submit">Save</button></p>
</form></section>"#,
        host
    )
}

pub async fn dashboard_add(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
    Form(chart): Form<DashboardChart>,
) -> Response {
    let params = RequestParams::new(pairs);
    let result = async {
        let selection = select_host(params.get("host"), &headers, state.host_count())?;
        state.host(selection.id)?.dashboard.add_chart(&chart).await?;
        Ok::<_, DashboardError>(selection)
    }
    .await;
    match result {
        Ok(selection) => Redirect::to(&format!("/dashboard?host={}", selection.id)).into_response(),
        Err(e) => error_page(&state, "/dashboard", &params, &headers, e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveChartForm {
    pub title: String,
}

pub async fn dashboard_remove(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
    Form(form): Form<RemoveChartForm>,
) -> Response {
    let params = RequestParams::new(pairs);
    let result = async {
        let selection = select_host(params.get("host"), &headers, state.host_count())?;
        state.host(selection.id)?.dashboard.remove_chart(&form.title).await?;
        Ok::<_, DashboardError>(selection)
    }
    .await;
    match result {
        Ok(selection) => Redirect::to(&format!("/dashboard?host={}", selection.id)).into_response(),
        Err(e) => error_page(&state, "/dashboard", &params, &headers, e),
    }
}

pub async fn not_found(
    State(state): State<SharedState>,
    uri: Uri,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Response {
    let params = RequestParams::new(pairs);
    let path = uri.path().to_string();
    error_page(
        &state,
        &path,
        &params,
        &headers,
        DashboardError::QueryNotFound(path.trim_start_matches('/').to_string()),
    )
}

/// Wraps a page body in the layout, records the view and remembers an
/// explicit host choice in a cookie.
fn finish(
    state: &SharedState,
    selection: &HostSelection,
    title: &str,
    path: &str,
    refresh: Option<u64>,
    body: &str,
) -> Response {
    let html = layout(state, title, path, selection.id, refresh).render(body);
    record_view(state, path, selection.id);

    let mut response = Html(html).into_response();
    if let Some((name, value)) = selection.set_cookie() {
        response.headers_mut().insert(name, value);
    }
    response
}

fn layout<'a>(
    state: &'a AppState,
    title: &'a str,
    path: &'a str,
    host: usize,
    refresh: Option<u64>,
) -> Layout<'a> {
    Layout {
        title,
        path,
        menu: &state.menu,
        hosts: &state.config.hosts,
        host,
        refresh,
    }
}

fn record_view(state: &SharedState, path: &str, host: usize) {
    let state = state.clone();
    let event = Event::page_view(path, host);
    tokio::spawn(async move {
        if let Ok(handle) = state.host(host) {
            handle.events.record(&event).await;
        }
    });
}

fn error_page(
    state: &SharedState,
    path: &str,
    params: &RequestParams,
    headers: &HeaderMap,
    error: DashboardError,
) -> Response {
    let status = error.status_code();
    let host = select_host(params.get("host"), headers, state.host_count())
        .map(|s| s.id)
        .unwrap_or(0);
    let title = status.canonical_reason().unwrap_or("Error");
    let body = match &error {
        DashboardError::Fetch(e) => render_alert(e),
        other => render_error_body(title, &other.to_string()),
    };
    debug!(path, status = status.as_u16(), "Rendering error page: {}", error);
    let html = layout(state, title, path, host, None).render(&body);
    (status, Html(html)).into_response()
}
