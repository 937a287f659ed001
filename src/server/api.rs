//! JSON API under `/api/v1`. Fetch failures become error responses here,
//! unlike pages which render them inline.

use super::host::select_host;
use super::params::RequestParams;
use super::state::SharedState;
use crate::dsl::{QueryKind, QueryParams};
use crate::error::{DashboardError, Result};
use crate::executor::{fetch_data, FetchRequest, QueryResult, ReportOptions};
use crate::store::DashboardChart;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

type Pairs = Query<Vec<(String, String)>>;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/timezone", get(timezone))
        .route("/auth/config", get(auth_config))
        .route("/hosts", get(hosts))
        .route("/menu", get(menu))
        .route("/breadcrumb", get(breadcrumb))
        .route("/queries", get(list_queries))
        .route("/queries/:name", get(get_query))
        .route("/data/:name", get(data))
        .route("/charts/:name", get(chart))
        .route("/explorer/:section", get(explorer))
        .route("/dashboard/charts", get(list_dashboard_charts).post(add_dashboard_chart))
        .route("/dashboard/charts/:title", delete(remove_dashboard_chart))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Dashboard version, registry fingerprint and the server version of the
/// selected host (`null` when it cannot be reached).
async fn version(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    let host = state.host(selection.id)?;

    let empty = QueryParams::new();
    let clickhouse = fetch_data(
        host.executor.as_ref(),
        FetchRequest::new("SELECT version() AS version", &empty),
    )
    .await
    .ok()
    .and_then(|result| first_value(&result, "version"));

    Ok(Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "queries": state.registry.len(),
        "checksum": state.registry.checksum(),
        "clickhouse": clickhouse,
    })))
}

/// The host's configured timezone, or the server's own.
async fn timezone(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    let host = state.host(selection.id)?;
    if let Some(tz) = &host.config.timezone {
        return Ok(Json(json!({ "timezone": tz })));
    }

    let empty = QueryParams::new();
    let result = fetch_data(
        host.executor.as_ref(),
        FetchRequest::new("SELECT timezone() AS timezone", &empty).require_rows(),
    )
    .await?;
    Ok(Json(json!({ "timezone": first_value(&result, "timezone") })))
}

async fn auth_config(State(state): State<SharedState>) -> Json<Value> {
    let auth = &state.config.auth;
    Json(json!({
        "enabled": auth.is_enabled(),
        "providers": auth.providers(),
    }))
}

async fn hosts(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "hosts": state.config.hosts }))
}

async fn menu(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "items": state.menu }))
}

async fn breadcrumb(State(state): State<SharedState>, Query(pairs): Pairs) -> Json<Value> {
    let params = RequestParams::new(pairs);
    let path = params.get("path").unwrap_or("/");
    Json(json!({
        "path": path,
        "items": state.menu.breadcrumb(path),
    }))
}

#[derive(Serialize)]
struct QuerySummary<'a> {
    name: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    kind: QueryKind,
    optional: bool,
}

async fn list_queries(State(state): State<SharedState>) -> Json<Value> {
    let queries: Vec<QuerySummary<'_>> = state
        .registry
        .list()
        .iter()
        .map(|c| QuerySummary {
            name: &c.name,
            title: &c.title,
            description: c.description.as_deref(),
            kind: c.kind,
            optional: c.optional,
        })
        .collect();
    Json(json!({ "queries": queries }))
}

async fn get_query(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let config = state.registry.get(&name)?;
    Ok(Json(serde_json::to_value(config)?))
}

async fn data(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    let config = state.registry.get(&name)?;
    let options = params.report_options()?;

    let report = state
        .runner(selection.id)?
        .run_report(config, &params.to_map(), &options)
        .await?;
    let result = report.outcome?;

    Ok(Json(json!({
        "name": report.name,
        "query_id": result.query_id,
        "columns": result.columns,
        "rows": result.rows,
        "statistics": result.statistics,
        "page": report.page,
        "page_size": report.page_size,
        "has_more": report.has_more,
    })))
}

async fn chart(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    let config = state.registry.get(&name)?;
    if !config.is_chart() {
        return Err(DashboardError::InvalidParam(format!(
            "'{}' is not a chart",
            name
        )));
    }

    let chart = state
        .runner(selection.id)?
        .run_chart(config, &params.to_map())
        .await?;
    let result = chart.outcome?;

    Ok(Json(json!({
        "name": chart.name,
        "title": chart.title,
        "chart": config.chart,
        "query_id": result.query_id,
        "rows": result.rows,
    })))
}

/// `/explorer/{databases,tables,columns,ddl,indexes,projections}`, each
/// backed by the `explorer-<section>` query config.
async fn explorer(
    State(state): State<SharedState>,
    Path(section): Path<String>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    let config = state.registry.get(&format!("explorer-{}", section))?;

    let report = state
        .runner(selection.id)?
        .run_report(config, &params.to_map(), &ReportOptions::default())
        .await?;
    let result = report.outcome?;

    Ok(Json(json!({
        "section": section,
        "query_id": result.query_id,
        "rows": result.rows,
        "has_more": report.has_more,
    })))
}

async fn list_dashboard_charts(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    let charts = state.host(selection.id)?.dashboard.list_charts().await?;
    Ok(Json(json!({ "charts": charts })))
}

async fn add_dashboard_chart(
    State(state): State<SharedState>,
    Query(pairs): Pairs,
    headers: HeaderMap,
    Json(chart): Json<DashboardChart>,
) -> Result<(StatusCode, Json<DashboardChart>)> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    state.host(selection.id)?.dashboard.add_chart(&chart).await?;
    Ok((StatusCode::CREATED, Json(chart)))
}

async fn remove_dashboard_chart(
    State(state): State<SharedState>,
    Path(title): Path<String>,
    Query(pairs): Pairs,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let params = RequestParams::new(pairs);
    let selection = select_host(params.get("host"), &headers, state.host_count())?;
    state.host(selection.id)?.dashboard.remove_chart(&title).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn first_value(result: &QueryResult, column: &str) -> Option<Value> {
    result.rows.first().and_then(|row| row.get(column)).cloned()
}
