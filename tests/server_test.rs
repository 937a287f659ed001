use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chmonitor::config::{AppConfig, ConfigOverrides, FileConfig};
use chmonitor::executor::{Executor, FetchError, MockExecutor};
use chmonitor::{router, AppState, QueryRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn config(hosts: &str) -> AppConfig {
    let env = HashMap::from([("CLICKHOUSE_HOST".to_string(), hosts.to_string())]);
    AppConfig::resolve(FileConfig::default(), ConfigOverrides::default(), &env).unwrap()
}

fn app_with(mocks: Vec<Arc<MockExecutor>>) -> Router {
    let hosts: Vec<String> = (0..mocks.len())
        .map(|i| format!("http://ch-{}:8123", i))
        .collect();
    let executors: Vec<Arc<dyn Executor>> = mocks
        .into_iter()
        .map(|m| m as Arc<dyn Executor>)
        .collect();
    let state = AppState::with_executors(
        config(&hosts.join(",")),
        QueryRegistry::builtin().unwrap(),
        executors,
    )
    .unwrap();
    router(Arc::new(state))
}

fn app(mock: MockExecutor) -> Router {
    app_with(vec![Arc::new(mock)])
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = get(app(MockExecutor::new()), "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_unknown_query_is_not_found() {
    let response = get(app(MockExecutor::new()), "/api/v1/data/no-such-report").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["kind"], "not_found");

    let response = get(app(MockExecutor::new()), "/no-such-report").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("no-such-report"));
}

#[tokio::test]
async fn test_data_returns_rows() {
    let mock = MockExecutor::new().with_json_rows(
        "system.disks",
        r#"[{"name": "default", "path": "/var/lib/clickhouse/", "free_space": 1024}]"#,
    );
    let response = get(app(mock), "/api/v1/data/disks").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["rows"][0]["name"], "default");
    assert_eq!(body["page"], 1);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn test_unreachable_host_api_and_page() {
    let down = || MockExecutor::new().failing_with(FetchError::network("Connection refused"));

    let response = get(app(down()), "/api/v1/data/disks").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "network");
    assert_eq!(body["error"]["message"], "Connection refused");

    let response = get(app(down()), "/disks").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"data-kind="network""#));
    assert!(html.contains("Connection refused"));
}

#[tokio::test]
async fn test_bad_page_param_is_bad_request() {
    let response = get(app(MockExecutor::new()), "/api/v1/data/disks?page=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["kind"], "bad_request");
}

#[tokio::test]
async fn test_page_out_of_range_is_bad_request() {
    let uri = format!("/api/v1/data/disks?page={}", u64::MAX);
    let response = get(app(MockExecutor::new()), &uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["kind"], "bad_request");

    let response = get(app(MockExecutor::new()), &format!("/disks?page={}", u64::MAX)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn many_tables(n: usize) -> String {
    let rows: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"database": "db", "table": "t{}", "engine": "MergeTree"}}"#, i))
        .collect();
    format!("[{}]", rows.join(","))
}

#[tokio::test]
async fn test_explorer_paginates_tables() {
    let mock = || MockExecutor::new().with_json_rows("system.tables", &many_tables(150));

    let response = get(app(mock()), "/explorer?database=db").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Next →"));
    assert!(html.contains("page=2"));

    let second = Arc::new(mock());
    let response = get(
        app_with(vec![second.clone()]),
        "/explorer?database=db&page=2&sort=table&order=desc",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Page 2"));
    assert!(html.contains("← Previous"));

    let call = second
        .calls()
        .into_iter()
        .find(|call| call.sql.contains("system.tables"))
        .unwrap();
    assert_eq!(call.params.get("page_offset").map(String::as_str), Some("100"));
    assert_eq!(call.params.get("database").map(String::as_str), Some("db"));
    assert!(call.sql.contains("ORDER BY `table` DESC"));
}

#[tokio::test]
async fn test_legacy_url_redirects() {
    let response = get(app(MockExecutor::new()), "/0/disks?sort=name").await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/disks?host=0&sort=name"
    );
}

#[tokio::test]
async fn test_root_redirects_to_overview() {
    let response = get(app(MockExecutor::new()), "/?host=0").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/overview?host=0");
}

#[tokio::test]
async fn test_breadcrumb() {
    let response = get(
        app(MockExecutor::new()),
        "/api/v1/breadcrumb?path=/running-queries",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let items = body_json(response).await["items"].clone();
    let items = items.as_array().unwrap();
    assert!(!items.is_empty());
    assert_eq!(items.last().unwrap(), "Running Queries");
}

#[tokio::test]
async fn test_host_query_sets_cookie() {
    let second = Arc::new(
        MockExecutor::new().with_json_rows("system.disks", r#"[{"name": "second"}]"#),
    );
    let app = app_with(vec![Arc::new(MockExecutor::new()), second.clone()]);

    let response = get(app.clone(), "/disks?host=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("host=1"));
    assert!(body_text(response).await.contains("second"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/data/disks")
                .header(header::COOKIE, "host=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_json(response).await["rows"][0]["name"], "second");
}

#[tokio::test]
async fn test_unknown_host_is_not_found() {
    let response = get(app(MockExecutor::new()), "/api/v1/data/disks?host=7").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_dashboard_chart() {
    let mock = Arc::new(MockExecutor::new());
    let app = app_with(vec![mock.clone()]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/dashboard/charts")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"title": "Inserts", "sql": "SELECT 1 AS x"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let insert = mock
        .calls()
        .into_iter()
        .find(|call| call.sql.starts_with("INSERT"))
        .unwrap();
    assert_eq!(insert.params.get("title").map(String::as_str), Some("Inserts"));
    assert!(!insert.sql.contains("SELECT 1 AS x"));
}

#[tokio::test]
async fn test_queries_listing() {
    let response = get(app(MockExecutor::new()), "/api/v1/queries").await;
    let body = body_json(response).await;
    let queries = body["queries"].as_array().unwrap();
    assert!(queries.iter().any(|q| q["name"] == "disks"));
    assert!(queries.iter().any(|q| q["kind"] == "chart"));
}

/// Runs every built-in report against a real server and checks that the
/// declared columns exist in the first returned row.
#[tokio::test]
#[ignore]
async fn test_builtin_columns_against_live_server() {
    use chmonitor::executor::{create_clickhouse_executor, ClientSettings, ReportOptions, Runner};
    use chmonitor::QueryValidator;

    let env: HashMap<String, String> = std::env::vars().collect();
    if !env.contains_key("CLICKHOUSE_HOST") {
        return;
    }
    let config =
        AppConfig::resolve(FileConfig::default(), ConfigOverrides::default(), &env).unwrap();
    let executor =
        create_clickhouse_executor(&config.hosts[0], &ClientSettings::default()).unwrap();
    let runner = Runner::new(executor);
    let registry = QueryRegistry::builtin().unwrap();

    for query in registry.tables() {
        if !query.required_params.is_empty() {
            continue;
        }
        let report = runner
            .run_report(query, &HashMap::new(), &ReportOptions::default())
            .await
            .unwrap();
        let Ok(result) = report.outcome else { continue };
        if let Some(row) = result.rows.first() {
            let missing = QueryValidator::missing_in_sample(query, row);
            assert!(missing.is_empty(), "{}: missing {:?}", query.name, missing);
        }
    }
}
