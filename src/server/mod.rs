//! HTTP surface: server-rendered pages plus the JSON API under `/api/v1`.

mod api;
mod error;
mod host;
mod middleware;
mod pages;
mod params;
mod state;

pub use host::{select_host, HostSelection, HostSource, HOST_COOKIE};
pub use middleware::legacy_redirect;
pub use params::RequestParams;
pub use state::{AppState, HostHandle, SharedState};

use crate::error::Result;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(pages::root))
        .route("/overview", get(pages::overview))
        .route("/dashboard", get(pages::dashboard).post(pages::dashboard_add))
        .route("/dashboard/remove", post(pages::dashboard_remove))
        .route("/explorer", get(pages::explorer))
        .route("/:name", get(pages::report))
        .nest("/api/v1", api::routes())
        .fallback(pages::not_found)
        .layer(axum::middleware::from_fn(middleware::redirect_legacy_urls))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn serve(state: SharedState, listen: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(listen).await?;
    info!("Listening on http://{}", listen);
    axum::serve(listener, app).await?;
    Ok(())
}
