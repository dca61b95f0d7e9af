mod handlers;
mod state;
mod static_files;

use axum::Router;
use axum::routing::get;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::search::HospitalFinder;

pub fn build_router(finder: HospitalFinder) -> Router {
    // Leave the pipeline's own deadline room to report first
    let request_timeout = finder.config().timeout() + Duration::from_secs(5);
    let state = Arc::new(AppState {
        finder: Arc::new(finder),
        request_timeout,
    });

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/{country}/{state}/{district}/{area}/hospitals",
            get(handlers::hospitals),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(finder: HospitalFinder, config: &ServerConfig) -> std::io::Result<()> {
    let app = build_router(finder);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "hospital finder listening");
    axum::serve(listener, app).await
}
