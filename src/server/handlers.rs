use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::domain::LocationQuery;
use crate::search::aggregator::summary_message;
use crate::search::{ErrorResponse, HospitalsResponse, ResultSet, SearchError};

use super::state::AppState;
use super::static_files;

// ─── Static form ─────────────────────────────────────────────────

pub async fn index() -> Html<&'static str> {
    Html(static_files::INDEX_HTML)
}

// ─── GET /{country}/{state}/{district}/{area}/hospitals ──────────

pub async fn hospitals(
    State(state): State<Arc<AppState>>,
    Path((country, region, district, area)): Path<(String, String, String, String)>,
) -> Response {
    let start = Instant::now();
    let query = LocationQuery::new(country, region, district, area);

    let finder = Arc::clone(&state.finder);
    let task_query = query.clone();
    // The pipeline does blocking network I/O
    let task = tokio::task::spawn_blocking(move || finder.find(&task_query));

    let outcome = match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => {
            error!(error = %join_error, "search task panicked");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
        Err(_) => Err(SearchError::Timeout(state.request_timeout)),
    };

    let response = respond(&query, outcome);
    info!(
        country = %query.country,
        state = %query.state,
        district = %query.district,
        area = %query.area,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "GET hospitals"
    );
    response
}

/// Map a pipeline outcome onto status code and JSON body.
pub(super) fn respond(query: &LocationQuery, outcome: Result<ResultSet, SearchError>) -> Response {
    match outcome {
        Ok(result) if result.is_empty() => {
            (StatusCode::NOT_FOUND, Json(HospitalsResponse::from(&result))).into_response()
        }
        Ok(result) => (StatusCode::OK, Json(HospitalsResponse::from(&result))).into_response(),
        Err(SearchError::NoLocationFound { query: searched }) => {
            warn!(query = %searched, "location could not be resolved");
            let body = HospitalsResponse::empty(summary_message(0, query.focus_name()));
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(e @ SearchError::SourceUnavailable { .. }) => {
            error!(error = %e, "map data providers unavailable");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Map data provider is unavailable, please try again later",
            )
        }
        Err(e @ SearchError::Timeout(_)) => {
            warn!(error = %e, "search timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "Search timed out, please try again")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse {
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}
