use crate::error::GatewayError;
use crate::handler::{AnswerSource, RequestHandler};
use crate::model::Request;
use crate::stats::{CacheSnapshot, UpstreamSnapshot};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

pub const DEADLINE_HEADER: &str = "x-request-timeout-ms";
pub const CACHE_HEADER: &str = "x-cache";

pub struct AppState {
    pub handler: Arc<RequestHandler>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/stats", get(stats))
        .route("/finance-ai", post(finance_ai))
        .with_state(state)
}

pub async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "status": "online",
        "message": "Financial Assistant Backend is Running"
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub mode: &'static str,
    pub cache: CacheSnapshot,
    pub upstream: UpstreamSnapshot,
    pub in_flight: usize,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let handler = &state.handler;
    let cache = handler.cache();
    Json(StatsResponse {
        mode: handler.gateway().mode(),
        cache: handler.stats.snapshot(cache.len(), cache.capacity()),
        upstream: handler.gateway().stats.snapshot(),
        in_flight: handler.in_flight_len(),
    })
}

pub async fn finance_ai(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Request>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return GatewayError::Validation(rejection.body_text()).into_response();
        }
    };
    let deadline = match parse_deadline(&headers) {
        Ok(deadline) => deadline,
        Err(e) => return e.into_response(),
    };

    match state.handler.handle(request, deadline).await {
        Ok(answer) => {
            let cache_status = match answer.source {
                AnswerSource::Cache => "hit",
                AnswerSource::Upstream | AnswerSource::Coalesced => "miss",
            };
            info!(
                "Request served in {:?} (source: {:?})",
                start.elapsed(),
                answer.source
            );
            let mut response = (StatusCode::OK, Json(answer.text)).into_response();
            response
                .headers_mut()
                .insert(CACHE_HEADER, HeaderValue::from_static(cache_status));
            response
        }
        Err(e) => {
            if let GatewayError::Upstream(cause) = &e {
                error!("Request failed after {:?}: {}", start.elapsed(), cause);
            }
            e.into_response()
        }
    }
}

fn parse_deadline(headers: &HeaderMap) -> Result<Option<Duration>, GatewayError> {
    let Some(value) = headers.get(DEADLINE_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(|ms| Some(Duration::from_millis(ms)))
        .ok_or_else(|| {
            GatewayError::Validation(format!("{DEADLINE_HEADER} must be a positive integer"))
        })
}
