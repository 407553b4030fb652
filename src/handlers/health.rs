//! Liveness and storage health

use chrono::Utc;
use serde_json::json;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Filter;

use super::filters::{json_response, with_state, HandlerResult};
use crate::core::SharedAppState;

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    warp::path!("health")
        .and(warp::get())
        .and(with_state(state))
        .and_then(health)
        .boxed()
}

async fn health(state: SharedAppState) -> HandlerResult {
    let healthy = match state.storage.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            log::error!("Storage health check failed: {}", e);
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok(json_response(
        &json!({
            "status": if healthy { "ok" } else { "degraded" },
            "storage": state.storage.backend_name(),
            "timestamp": Utc::now(),
        }),
        status,
    ))
}
