//! Administrator views of the security event log

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::filters::{reject, with_auth, with_state, AuthContext, HandlerResult};
use crate::auth::Permission;
use crate::core::SharedAppState;

const DEFAULT_WINDOW_MINUTES: u64 = 60;
const MAX_WINDOW_MINUTES: u64 = 24 * 60;

#[derive(Debug, Default, Deserialize)]
pub struct SecurityEventsQuery {
    pub minutes: Option<u64>,
}

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    warp::path!("admin" / "security-events")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<SecurityEventsQuery>())
        .and(with_state(state))
        .and_then(security_events)
        .boxed()
}

async fn security_events(auth: AuthContext, query: SecurityEventsQuery, state: SharedAppState) -> HandlerResult {
    state
        .authorizer
        .require_permission(&auth.user_id, Permission::ManageSettings)
        .await
        .map_err(reject)?;

    let minutes = query
        .minutes
        .unwrap_or(DEFAULT_WINDOW_MINUTES)
        .clamp(1, MAX_WINDOW_MINUTES);
    let events = state
        .security_logger
        .get_recent_events(Duration::from_secs(minutes * 60))
        .await;
    let counts = state.security_logger.get_event_stats().await;

    Ok(warp::reply::json(&json!({
        "window_minutes": minutes,
        "counts": counts,
        "events": events,
    }))
    .into_response())
}
