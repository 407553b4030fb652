//! Portfolio analytics and reports

use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::filters::{reject, with_auth, with_state, AuthContext, HandlerResult};
use crate::auth::{Permission, UserRole};
use crate::core::SharedAppState;

const REPORT_ROLES: [UserRole; 2] = [UserRole::Admin, UserRole::Manager];

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    let summary = warp::path!("analytics" / "summary")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(summary);

    let portfolio = warp::path!("reports" / "portfolio")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(portfolio_report);

    summary.or(portfolio).unify().boxed()
}

async fn summary(auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadAnalytics)
        .await
        .map_err(reject)?;
    let summary = state.analytics.summary_for(&user).await.map_err(reject)?;
    Ok(warp::reply::json(&summary).into_response())
}

async fn portfolio_report(auth: AuthContext, state: SharedAppState) -> HandlerResult {
    state
        .authorizer
        .require_role(&auth.user_id, &REPORT_ROLES)
        .await
        .map_err(reject)?;
    let report = state.analytics.portfolio_report().await.map_err(reject)?;
    Ok(warp::reply::json(&report).into_response())
}
