//! User administration

use serde::Deserialize;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::filters::{json_body, reject, with_auth, with_state, AuthContext, HandlerResult};
use crate::auth::user::UserProfile;
use crate::auth::{Permission, UserRole};
use crate::core::SharedAppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users);

    let update_role = warp::path!("users" / String / "role")
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body::<UpdateRoleRequest>())
        .and(with_state(state))
        .and_then(update_role);

    list.or(update_role).unify().boxed()
}

async fn list_users(auth: AuthContext, state: SharedAppState) -> HandlerResult {
    state
        .authorizer
        .require_permission(&auth.user_id, Permission::ManageUsers)
        .await
        .map_err(reject)?;
    let users = state.credentials.list_users().await.map_err(reject)?;
    let profiles: Vec<UserProfile> = users.iter().map(|user| user.profile()).collect();
    Ok(warp::reply::json(&profiles).into_response())
}

async fn update_role(
    user_id: String,
    auth: AuthContext,
    body: UpdateRoleRequest,
    state: SharedAppState,
) -> HandlerResult {
    let actor = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ManageUsers)
        .await
        .map_err(reject)?;
    let role = body.role.trim().parse::<UserRole>().map_err(reject)?;
    let user = state
        .credentials
        .update_role(&actor.id, &user_id, role)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&user.profile()).into_response())
}
