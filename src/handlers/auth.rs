//! Account endpoints: sign-up, login, password management and profile

use serde::Serialize;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::filters::{
    json_body, json_response, message_response, reject, with_auth, with_state, AuthContext,
    HandlerResult,
};
use crate::auth::credentials::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    SignupRequest, UpdateProfileRequest,
};
use crate::auth::user::{normalize_email, UserProfile, UserRole};
use crate::core::SharedAppState;
use crate::error::SiteWorkError;

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    let signup = warp::path!("auth" / "signup")
        .and(warp::post())
        .and(json_body::<SignupRequest>())
        .and(with_state(state.clone()))
        .and_then(signup);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(json_body::<LoginRequest>())
        .and(with_state(state.clone()))
        .and_then(login);

    let forgot = warp::path!("auth" / "forgot-password")
        .and(warp::post())
        .and(json_body::<ForgotPasswordRequest>())
        .and(with_state(state.clone()))
        .and_then(forgot_password);

    let reset = warp::path!("auth" / "reset-password")
        .and(warp::post())
        .and(json_body::<ResetPasswordRequest>())
        .and(with_state(state.clone()))
        .and_then(reset_password);

    let change = warp::path!("auth" / "change-password")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(json_body::<ChangePasswordRequest>())
        .and(with_state(state.clone()))
        .and_then(change_password);

    let me = warp::path!("auth" / "me")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(me);

    let profile = warp::path!("auth" / "profile")
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(json_body::<UpdateProfileRequest>())
        .and(with_state(state))
        .and_then(update_profile);

    signup
        .or(login)
        .unify()
        .or(forgot)
        .unify()
        .or(reset)
        .unify()
        .or(change)
        .unify()
        .or(me)
        .unify()
        .or(profile)
        .unify()
        .boxed()
}

async fn check_attempt_limit(state: &SharedAppState, key: &str) -> Result<(), warp::Rejection> {
    if state.auth_limiter.allow_attempt(key).await {
        Ok(())
    } else {
        log::warn!("Too many authentication attempts for {}", key);
        Err(reject(SiteWorkError::RateLimited))
    }
}

async fn signup(body: SignupRequest, state: SharedAppState) -> HandlerResult {
    // Public sign-up always creates a regular user; roles are granted by admins
    let user = state
        .credentials
        .create_user(body, UserRole::User)
        .await
        .map_err(reject)?;
    let token = state.tokens.issue_for(&user).map_err(reject)?;

    Ok(json_response(
        &AuthResponse {
            token,
            user: user.profile(),
        },
        StatusCode::CREATED,
    ))
}

async fn login(body: LoginRequest, state: SharedAppState) -> HandlerResult {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(reject(SiteWorkError::BadRequest(
            "Email and password are required".to_string(),
        )));
    }
    check_attempt_limit(&state, &normalize_email(&body.email)).await?;

    let user = state
        .credentials
        .authenticate(&body.email, &body.password)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(SiteWorkError::AuthError("Invalid email or password".to_string())))?;
    let token = state.tokens.issue_for(&user).map_err(reject)?;

    Ok(json_response(
        &AuthResponse {
            token,
            user: user.profile(),
        },
        StatusCode::OK,
    ))
}

async fn forgot_password(body: ForgotPasswordRequest, state: SharedAppState) -> HandlerResult {
    if body.email.trim().is_empty() {
        return Err(reject(SiteWorkError::invalid_field("email", "email is required")));
    }
    check_attempt_limit(&state, &format!("reset:{}", normalize_email(&body.email))).await?;

    state.credentials.forgot_password(&body.email).await.map_err(reject)?;
    Ok(message_response(FORGOT_PASSWORD_MESSAGE, StatusCode::OK))
}

async fn reset_password(body: ResetPasswordRequest, state: SharedAppState) -> HandlerResult {
    if body.token.trim().is_empty() {
        return Err(reject(SiteWorkError::invalid_field("token", "token is required")));
    }
    state
        .credentials
        .reset_password(&body.token, &body.password)
        .await
        .map_err(reject)?;
    Ok(message_response("Password has been reset", StatusCode::OK))
}

async fn change_password(
    auth: AuthContext,
    body: ChangePasswordRequest,
    state: SharedAppState,
) -> HandlerResult {
    state
        .credentials
        .change_password(&auth.user_id, body)
        .await
        .map_err(reject)?;
    Ok(message_response("Password changed", StatusCode::OK))
}

async fn me(auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state.authorizer.current_user(&auth.user_id).await.map_err(reject)?;
    Ok(warp::reply::json(&user.profile()).into_response())
}

async fn update_profile(
    auth: AuthContext,
    body: UpdateProfileRequest,
    state: SharedAppState,
) -> HandlerResult {
    let user = state
        .credentials
        .update_profile(&auth.user_id, body)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&user.profile()).into_response())
}
