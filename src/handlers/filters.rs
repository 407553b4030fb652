//! Shared warp filters, rejection type and rejection recovery

use std::convert::Infallible;

use serde::de::DeserializeOwned;
use serde_json::json;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::auth::token::extract_request_token;
use crate::constants::MAX_JSON_BODY_BYTES;
use crate::core::SharedAppState;
use crate::error::SiteWorkError;
use crate::security_logger::SecurityEvent;

pub type HandlerResult = std::result::Result<Response, Rejection>;

/// Crate error carried through warp's rejection system
#[derive(Debug)]
pub struct ApiRejection(pub SiteWorkError);

impl warp::reject::Reject for ApiRejection {}

pub fn reject(err: SiteWorkError) -> Rejection {
    warp::reject::custom(ApiRejection(err))
}

/// The authenticated caller, as named by a valid token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
}

pub fn with_state(state: SharedAppState) -> impl Filter<Extract = (SharedAppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Require a valid bearer token (Authorization header, or X-Auth-Token)
pub fn with_auth(state: SharedAppState) -> impl Filter<Extract = (AuthContext,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::header::optional::<String>("x-auth-token"))
        .and(with_state(state))
        .and_then(authenticate)
}

async fn authenticate(
    authorization: Option<String>,
    x_auth_token: Option<String>,
    state: SharedAppState,
) -> std::result::Result<AuthContext, Rejection> {
    let token = extract_request_token(authorization.as_deref(), x_auth_token.as_deref())
        .ok_or_else(|| reject(SiteWorkError::Unauthorized))?;

    match state.tokens.validate_and_get_user_id(&token) {
        Ok(user_id) => Ok(AuthContext { user_id }),
        Err(e) => {
            state
                .security_logger
                .log_event(SecurityEvent::TokenValidationFailed { reason: e.to_string() })
                .await;
            Err(reject(e))
        }
    }
}

/// JSON request body with a size limit
pub fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_BODY_BYTES).and(warp::body::json())
}

pub fn json_response<T: serde::Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub fn message_response(message: &str, status: StatusCode) -> Response {
    json_response(&json!({ "message": message }), status)
}

/// Render a crate error. Validation errors list every failing field.
pub fn error_response(err: &SiteWorkError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    } else {
        log::debug!("Request rejected: {}", err);
    }

    match err {
        SiteWorkError::Validation(errors) => json_response(&json!({ "errors": errors }), status),
        other => message_response(&other.public_message(), status),
    }
}

/// Convert any rejection into a JSON error response
pub async fn handle_rejection(err: Rejection) -> std::result::Result<Response, Infallible> {
    if let Some(ApiRejection(e)) = err.find::<ApiRejection>() {
        return Ok(error_response(e));
    }

    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        log::debug!("Invalid JSON body: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid JSON body".to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(message_response(&message, status))
}
