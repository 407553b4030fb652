//! HTTP routes. Every endpoint lives under `/api`; uploaded blobs are served
//! from `/uploads`.

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod files;
pub mod filters;
pub mod health;
pub mod projects;
pub mod users;

use std::convert::Infallible;

use warp::{Filter, Reply};

use crate::constants::{API_PREFIX, UPLOADS_PATH};
use crate::core::SharedAppState;
use crate::security::{with_api_security_headers, with_upload_security_headers};

pub use filters::{handle_rejection, ApiRejection, AuthContext};

/// The complete filter tree of the service
pub fn routes(state: SharedAppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path(API_PREFIX)
        .and(
            auth::routes(state.clone())
                .or(projects::routes(state.clone()))
                .unify()
                .or(files::routes(state.clone()))
                .unify()
                .or(analytics::routes(state.clone()))
                .unify()
                .or(users::routes(state.clone()))
                .unify()
                .or(admin::routes(state.clone()))
                .unify()
                .or(health::routes(state.clone()))
                .unify(),
        )
        .recover(handle_rejection)
        .unify()
        .map(|reply| with_api_security_headers(reply));

    let uploads = warp::path(UPLOADS_PATH)
        .and(warp::get())
        .and(warp::fs::dir(state.config.upload_dir.clone()))
        .map(|file| with_upload_security_headers(file));

    // Anything that is not a stored upload falls through to the API tree,
    // which renders its own JSON errors (including 404 for unknown paths)
    uploads.or(api)
}
