//! SiteWork - Construction management API implemented in Rust
//!
//! This library provides the HTTP API for projects, materials and files,
//! with authentication, role/permission gating, ownership checks and
//! portfolio analytics over a pluggable storage backend.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod security_logger;
pub mod services;
pub mod storage;
pub mod validation;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use core::{AppState, SharedAppState};
pub use error::{Result, SiteWorkError};
