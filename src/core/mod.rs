//! Application core: shared state and request throttling

pub mod rate_limiter;
pub mod state;

// Re-export main components for convenience
pub use rate_limiter::AttemptLimiter;
pub use state::{AppState, SharedAppState};
