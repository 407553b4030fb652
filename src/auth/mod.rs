//! Authentication and authorization module

pub mod credentials;
pub mod guard;
pub mod password;
pub mod reset;
pub mod token;
pub mod user;

// Re-export main components
pub use credentials::CredentialStore;
pub use guard::{owner_scope, Authorizer, ResourceType};
pub use reset::{LogResetNotifier, ResetNotifier, ResetToken};
pub use token::{Claims, TokenManager};
pub use user::{Permission, User, UserProfile, UserRole};
