//! Abstract storage interfaces for pluggable backends
//!
//! This module defines one trait per entity family. Services only talk to
//! these traits, so the hosted database and the in-memory fallback are
//! interchangeable behind a `StorageProvider`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::reset::ResetToken;
use crate::auth::user::User;
use crate::error::Result;
use crate::models::{FileRecord, Material, Project};

/// User account storage interface
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Create a new user. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, user: User) -> Result<User>;

    /// Get user by ID
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Get user by (normalized) email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Replace a user record. Fails with `NotFound` if it does not exist.
    async fn update_user(&self, user: User) -> Result<()>;

    /// List all users, oldest first
    async fn list_users(&self) -> Result<Vec<User>>;
}

/// Project storage interface.
///
/// `owner` scopes reads: `Some(user_id)` only matches that user's projects,
/// `None` matches every project.
#[async_trait]
pub trait ProjectStorage: Send + Sync {
    async fn insert_project(&self, project: Project) -> Result<()>;

    async fn get_project(&self, project_id: &str, owner: Option<&str>) -> Result<Option<Project>>;

    /// List projects, newest first
    async fn list_projects(&self, owner: Option<&str>) -> Result<Vec<Project>>;

    async fn update_project(&self, project: Project) -> Result<()>;

    /// Delete a project, returning whether it existed
    async fn delete_project(&self, project_id: &str) -> Result<bool>;
}

/// Material storage interface
#[async_trait]
pub trait MaterialStorage: Send + Sync {
    async fn insert_material(&self, material: Material) -> Result<()>;

    async fn get_material(&self, material_id: &str) -> Result<Option<Material>>;

    /// List a project's materials by name
    async fn list_materials(&self, project_id: &str) -> Result<Vec<Material>>;

    async fn update_material(&self, material: Material) -> Result<()>;

    async fn delete_material(&self, material_id: &str) -> Result<bool>;

    /// Remove every material of a project, returning how many were removed
    async fn delete_project_materials(&self, project_id: &str) -> Result<usize>;
}

/// File metadata storage interface
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn insert_file(&self, file: FileRecord) -> Result<()>;

    async fn get_file(&self, file_id: &str, owner: Option<&str>) -> Result<Option<FileRecord>>;

    /// List files, newest first, optionally restricted to one project
    async fn list_files(&self, owner: Option<&str>, project_id: Option<&str>) -> Result<Vec<FileRecord>>;

    async fn delete_file(&self, file_id: &str) -> Result<bool>;
}

/// Password reset token storage interface
#[async_trait]
pub trait ResetTokenStorage: Send + Sync {
    async fn store_reset_token(&self, token: ResetToken) -> Result<()>;

    /// Look up a token by the digest of its raw value
    async fn get_reset_token(&self, token_hash: &str) -> Result<Option<ResetToken>>;

    /// Mark a token used. Returns false if it was already used or is unknown,
    /// so two concurrent redemptions cannot both succeed.
    async fn mark_reset_token_used(&self, token_hash: &str, used_at: DateTime<Utc>) -> Result<bool>;

    /// Drop tokens that expired before `now`
    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Combined storage provider interface
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn users(&self) -> &dyn UserStorage;

    fn projects(&self) -> &dyn ProjectStorage;

    fn materials(&self) -> &dyn MaterialStorage;

    fn files(&self) -> &dyn FileStorage;

    fn reset_tokens(&self) -> &dyn ResetTokenStorage;

    /// Name of the backend for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Initialize the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Health check for the storage backend
    async fn health_check(&self) -> Result<bool>;
}

/// Which backend to build, chosen from the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-memory fallback store, optionally seeded with demo data
    Memory { seed_demo_data: bool },
    /// Hosted PostgREST endpoint (e.g. a Supabase project)
    Hosted { url: String, api_key: String },
}

impl StorageConfig {
    pub fn memory() -> Self {
        StorageConfig::Memory { seed_demo_data: false }
    }

    pub fn seeded_memory() -> Self {
        StorageConfig::Memory { seed_demo_data: true }
    }

    /// Hosted when both credentials are present and non-blank, else memory
    pub fn select(url: Option<String>, api_key: Option<String>, seed_demo_data: bool) -> Self {
        let url = url.filter(|v| !v.trim().is_empty());
        let api_key = api_key.filter(|v| !v.trim().is_empty());
        match (url, api_key) {
            (Some(url), Some(api_key)) => StorageConfig::Hosted { url, api_key },
            _ => StorageConfig::Memory { seed_demo_data },
        }
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self, StorageConfig::Hosted { .. })
    }
}
