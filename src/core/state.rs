//! Shared application state handed to every request handler

use std::sync::Arc;

use crate::auth::{Authorizer, CredentialStore, LogResetNotifier, ResetNotifier, TokenManager};
use crate::config::ServerConfig;
use crate::core::rate_limiter::AttemptLimiter;
use crate::error::Result;
use crate::security_logger::SecurityLogger;
use crate::services::{AnalyticsService, FileService, MaterialService, ProjectService};
use crate::storage::{create_storage, SharedStorage};

/// Owns the storage backend and every service built on it
pub struct AppState {
    pub config: ServerConfig,
    pub storage: SharedStorage,
    pub tokens: TokenManager,
    pub credentials: CredentialStore,
    pub authorizer: Arc<Authorizer>,
    pub projects: ProjectService,
    pub materials: MaterialService,
    pub files: FileService,
    pub analytics: AnalyticsService,
    pub auth_limiter: Arc<AttemptLimiter>,
    pub security_logger: Arc<SecurityLogger>,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    /// Build the configured storage backend and wire the services onto it
    pub async fn from_config(config: ServerConfig) -> Result<SharedAppState> {
        let storage = create_storage(&config.storage).await?;
        let notifier: Arc<dyn ResetNotifier> = Arc::new(LogResetNotifier::new(&config.public_url));
        Ok(Self::with_storage(config, storage, notifier))
    }

    /// Wire the services onto an existing backend
    pub fn with_storage(
        config: ServerConfig,
        storage: SharedStorage,
        notifier: Arc<dyn ResetNotifier>,
    ) -> SharedAppState {
        let security_logger = Arc::new(SecurityLogger::new());
        let authorizer = Arc::new(Authorizer::new(storage.clone(), security_logger.clone()));

        let state = Self {
            tokens: TokenManager::with_ttl(&config.jwt_secret, config.token_ttl_hours),
            credentials: CredentialStore::new(storage.clone(), notifier, security_logger.clone()),
            projects: ProjectService::new(storage.clone(), authorizer.clone()),
            materials: MaterialService::new(storage.clone(), authorizer.clone()),
            files: FileService::new(
                storage.clone(),
                authorizer.clone(),
                config.upload_dir.clone(),
                config.max_upload_bytes,
            ),
            analytics: AnalyticsService::new(storage.clone(), authorizer.clone()),
            auth_limiter: Arc::new(AttemptLimiter::new(config.auth_attempts_per_minute)),
            authorizer,
            security_logger,
            storage,
            config,
        };
        Arc::new(state)
    }

    /// Spawn periodic cleanup for in-memory limiters and event logs
    pub fn start_background_tasks(&self) {
        self.auth_limiter.clone().start_cleanup_task();
        self.security_logger.clone().start_cleanup_task();
    }
}
