//! Persistence backends for users, projects, materials, files and reset tokens

pub mod memory;
pub mod postgrest;
pub mod seed;
pub mod traits;

use std::sync::Arc;

pub use memory::MemoryStorageProvider;
pub use postgrest::PostgrestStorageProvider;
pub use traits::{
    FileStorage, MaterialStorage, ProjectStorage, ResetTokenStorage, StorageConfig, StorageProvider,
    UserStorage,
};

use crate::error::Result;

pub type SharedStorage = Arc<dyn StorageProvider>;

/// Build and initialize the backend named by `config`
pub async fn create_storage(config: &StorageConfig) -> Result<SharedStorage> {
    let storage: SharedStorage = match config {
        StorageConfig::Hosted { url, api_key } => {
            log::info!("Using hosted database at {}", url);
            Arc::new(PostgrestStorageProvider::new(url, api_key)?)
        }
        StorageConfig::Memory { seed_demo_data } => {
            log::warn!("No database credentials configured, using in-memory fallback store");
            let memory = MemoryStorageProvider::new();
            if *seed_demo_data {
                seed::seed_demo_data(&memory).await?;
            }
            Arc::new(memory)
        }
    };

    storage.initialize().await?;
    Ok(storage)
}
