//! ============================================================================
//! Resources - Lazily initialized shared services
//! ============================================================================
//! The memory manager and completion client are expensive to build (vector
//! store connection, collection bootstrap), so they are constructed once on
//! first use and shared for the life of the process. Initialization failures
//! are cached too: every later caller sees the original error instead of
//! hammering a misconfigured backend.
//! ============================================================================

use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::completion::OpenAiClient;
use crate::config::AppConfig;
use crate::error::Result;
use crate::memory::MemoryManager;

/// Shared service handles
pub struct Resources {
    pub memory: Arc<MemoryManager>,
    pub completion: Arc<OpenAiClient>,
}

impl Resources {
    async fn build(config: &AppConfig) -> Result<Arc<Resources>> {
        info!("Initializing shared services (model: {})", config.model);

        let memory_config = config.memory_config();
        let memory = MemoryManager::new(&memory_config, &config.openai_api_key).await?;
        let completion = OpenAiClient::new(config.openai_api_key.as_str(), config.model.clone());

        Ok(Arc::new(Resources {
            memory: Arc::new(memory),
            completion: Arc::new(completion),
        }))
    }
}

/// Once-only initializer for the process-wide [`Resources`]
pub struct ResourceCache {
    cell: OnceCell<Result<Arc<Resources>>>,
}

impl ResourceCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Return the shared resources, building them on first call
    pub async fn get(&self, config: &AppConfig) -> Result<Arc<Resources>> {
        self.get_or_build(|| Resources::build(config)).await
    }

    async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<Resources>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<Resources>>>,
    {
        self.cell.get_or_init(build).await.clone()
    }
}

/// Process-wide resource cache
pub static RESOURCES: ResourceCache = ResourceCache::new();
