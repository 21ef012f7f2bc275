pub mod model;
pub mod error;
pub mod prompt;
pub mod sanitize;
pub mod generation;
pub mod store;
pub mod service;
pub mod server;
pub mod parser;
pub mod config;
pub mod testing;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::GenerationError;
use crate::generation::{GenerationClient, GroqBackend};
use crate::service::StoryService;
use crate::store::StoryStore;

pub use crate::error::StoryError;
pub use crate::model::{Genre, StoryLength, StoryRecord};

pub type GroqStoryService = StoryService<GroqBackend>;

/// Builds the process-wide store and the service that owns it.
pub fn build_service(config: &ServerConfig) -> Result<Arc<GroqStoryService>, GenerationError> {
    let backend = GroqBackend::new(&config.api_base, &config.api_key, config.request_timeout())?;
    let generator = GenerationClient::new(backend, &config.model);
    let store = Arc::new(StoryStore::new());
    Ok(Arc::new(StoryService::new(store, generator)))
}
