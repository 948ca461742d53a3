// Embeddings: text -> fixed-dimension vectors

pub mod openai;

pub use openai::OpenAIEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::types::AppResult;

/// Turns text into vectors. Output order matches input order 1:1.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            crate::types::AppError::Embedding("No embedding returned".to_string())
        })
    }
}

/// Build the configured provider, or `None` when no API key is set.
pub fn from_config(config: &EmbeddingConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    if config.api_key.trim().is_empty() {
        return None;
    }
    Some(Arc::new(OpenAIEmbedder::new(
        &config.api_key,
        &config.base_url,
        &config.model,
        config.batch_size,
    )))
}
