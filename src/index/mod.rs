//! Vector Index
//!
//! Backend-neutral nearest-neighbor contract plus the backends behind it:
//!
//! - `LocalStore`: vector-mode, brute-force cosine distance persisted to a local file
//! - `PineconeVectorStore`: vector-mode, managed index queried by vector
//! - `PineconeTextIndex`: integrated-embedding index queried by raw text
//!
//! Vector-mode stores are wrapped in `EmbeddedIndex`, which owns the embedding
//! provider, so every backend is used through the same text-level `VectorIndex`.
//! The backend is chosen once in [`connect`]; nothing else looks at which one it is.

pub mod embedded;
pub mod fusion;
pub mod local;
pub mod pinecone;

pub use embedded::EmbeddedIndex;
pub use local::LocalStore;
pub use pinecone::{PineconeConfig, PineconeTextIndex, PineconeVectorStore};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;

use crate::config::{EmbeddingConfig, IndexConfig, VectorBackend};
use crate::embeddings::EmbeddingProvider;
use crate::types::{AppError, AppResult};
use crate::utils::RetryPolicy;

/// A candidate id with its similarity to one query, in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub id: String,
    pub score: f32,
}

impl ScoredCandidate {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Clamp a backend score into [0, 1]; NaN counts as unrelated.
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Cosine distance lies in [0, 2]; similarity is `1 - distance`, clamped.
pub fn score_from_cosine_distance(distance: f32) -> f32 {
    clamp_score(1.0 - distance)
}

/// Text-level index used by search and indexing.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or overwrite one entry per id
    async fn upsert(&self, ids: &[String], documents: &[String]) -> AppResult<()>;

    /// Nearest neighbors of one text, best first
    async fn query(&self, text: &str, k: usize) -> AppResult<Vec<ScoredCandidate>>;

    /// One query per text, fused by max score into at most `top_k` unique ids
    async fn query_multi(&self, texts: &[String], top_k: usize) -> AppResult<Vec<ScoredCandidate>> {
        if texts.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let per_phrase = fusion::overfetch(top_k);
        let result_sets = try_join_all(texts.iter().map(|text| self.query(text, per_phrase))).await?;
        Ok(fusion::fuse(result_sets, top_k))
    }
}

/// Vector-level store: explicit (id, vector) pairs queried by vector.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn upsert_vectors(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
    ) -> AppResult<()>;

    async fn query_vector(&self, vector: &[f32], k: usize) -> AppResult<Vec<ScoredCandidate>>;
}

/// How large upsert jobs are chunked and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertPolicy {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
}

impl UpsertPolicy {
    pub const VECTOR_BATCH_SIZE: usize = 100;
    /// Integrated embedding is throughput-limited upstream
    pub const TEXT_BATCH_SIZE: usize = 24;

    pub fn vector_mode(retry: RetryPolicy) -> Self {
        Self {
            batch_size: Self::VECTOR_BATCH_SIZE,
            batch_delay: Duration::ZERO,
            retry,
        }
    }

    pub fn integrated_text(batch_delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            batch_size: Self::TEXT_BATCH_SIZE,
            batch_delay,
            retry,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size.max(1))
    }
}

pub(crate) fn ensure_same_len(ids: usize, other: usize, what: &str) -> AppResult<()> {
    if ids != other {
        return Err(AppError::InvalidRequest(format!(
            "Got {} ids but {} {}",
            ids, other, what
        )));
    }
    Ok(())
}

/// Build the configured backend behind a single handle.
pub fn connect(
    config: &IndexConfig,
    embedding: &EmbeddingConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
) -> AppResult<Arc<dyn VectorIndex>> {
    let retry = RetryPolicy::new(config.max_retries, Duration::from_secs(config.retry_wait_secs));

    match config.backend {
        VectorBackend::Local => {
            let embedder = require_embedder(embedder, "local vector backend")?;
            let store = LocalStore::open(&config.local_dir, &config.collection);
            Ok(Arc::new(EmbeddedIndex::new(
                store,
                embedder,
                UpsertPolicy::vector_mode(retry),
            )))
        }
        VectorBackend::Pinecone => {
            let settings = &config.pinecone;
            if settings.api_key.trim().is_empty() {
                return Err(AppError::Config(
                    "PINECONE_API_KEY is required for the pinecone backend".to_string(),
                ));
            }
            let pinecone = PineconeConfig::from_settings(settings, embedding.dimension);

            if settings.use_integrated_embedding {
                let policy = UpsertPolicy::integrated_text(
                    Duration::from_secs(settings.upsert_batch_delay_secs),
                    retry,
                );
                Ok(Arc::new(PineconeTextIndex::new(pinecone, policy)))
            } else {
                let embedder = require_embedder(embedder, "pinecone vector mode")?;
                Ok(Arc::new(EmbeddedIndex::new(
                    PineconeVectorStore::new(pinecone),
                    embedder,
                    UpsertPolicy::vector_mode(retry),
                )))
            }
        }
    }
}

fn require_embedder(
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    backend: &str,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    embedder.ok_or_else(|| {
        AppError::Config(format!("OPENAI_API_KEY is required for the {}", backend))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PineconeSettings;
    use crate::testing::VocabularyEmbedder;

    fn index_config(backend: VectorBackend, integrated: bool, pinecone_key: &str) -> IndexConfig {
        IndexConfig {
            backend,
            collection: "fisk_alumni".to_string(),
            local_dir: std::env::temp_dir().join("alumni-match-connect-test"),
            pinecone: PineconeSettings {
                api_key: pinecone_key.to_string(),
                index_name: "fisk".to_string(),
                host: None,
                namespace: "alumni".to_string(),
                use_integrated_embedding: integrated,
                text_field: "text".to_string(),
                embed_model: "llama-text-embed-v2".to_string(),
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
                controller_url: "https://api.pinecone.io".to_string(),
                upsert_batch_delay_secs: 0,
            },
            max_retries: 5,
            retry_wait_secs: 0,
        }
    }

    fn embedding_config() -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 100,
        }
    }

    fn embedder() -> Option<Arc<dyn EmbeddingProvider>> {
        Some(Arc::new(VocabularyEmbedder::default()))
    }

    #[test]
    fn test_vector_mode_requires_embeddings() {
        let err = connect(&index_config(VectorBackend::Local, false, ""), &embedding_config(), None)
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(_)));

        let err = connect(
            &index_config(VectorBackend::Pinecone, false, "pc-key"),
            &embedding_config(),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_pinecone_requires_api_key() {
        let err = connect(
            &index_config(VectorBackend::Pinecone, true, ""),
            &embedding_config(),
            embedder(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_selects_backend_once() {
        let local = connect(&index_config(VectorBackend::Local, false, ""), &embedding_config(), embedder()).unwrap();
        assert_eq!(local.name(), "local");

        let text = connect(
            &index_config(VectorBackend::Pinecone, true, "pc-key"),
            &embedding_config(),
            None,
        )
        .unwrap();
        assert_eq!(text.name(), "pinecone-integrated");

        let vectors = connect(
            &index_config(VectorBackend::Pinecone, false, "pc-key"),
            &embedding_config(),
            embedder(),
        )
        .unwrap();
        assert_eq!(vectors.name(), "pinecone");
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(1.5), 1.0);
        assert_eq!(clamp_score(-0.5), 0.0);
        assert_eq!(clamp_score(f32::NAN), 0.0);
        assert_eq!(score_from_cosine_distance(0.0), 1.0);
        assert_eq!(score_from_cosine_distance(2.0), 0.0);
        assert!((score_from_cosine_distance(0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_upsert_policy_batches() {
        let policy = UpsertPolicy::integrated_text(Duration::ZERO, RetryPolicy::none());
        assert_eq!(policy.batch_size, 24);
        assert_eq!(policy.batch_count(0), 0);
        assert_eq!(policy.batch_count(24), 1);
        assert_eq!(policy.batch_count(25), 2);
        assert_eq!(UpsertPolicy::vector_mode(RetryPolicy::none()).batch_count(250), 3);
    }
}
