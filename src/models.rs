use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::embeddings;
use crate::index;
use crate::indexing::IndexingPipeline;
use crate::profiles::{ProfileCard, ProfileTable};
use crate::search::{QueryExpander, SearchService};
use crate::types::{AppError, AppResult};

/// Shared request state, built once by [`AppState::initialize`].
///
/// `search` is `None` when the selected backend needs an embedding key and none is
/// configured; listing still works, search answers 503.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub profiles: Arc<ProfileTable>,
    pub search: Option<Arc<SearchService>>,
    pub backend: &'static str,
}

impl AppState {
    pub fn new(config: Config, profiles: Arc<ProfileTable>, search: Option<Arc<SearchService>>) -> Self {
        let backend = search.as_ref().map_or("none", |s| s.backend());
        Self {
            config,
            profiles,
            search,
            backend,
        }
    }

    /// Load profiles, connect the index and optionally index every profile.
    ///
    /// A missing or empty profile source is fatal, as is any other missing
    /// credential. Only a missing embedding key leaves search disabled.
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let profiles = Arc::new(ProfileTable::load(&config.indexing.data_path).await?);

        let embedder = embeddings::from_config(&config.embedding);
        if embedder.is_none() && config.index.needs_embedder() {
            warn!(backend = ?config.index.backend, "OPENAI_API_KEY not set, search disabled");
            return Ok(Self::new(config.clone(), profiles, None));
        }
        let index = index::connect(&config.index, &config.embedding, embedder)?;
        info!(backend = index.name(), "Vector index connected");

        if config.indexing.index_on_startup {
            IndexingPipeline::new(index.clone(), config.indexing.max_profiles)
                .run(&profiles)
                .await?;
        }

        let expander = QueryExpander::from_config(&config.llm)?;
        let search = SearchService::new(expander, index, profiles.clone(), config.search.top_k);
        Ok(Self::new(config.clone(), profiles, Some(Arc::new(search))))
    }

    pub fn search(&self) -> AppResult<&SearchService> {
        self.search
            .as_deref()
            .ok_or_else(|| AppError::NotReady("Search index not ready".to_string()))
    }

    pub fn shutdown(self) {
        info!(
            backend = self.backend,
            profiles = self.profiles.len(),
            "Releasing search state"
        );
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlumniResponse {
    pub alumni: Vec<ProfileCard>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub profiles_indexed: usize,
    pub backend: String,
    pub search_ready: bool,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile_a, profile_b, test_config};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_missing_source_is_fatal() {
        let mut config = test_config();
        config.indexing.data_path = "/definitely/not/here.json".into();

        let err = AppState::initialize(&config).await.err().unwrap();
        assert!(matches!(err, AppError::DataSource(_)));
    }

    #[tokio::test]
    async fn test_without_embeddings_search_is_not_ready() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::json!([profile_a(), profile_b()])).unwrap();
        let mut config = test_config();
        config.indexing.data_path = file.path().to_path_buf();

        let state = AppState::initialize(&config).await.unwrap();
        assert_eq!(state.profiles.len(), 2);
        assert!(state.search.is_none());
        assert_eq!(state.backend, "none");
        assert!(matches!(state.search().err().unwrap(), AppError::NotReady(_)));
        state.shutdown();
    }

    #[tokio::test]
    async fn test_missing_pinecone_key_fails_startup() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::json!([profile_a()])).unwrap();
        let mut config = test_config();
        config.indexing.data_path = file.path().to_path_buf();
        config.index.backend = crate::config::VectorBackend::Pinecone;
        config.index.pinecone.use_integrated_embedding = true;
        config.index.pinecone.api_key = String::new();

        let err = AppState::initialize(&config).await.err().unwrap();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("PINECONE_API_KEY")));
    }
}
