// Shared fakes for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{
    Config, EmbeddingConfig, IndexConfig, IndexingConfig, LLMConfig, PineconeSettings, SearchConfig,
    ServerConfig, VectorBackend,
};
use crate::embeddings::EmbeddingProvider;
use crate::index::{ScoredCandidate, VectorIndex};
use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

/// LLM adapter that always answers with the same content (or the same error).
pub struct StaticAdapter {
    reply: Result<String, String>,
    pub calls: AtomicUsize,
}

impl StaticAdapter {
    pub fn replying(content: &str) -> Self {
        Self {
            reply: Ok(content.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LLMAdapter for StaticAdapter {
    async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(content) => Ok(LLMResponse {
                content: content.clone(),
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            }),
            Err(message) => Err(AppError::LLMApi(message.clone())),
        }
    }
}

const VOCABULARY: &[&str] = &[
    "microsoft", "google", "software", "engineer", "product", "manager", "resume", "help",
    "big", "tech", "healthcare", "finance", "interview", "nashville", "atlanta", "mentor",
];

/// Bag-of-words embedder: one axis per vocabulary word, unknown words ignored.
/// Texts sharing no vocabulary word are orthogonal.
pub struct VocabularyEmbedder {
    axes: HashMap<&'static str, usize>,
    pub calls: AtomicUsize,
}

impl Default for VocabularyEmbedder {
    fn default() -> Self {
        Self {
            axes: VOCABULARY.iter().enumerate().map(|(i, w)| (*w, i)).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl VocabularyEmbedder {
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; VOCABULARY.len()];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            if let Some(&axis) = self.axes.get(token) {
                vector[axis] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for VocabularyEmbedder {
    async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Index with canned hits per query text; records upserts.
#[derive(Default)]
pub struct FixedIndex {
    hits: HashMap<String, Vec<ScoredCandidate>>,
    pub queries: AtomicUsize,
    pub upserted: std::sync::Mutex<Vec<(String, String)>>,
}

impl FixedIndex {
    pub fn with_hits(mut self, text: &str, hits: &[(&str, f32)]) -> Self {
        self.hits.insert(
            text.to_string(),
            hits.iter().map(|(id, s)| ScoredCandidate::new(*id, *s)).collect(),
        );
        self
    }

    pub fn upserted_ids(&self) -> Vec<String> {
        self.upserted
            .lock()
            .map(|u| u.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn upsert(&self, ids: &[String], documents: &[String]) -> AppResult<()> {
        let mut upserted = self
            .upserted
            .lock()
            .map_err(|_| AppError::Internal("poisoned".to_string()))?;
        upserted.extend(ids.iter().cloned().zip(documents.iter().cloned()));
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> AppResult<Vec<ScoredCandidate>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut hits = self.hits.get(text).cloned().unwrap_or_default();
        hits.truncate(k);
        Ok(hits)
    }
}

/// Profile A: Microsoft software engineer who offers resume help
pub fn profile_a() -> Value {
    json!({
        "id": "a",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "headline": "Software Engineer at Microsoft",
        "about": "Happy to give resume help to students.",
        "topSkills": "Software • Resume Review",
        "location": {"linkedinText": "Seattle, Washington", "parsed": {"text": "Seattle, WA"}},
        "currentPosition": [{"companyName": "Microsoft"}],
        "experience": [{"position": "Software Engineer", "companyName": "Microsoft", "description": "Cloud services"}],
        "profilePicture": {"url": "https://img.test/a.jpg"},
        "linkedinUrl": "https://linkedin.test/in/ada"
    })
}

/// Profile B: Google product manager
pub fn profile_b() -> Value {
    json!({
        "id": "b",
        "firstName": "Grace",
        "lastName": "Hopper",
        "headline": "Product Manager at Google",
        "currentPosition": [{"companyName": "Google"}],
        "experience": [{"position": "Product Manager", "companyName": "Google"}],
        "photo": "https://img.test/b.jpg"
    })
}

/// Config with every external capability disabled
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            log_dir: None,
        },
        llm: LLMConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            base_url: None,
            max_tokens: 150,
        },
        embedding: EmbeddingConfig {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 100,
        },
        index: IndexConfig {
            backend: VectorBackend::Local,
            collection: "fisk_alumni".to_string(),
            local_dir: std::env::temp_dir().join("alumni-match-test"),
            pinecone: PineconeSettings {
                api_key: String::new(),
                index_name: "fisk".to_string(),
                host: None,
                namespace: "alumni".to_string(),
                use_integrated_embedding: true,
                text_field: "text".to_string(),
                embed_model: "llama-text-embed-v2".to_string(),
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
                controller_url: "https://api.pinecone.io".to_string(),
                upsert_batch_delay_secs: 0,
            },
            max_retries: 1,
            retry_wait_secs: 0,
        },
        search: SearchConfig { top_k: 20 },
        indexing: IndexingConfig {
            data_path: std::path::PathBuf::from("data/fisk_alumni_linkedin_data.json"),
            max_profiles: None,
            index_on_startup: false,
        },
    }
}
