use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub indexing: IndexingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub log_dir: Option<PathBuf>,
}

/// Language model used by the query expander. An empty key disables expansion.
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Local,
    Pinecone,
}

impl VectorBackend {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "local" | "chroma" => Some(VectorBackend::Local),
            "pinecone" => Some(VectorBackend::Pinecone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub backend: VectorBackend,
    pub collection: String,
    pub local_dir: PathBuf,
    pub pinecone: PineconeSettings,
    pub max_retries: u32,
    pub retry_wait_secs: u64,
}

impl IndexConfig {
    /// Whether the selected backend embeds on our side (everything but Pinecone integrated mode)
    pub fn needs_embedder(&self) -> bool {
        match self.backend {
            VectorBackend::Local => true,
            VectorBackend::Pinecone => !self.pinecone.use_integrated_embedding,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PineconeSettings {
    pub api_key: String,
    pub index_name: String,
    pub host: Option<String>,
    pub namespace: String,
    pub use_integrated_embedding: bool,
    pub text_field: String,
    pub embed_model: String,
    pub cloud: String,
    pub region: String,
    pub controller_url: String,
    pub upsert_batch_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    pub data_path: PathBuf,
    pub max_profiles: Option<usize>,
    pub index_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let openai_base_url = env::var("OPENAI_BASE_URL").ok().filter(|s| !s.trim().is_empty());

        let provider_id = env::var("QUERY_EXPANSION_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = LLMProvider::from_id(&provider_id)
            .ok_or_else(|| anyhow::anyhow!("Unsupported QUERY_EXPANSION_PROVIDER: {}", provider_id))?;
        let llm_api_key = match provider {
            LLMProvider::OpenAI => openai_api_key.clone(),
            LLMProvider::Groq => env::var("GROQ_API_KEY").unwrap_or_default(),
            LLMProvider::OpenRouter => env::var("OPENROUTER_API_KEY").unwrap_or_default(),
        };

        let backend_id = env::var("VECTOR_BACKEND").unwrap_or_else(|_| "local".to_string());
        let backend = VectorBackend::from_id(&backend_id)
            .ok_or_else(|| anyhow::anyhow!("Unsupported VECTOR_BACKEND: {}", backend_id))?;

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: split_list(
                    &env::var("ALLOWED_ORIGINS")
                        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string()),
                ),
                log_dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            },
            llm: LLMConfig {
                provider: provider.to_string(),
                model: env::var("QUERY_EXPANSION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                api_key: llm_api_key,
                base_url: match provider {
                    LLMProvider::OpenAI => openai_base_url.clone(),
                    _ => None,
                },
                max_tokens: env::var("QUERY_EXPANSION_MAX_TOKENS")
                    .unwrap_or_else(|_| "150".to_string())
                    .parse()?,
            },
            embedding: EmbeddingConfig {
                api_key: openai_api_key,
                base_url: openai_base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                dimension: env::var("EMBEDDING_DIM")
                    .unwrap_or_else(|_| "1536".to_string())
                    .parse()?,
                batch_size: env::var("EMBEDDING_BATCH_SIZE")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()?,
            },
            index: IndexConfig {
                backend,
                collection: env::var("INDEX_COLLECTION").unwrap_or_else(|_| "fisk_alumni".to_string()),
                local_dir: env::var("LOCAL_INDEX_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("chroma_data")),
                pinecone: PineconeSettings {
                    api_key: env::var("PINECONE_API_KEY").unwrap_or_default(),
                    index_name: env::var("PINECONE_INDEX").unwrap_or_else(|_| "fisk".to_string()),
                    host: env::var("PINECONE_INDEX_HOST").ok().filter(|s| !s.trim().is_empty()),
                    namespace: env::var("PINECONE_NAMESPACE").unwrap_or_else(|_| "alumni".to_string()),
                    use_integrated_embedding: env::var("PINECONE_USE_INTEGRATED_EMBEDDING")
                        .unwrap_or_else(|_| "true".to_string())
                        .trim()
                        .to_lowercase()
                        .parse()?,
                    text_field: env::var("PINECONE_TEXT_FIELD").unwrap_or_else(|_| "text".to_string()),
                    embed_model: env::var("PINECONE_EMBED_MODEL")
                        .unwrap_or_else(|_| "llama-text-embed-v2".to_string()),
                    cloud: env::var("PINECONE_CLOUD").unwrap_or_else(|_| "aws".to_string()),
                    region: env::var("PINECONE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                    controller_url: env::var("PINECONE_CONTROLLER_URL")
                        .unwrap_or_else(|_| "https://api.pinecone.io".to_string()),
                    upsert_batch_delay_secs: env::var("PINECONE_UPSERT_BATCH_DELAY")
                        .unwrap_or_else(|_| "2".to_string())
                        .parse()?,
                },
                max_retries: env::var("INDEX_MAX_RETRIES")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                retry_wait_secs: env::var("INDEX_RETRY_WAIT_SECS")
                    .unwrap_or_else(|_| "65".to_string())
                    .parse()?,
            },
            search: SearchConfig {
                top_k: env::var("TOP_K")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()?,
            },
            indexing: IndexingConfig {
                data_path: env::var("SOURCING_DATA_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/fisk_alumni_linkedin_data.json")),
                max_profiles: env::var("MAX_INDEX_PROFILES")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().parse())
                    .transpose()?,
                index_on_startup: env::var("INDEX_ON_STARTUP")
                    .unwrap_or_else(|_| "true".to_string())
                    .trim()
                    .to_lowercase()
                    .parse()?,
            },
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
