// Pinecone backends: vector-mode store and integrated-embedding text index
// Both talk to the REST data plane of one index, resolved (or created) through the control plane.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{
    clamp_score, ensure_same_len, ScoredCandidate, UpsertPolicy, VectorIndex, VectorStore,
};
use crate::config::PineconeSettings;
use crate::types::{AppError, AppResult};
use crate::utils::retry_on_rate_limit;

const API_VERSION: &str = "2025-01";

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    /// Data-plane host; skips the control-plane lookup when set
    pub host: Option<String>,
    pub namespace: String,
    pub text_field: String,
    pub embed_model: String,
    pub cloud: String,
    pub region: String,
    pub controller_url: String,
    /// Vector width used when creating a vector-mode index
    pub dimension: usize,
    pub ready_poll_interval: Duration,
    pub ready_poll_attempts: u32,
}

impl PineconeConfig {
    pub fn from_settings(settings: &PineconeSettings, dimension: usize) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            index_name: settings.index_name.clone(),
            host: settings.host.clone(),
            namespace: settings.namespace.clone(),
            text_field: settings.text_field.clone(),
            embed_model: settings.embed_model.clone(),
            cloud: settings.cloud.clone(),
            region: settings.region.clone(),
            controller_url: settings.controller_url.trim_end_matches('/').to_string(),
            dimension,
            ready_poll_interval: Duration::from_secs(5),
            ready_poll_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexKind {
    Vectors,
    IntegratedText,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct HitList {
    #[serde(default)]
    hits: Vec<Hit>,
}

/// Records search returns `result.hits`; older deployments answer with `matches`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Option<HitList>,
    #[serde(default)]
    matches: Vec<Match>,
}

impl SearchResponse {
    fn into_candidates(self) -> Vec<ScoredCandidate> {
        match self.result {
            Some(result) if !result.hits.is_empty() => result
                .hits
                .into_iter()
                .map(|h| ScoredCandidate::new(h.id, clamp_score(h.score.unwrap_or(0.0))))
                .collect(),
            _ => self
                .matches
                .into_iter()
                .map(|m| ScoredCandidate::new(m.id, clamp_score(m.score.unwrap_or(0.0))))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct VectorRecord<'a> {
    id: &'a str,
    values: &'a [f32],
}

/// Shared HTTP plumbing: auth headers, status mapping and the cached data-plane host.
struct PineconeClient {
    http: Client,
    config: PineconeConfig,
    kind: IndexKind,
    host: OnceCell<String>,
}

impl PineconeClient {
    fn new(config: PineconeConfig, kind: IndexKind) -> Self {
        Self {
            http: Client::new(),
            config,
            kind,
            host: OnceCell::new(),
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn host(&self) -> AppResult<&str> {
        self.host
            .get_or_try_init(|| self.resolve_host())
            .await
            .map(String::as_str)
    }

    async fn resolve_host(&self) -> AppResult<String> {
        if let Some(host) = &self.config.host {
            return Ok(normalize_host(host));
        }

        let description = match self.describe_index().await? {
            Some(description) => description,
            None => self.create_index().await?,
        };
        let description = self.wait_until_ready(description).await?;
        info!(index = %self.config.index_name, host = %description.host, "Resolved Pinecone index host");
        Ok(normalize_host(&description.host))
    }

    async fn describe_index(&self) -> AppResult<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.config.controller_url, self.config.index_name);
        let response = self
            .authed(self.http.get(url))
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Pinecone describe failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "describe index").await?;
        Ok(Some(parse_json(response, "describe index").await?))
    }

    async fn create_index(&self) -> AppResult<IndexDescription> {
        let (path, body) = match self.kind {
            IndexKind::Vectors => (
                "indexes",
                json!({
                    "name": self.config.index_name,
                    "dimension": self.config.dimension,
                    "metric": "cosine",
                    "spec": {"serverless": {"cloud": self.config.cloud, "region": self.config.region}},
                }),
            ),
            IndexKind::IntegratedText => (
                "indexes/create-for-model",
                json!({
                    "name": self.config.index_name,
                    "cloud": self.config.cloud,
                    "region": self.config.region,
                    "embed": {
                        "model": self.config.embed_model,
                        "field_map": {"text": self.config.text_field},
                    },
                }),
            ),
        };
        info!(index = %self.config.index_name, kind = ?self.kind, "Creating Pinecone index");

        let url = format!("{}/{}", self.config.controller_url, path);
        let response = self
            .authed(self.http.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Pinecone create failed: {}", e)))?;
        let response = check_status(response, "create index").await?;
        parse_json(response, "create index").await
    }

    async fn wait_until_ready(&self, mut description: IndexDescription) -> AppResult<IndexDescription> {
        let mut attempts = 0;
        while !description.status.ready || description.host.is_empty() {
            if attempts >= self.config.ready_poll_attempts {
                return Err(AppError::Index(format!(
                    "Pinecone index {} not ready after {} checks",
                    self.config.index_name, attempts
                )));
            }
            attempts += 1;
            debug!(index = %self.config.index_name, attempts, "Waiting for Pinecone index");
            sleep(self.config.ready_poll_interval).await;
            description = self.describe_index().await?.ok_or_else(|| {
                AppError::Index(format!("Pinecone index {} disappeared", self.config.index_name))
            })?;
        }
        Ok(description)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T, what: &str) -> AppResult<Response> {
        let url = format!("{}{}", self.host().await?, path);
        let response = self
            .authed(self.http.post(url))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Pinecone {} failed: {}", what, e)))?;
        check_status(response, what).await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn check_status(response: Response, what: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::rate_limited("pinecone", body));
    }
    Err(AppError::Index(format!("Pinecone {} failed ({}): {}", what, status, body)))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> AppResult<T> {
    response
        .json()
        .await
        .map_err(|e| AppError::Index(format!("Failed to parse Pinecone {} response: {}", what, e)))
}

/// Vector-mode Pinecone index; callers embed.
pub struct PineconeVectorStore {
    client: PineconeClient,
}

impl PineconeVectorStore {
    pub fn new(config: PineconeConfig) -> Self {
        Self {
            client: PineconeClient::new(config, IndexKind::Vectors),
        }
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    // Documents are not stored server-side in vector mode
    async fn upsert_vectors(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
    ) -> AppResult<()> {
        ensure_same_len(ids.len(), vectors.len(), "vectors")?;
        ensure_same_len(ids.len(), documents.len(), "documents")?;
        if ids.is_empty() {
            return Ok(());
        }

        let records: Vec<VectorRecord<'_>> = ids
            .iter()
            .zip(vectors)
            .map(|(id, values)| VectorRecord { id, values })
            .collect();
        let body = json!({
            "vectors": records,
            "namespace": self.client.config.namespace,
        });
        self.client.post_json("/vectors/upsert", &body, "upsert").await?;
        Ok(())
    }

    async fn query_vector(&self, vector: &[f32], k: usize) -> AppResult<Vec<ScoredCandidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let body = json!({
            "vector": vector,
            "topK": k,
            "namespace": self.client.config.namespace,
            "includeMetadata": false,
            "includeValues": false,
        });
        let response = self.client.post_json("/query", &body, "query").await?;
        let parsed: QueryResponse = parse_json(response, "query").await?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| ScoredCandidate::new(m.id, clamp_score(m.score.unwrap_or(0.0))))
            .collect())
    }
}

/// Integrated-embedding Pinecone index: raw text in, server-side embedding.
pub struct PineconeTextIndex {
    client: PineconeClient,
    policy: UpsertPolicy,
}

impl PineconeTextIndex {
    pub fn new(config: PineconeConfig, policy: UpsertPolicy) -> Self {
        Self {
            client: PineconeClient::new(config, IndexKind::IntegratedText),
            policy,
        }
    }

    async fn upsert_records(&self, ids: &[String], documents: &[String]) -> AppResult<()> {
        let field = &self.client.config.text_field;
        let mut body = String::new();
        for (id, document) in ids.iter().zip(documents) {
            let mut record = serde_json::Map::new();
            record.insert("_id".to_string(), json!(id));
            record.insert(field.clone(), json!(document));
            body.push_str(&serde_json::to_string(&record)?);
            body.push('\n');
        }

        let url = format!(
            "{}/records/namespaces/{}/upsert",
            self.client.host().await?,
            self.client.config.namespace
        );
        let response = self
            .client
            .authed(self.client.http.post(url))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Index(format!("Pinecone upsert failed: {}", e)))?;
        check_status(response, "upsert records").await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PineconeTextIndex {
    fn name(&self) -> &'static str {
        "pinecone-integrated"
    }

    async fn upsert(&self, ids: &[String], documents: &[String]) -> AppResult<()> {
        ensure_same_len(ids.len(), documents.len(), "documents")?;

        let size = self.policy.batch_size.max(1);
        let batches = self.policy.batch_count(ids.len());
        let mut upserted = 0;

        for (batch, (id_chunk, doc_chunk)) in ids.chunks(size).zip(documents.chunks(size)).enumerate() {
            if batch > 0 && !self.policy.batch_delay.is_zero() {
                sleep(self.policy.batch_delay).await;
            }

            retry_on_rate_limit(self.policy.retry, "upsert records", || {
                self.upsert_records(id_chunk, doc_chunk)
            })
            .await
            .inspect_err(|e| warn!(batch = batch + 1, batches, error = %e, "Record upsert failed"))?;

            upserted += id_chunk.len();
            info!(backend = self.name(), batch = batch + 1, batches, upserted, "Upserted batch");
        }
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> AppResult<Vec<ScoredCandidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let path = format!("/records/namespaces/{}/search", self.client.config.namespace);
        let body = json!({
            "query": {
                "inputs": {"text": text},
                "top_k": k,
            }
        });
        let response = self.client.post_json(&path, &body, "search").await?;
        let parsed: SearchResponse = parse_json(response, "search").await?;
        Ok(parsed.into_candidates())
    }
}
