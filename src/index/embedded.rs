// Vector-mode adapter: embeds text, then delegates to a vector store

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tokio::time::sleep;
use tracing::{debug, info};

use super::{ensure_same_len, fusion, ScoredCandidate, UpsertPolicy, VectorIndex, VectorStore};
use crate::embeddings::EmbeddingProvider;
use crate::types::AppResult;
use crate::utils::retry_on_rate_limit;

pub struct EmbeddedIndex<S> {
    store: S,
    embedder: Arc<dyn EmbeddingProvider>,
    policy: UpsertPolicy,
}

impl<S: VectorStore> EmbeddedIndex<S> {
    pub fn new(store: S, embedder: Arc<dyn EmbeddingProvider>, policy: UpsertPolicy) -> Self {
        Self {
            store,
            embedder,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: VectorStore + 'static> VectorIndex for EmbeddedIndex<S> {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    async fn upsert(&self, ids: &[String], documents: &[String]) -> AppResult<()> {
        ensure_same_len(ids.len(), documents.len(), "documents")?;

        let batches = self.policy.batch_count(ids.len());
        let size = self.policy.batch_size.max(1);
        let mut upserted = 0;

        for (batch, (id_chunk, doc_chunk)) in ids.chunks(size).zip(documents.chunks(size)).enumerate() {
            if batch > 0 && !self.policy.batch_delay.is_zero() {
                sleep(self.policy.batch_delay).await;
            }

            let vectors = retry_on_rate_limit(self.policy.retry, "embed documents", || {
                self.embedder.embed(doc_chunk)
            })
            .await?;

            retry_on_rate_limit(self.policy.retry, "upsert vectors", || {
                self.store.upsert_vectors(id_chunk, &vectors, doc_chunk)
            })
            .await?;

            upserted += id_chunk.len();
            info!(
                backend = self.name(),
                batch = batch + 1,
                batches,
                upserted,
                "Upserted batch"
            );
        }

        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> AppResult<Vec<ScoredCandidate>> {
        let vector = self.embedder.embed_one(text).await?;
        self.store.query_vector(&vector, k).await
    }

    /// All phrases are embedded in one call before the per-phrase queries run.
    async fn query_multi(&self, texts: &[String], top_k: usize) -> AppResult<Vec<ScoredCandidate>> {
        if texts.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(texts).await?;
        let per_phrase = fusion::overfetch(top_k);
        let result_sets =
            try_join_all(vectors.iter().map(|v| self.store.query_vector(v, per_phrase))).await?;

        debug!(
            backend = self.name(),
            phrases = texts.len(),
            hits = result_sets.iter().map(Vec::len).sum::<usize>(),
            "Fusing per-phrase results"
        );
        Ok(fusion::fuse(result_sets, top_k))
    }
}
