//! Local disk vector store.
//!
//! Brute-force cosine search over every entry of one collection. The collection is
//! a JSON file `<dir>/<name>.json`, loaded on first use or created empty, and
//! rewritten after each upsert (temp file + rename).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info};

use super::{ensure_same_len, score_from_cosine_distance, ScoredCandidate, VectorStore};
use crate::types::{AppError, AppResult};

/// One stored (id, vector, document) triple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collection {
    name: String,
    metric: String,
    entries: Vec<IndexEntry>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Collection {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            metric: "cosine".to_string(),
            ..Default::default()
        }
    }

    fn reindex(&mut self) {
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
    }

    fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }

    fn upsert(&mut self, entry: IndexEntry) {
        match self.positions.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

pub struct LocalStore {
    name: String,
    path: Option<PathBuf>,
    collection: OnceCell<RwLock<Collection>>,
    // Held for the whole of each upsert; writers never interleave
    persist: Mutex<()>,
}

impl LocalStore {
    /// Store backed by `<dir>/<collection>.json`
    pub fn open(dir: impl AsRef<Path>, collection: &str) -> Self {
        Self {
            name: collection.to_string(),
            path: Some(dir.as_ref().join(format!("{}.json", collection))),
            collection: OnceCell::new(),
            persist: Mutex::new(()),
        }
    }

    /// Store that never touches disk
    pub fn in_memory(collection: &str) -> Self {
        Self {
            name: collection.to_string(),
            path: None,
            collection: OnceCell::new(),
            persist: Mutex::new(()),
        }
    }

    pub async fn count(&self) -> AppResult<usize> {
        Ok(self.collection().await?.read().await.entries.len())
    }

    async fn collection(&self) -> AppResult<&RwLock<Collection>> {
        self.collection.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> AppResult<RwLock<Collection>> {
        let Some(path) = &self.path else {
            return Ok(RwLock::new(Collection::empty(&self.name)));
        };

        if !fs::try_exists(path).await? {
            info!(collection = %self.name, path = %path.display(), "Creating local collection");
            return Ok(RwLock::new(Collection::empty(&self.name)));
        }

        let bytes = fs::read(path).await?;
        let mut collection: Collection = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Index(format!("Corrupt collection file {}: {}", path.display(), e))
        })?;
        collection.reindex();
        info!(
            collection = %self.name,
            entries = collection.entries.len(),
            "Loaded local collection"
        );
        Ok(RwLock::new(collection))
    }

    async fn write_file(&self, path: &Path, bytes: Vec<u8>) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "Persisted local collection");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upsert_vectors(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
    ) -> AppResult<()> {
        ensure_same_len(ids.len(), vectors.len(), "vectors")?;
        ensure_same_len(ids.len(), documents.len(), "documents")?;

        let collection = self.collection().await?;
        let _persist = self.persist.lock().await;

        // Build the next state off to the side; memory only changes once disk has it
        let mut next = collection.read().await.clone();
        let dimension = next.dimension().or_else(|| vectors.first().map(Vec::len));
        if let Some(dim) = dimension {
            if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
                return Err(AppError::Index(format!(
                    "Vector dimension {} does not match collection dimension {}",
                    bad.len(),
                    dim
                )));
            }
        }
        for ((id, vector), document) in ids.iter().zip(vectors).zip(documents) {
            next.upsert(IndexEntry {
                id: id.clone(),
                vector: vector.clone(),
                document: document.clone(),
            });
        }

        if let Some(path) = &self.path {
            self.write_file(path, serde_json::to_vec(&next)?).await?;
        }
        *collection.write().await = next;
        Ok(())
    }

    async fn query_vector(&self, vector: &[f32], k: usize) -> AppResult<Vec<ScoredCandidate>> {
        let collection = self.collection().await?;
        let guard = collection.read().await;

        if guard.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dim) = guard.dimension() {
            if dim != vector.len() {
                return Err(AppError::Index(format!(
                    "Query dimension {} does not match collection dimension {}",
                    vector.len(),
                    dim
                )));
            }
        }

        let mut distances: Vec<(usize, f32)> = guard
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_distance(vector, &entry.vector)))
            .collect();
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        distances.truncate(k);

        Ok(distances
            .into_iter()
            .map(|(i, distance)| {
                ScoredCandidate::new(guard.entries[i].id.clone(), score_from_cosine_distance(distance))
            })
            .collect())
    }
}

/// `1 - cos(a, b)`, in [0, 2]. A zero vector is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
