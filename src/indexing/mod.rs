//! Indexing Pipeline
//!
//! Builds one document per profile and upserts it under the profile's id. The
//! index decides how documents are embedded and batched.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::index::VectorIndex;
use crate::profiles::{build_document, ProfileTable};
use crate::types::AppResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingReport {
    pub backend: String,
    pub total_profiles: usize,
    pub indexed: usize,
    pub elapsed_ms: u128,
}

pub struct IndexingPipeline {
    index: Arc<dyn VectorIndex>,
    max_profiles: Option<usize>,
}

impl IndexingPipeline {
    /// `max_profiles` caps the job to the first N profiles in load order
    pub fn new(index: Arc<dyn VectorIndex>, max_profiles: Option<usize>) -> Self {
        Self { index, max_profiles }
    }

    pub async fn run(&self, profiles: &ProfileTable) -> AppResult<IndexingReport> {
        let started = Instant::now();
        let total = profiles.len();
        let take = self.max_profiles.map_or(total, |cap| cap.min(total));
        if take < total {
            info!(cap = take, total, "Capping profiles to index");
        }

        let (ids, documents): (Vec<String>, Vec<String>) = profiles
            .iter()
            .take(take)
            .map(|(id, profile)| (id.to_string(), build_document(profile)))
            .unzip();

        info!(backend = self.index.name(), documents = documents.len(), "Upserting documents");
        self.index.upsert(&ids, &documents).await?;

        let report = IndexingReport {
            backend: self.index.name().to_string(),
            total_profiles: total,
            indexed: ids.len(),
            elapsed_ms: started.elapsed().as_millis(),
        };
        info!(
            backend = %report.backend,
            indexed = report.indexed,
            elapsed_ms = report.elapsed_ms as u64,
            "Indexing finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::Profile;
    use crate::testing::{profile_a, FixedIndex};
    use serde_json::json;

    fn table(n: usize) -> ProfileTable {
        let profiles = (0..n)
            .map(|i| serde_json::from_value::<Profile>(json!({"id": format!("p{}", i), "headline": "Engineer"})).unwrap())
            .collect();
        ProfileTable::new(profiles)
    }

    #[tokio::test]
    async fn test_indexes_every_profile_in_order() {
        let index = Arc::new(FixedIndex::default());
        let report = IndexingPipeline::new(index.clone(), None)
            .run(&table(3))
            .await
            .unwrap();

        assert_eq!(report.indexed, 3);
        assert_eq!(report.total_profiles, 3);
        assert_eq!(index.upserted_ids(), vec!["p0", "p1", "p2"]);
    }

    #[tokio::test]
    async fn test_cap_takes_first_n() {
        let index = Arc::new(FixedIndex::default());
        let report = IndexingPipeline::new(index.clone(), Some(2))
            .run(&table(5))
            .await
            .unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(index.upserted_ids(), vec!["p0", "p1"]);

        let report = IndexingPipeline::new(Arc::new(FixedIndex::default()), Some(50))
            .run(&table(5))
            .await
            .unwrap();
        assert_eq!(report.indexed, 5);
    }

    #[tokio::test]
    async fn test_documents_match_builder() {
        let index = Arc::new(FixedIndex::default());
        let profile: Profile = serde_json::from_value(profile_a()).unwrap();
        let expected = build_document(&profile);

        IndexingPipeline::new(index.clone(), None)
            .run(&ProfileTable::new(vec![profile]))
            .await
            .unwrap();

        let upserted = index.upserted.lock().unwrap();
        assert_eq!(upserted[0], ("a".to_string(), expected));
    }
}
