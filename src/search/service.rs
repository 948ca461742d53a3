// Search service: expand -> multi-query retrieval -> profile lookup -> cards

use std::sync::Arc;

use tracing::{debug, info};

use super::expander::QueryExpander;
use crate::index::VectorIndex;
use crate::profiles::{project, ProfileCard, ProfileTable};
use crate::types::AppResult;

pub struct SearchService {
    expander: QueryExpander,
    index: Arc<dyn VectorIndex>,
    profiles: Arc<ProfileTable>,
    top_k: usize,
}

impl SearchService {
    pub fn new(
        expander: QueryExpander,
        index: Arc<dyn VectorIndex>,
        profiles: Arc<ProfileTable>,
        top_k: usize,
    ) -> Self {
        Self {
            expander,
            index,
            profiles,
            top_k,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.index.name()
    }

    /// Ranked cards for one help request. A blank query returns nothing without
    /// calling the model or the index.
    pub async fn search(&self, query: &str) -> AppResult<Vec<ProfileCard>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let expansion = self.expander.expand(query).await?;
        let phrases = expansion.phrases();
        if phrases.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.index.query_multi(&phrases, self.top_k).await?;
        let total = hits.len();

        let cards: Vec<ProfileCard> = hits
            .into_iter()
            .filter_map(|hit| {
                self.profiles
                    .get(&hit.id)
                    .map(|profile| project(&hit.id, profile, hit.score))
            })
            .collect();

        if cards.len() < total {
            debug!(dropped = total - cards.len(), "Dropped hits with no loaded profile");
        }
        info!(
            phrases = phrases.len(),
            degraded = expansion.is_degraded(),
            results = cards.len(),
            "Search complete"
        );
        Ok(cards)
    }
}

/// Every loaded profile, in load order, with a fixed score of 1.0
pub fn list_profiles(profiles: &ProfileTable) -> Vec<ProfileCard> {
    profiles
        .iter()
        .map(|(id, profile)| project(id, profile, 1.0))
        .collect()
}
