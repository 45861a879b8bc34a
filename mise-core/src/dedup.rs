//! Per-user duplicate check by normalized source URL.

use uuid::Uuid;

use crate::store::{RecipeStore, StoreError};
use crate::types::ExistingRecipeSummary;
use crate::urls::normalize_url;

pub struct DedupGate<'a, S: RecipeStore> {
    store: &'a S,
}

impl<'a, S: RecipeStore> DedupGate<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The most recent recipe `user_id` saved from the same normalized URL.
    ///
    /// Other users' recipes never match.
    pub fn find_existing(
        &self,
        user_id: Uuid,
        source_url: &str,
    ) -> Result<Option<ExistingRecipeSummary>, StoreError> {
        let normalized = normalize_url(source_url);
        let existing = self
            .store
            .transaction(|tx| tx.find_recipe_by_normalized_url(user_id, &normalized))?;

        if let Some(summary) = &existing {
            tracing::info!(
                %user_id,
                url = %normalized,
                recipe_id = %summary.id,
                "dedup: recipe already saved"
            );
        }
        Ok(existing)
    }
}
