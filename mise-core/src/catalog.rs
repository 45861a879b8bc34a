//! Shared ingredient catalog.
//!
//! Catalog rows are global: every user's recipes link to the same
//! `ingredients` table by normalized name. Concurrent extractions may both
//! try to create the same name; inserts skip names that already exist and
//! anything left unresolved is fetched again. Near-duplicates that still slip
//! through are reconciled with [`merge`].

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::store::chunk::chunks;
use crate::store::{NewIngredientRow, RecipeStore, RecipeTx, StoreError, INGREDIENT_COLUMNS};

/// Catalog key for an ingredient name: trimmed, lowercased, inner
/// whitespace collapsed.
pub fn normalize_ingredient_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Map every name in `names` to a catalog id, creating rows for unknown names.
///
/// The returned map is keyed by normalized name. Blank names are ignored.
/// Lookups and inserts are chunked so no statement exceeds `max_params`.
pub fn resolve_or_create(
    tx: &mut dyn RecipeTx,
    max_params: usize,
    names: &[String],
) -> Result<HashMap<String, Uuid>, StoreError> {
    let mut seen = HashSet::new();
    let wanted: Vec<String> = names
        .iter()
        .map(|n| normalize_ingredient_name(n))
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect();

    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    let mut resolved = fetch_by_name(tx, max_params, &wanted)?;

    let new_rows: Vec<NewIngredientRow> = wanted
        .iter()
        .filter(|name| !resolved.contains_key(*name))
        .map(|name| NewIngredientRow {
            id: Uuid::new_v4(),
            name: name.clone(),
            category: None,
        })
        .collect();

    let mut created = 0;
    for chunk in chunks(&new_rows, max_params, INGREDIENT_COLUMNS) {
        for row in tx.insert_ingredients(chunk)? {
            resolved.insert(row.name, row.id);
            created += 1;
        }
    }

    // Rows skipped on conflict were created by someone else in the meantime.
    let unresolved: Vec<String> = wanted
        .iter()
        .filter(|name| !resolved.contains_key(*name))
        .cloned()
        .collect();
    if !unresolved.is_empty() {
        tracing::debug!(
            count = unresolved.len(),
            "catalog: re-fetching ingredients created concurrently"
        );
        resolved.extend(fetch_by_name(tx, max_params, &unresolved)?);
    }

    if let Some(missing) = wanted.iter().find(|name| !resolved.contains_key(*name)) {
        return Err(StoreError::Creation(format!(
            "ingredient '{}' could not be resolved",
            missing
        )));
    }

    tracing::debug!(
        requested = wanted.len(),
        created,
        "catalog: ingredients resolved"
    );
    Ok(resolved)
}

fn fetch_by_name(
    tx: &mut dyn RecipeTx,
    max_params: usize,
    names: &[String],
) -> Result<HashMap<String, Uuid>, StoreError> {
    let mut found = HashMap::new();
    for chunk in chunks(names, max_params, 1) {
        for row in tx.find_ingredients_by_name(chunk)? {
            found.insert(row.name, row.id);
        }
    }
    Ok(found)
}

/// Move every recipe link from `source` to `target`, then delete `source`.
///
/// Returns the number of links moved.
pub fn merge<S: RecipeStore>(store: &S, source: Uuid, target: Uuid) -> Result<usize, StoreError> {
    if source == target {
        return Err(StoreError::Validation(
            "cannot merge an ingredient into itself".to_string(),
        ));
    }

    store.transaction(|tx| {
        let from = tx
            .find_ingredient(source)?
            .ok_or_else(|| StoreError::NotFound(format!("ingredient {}", source)))?;
        let to = tx
            .find_ingredient(target)?
            .ok_or_else(|| StoreError::NotFound(format!("ingredient {}", target)))?;

        let moved = tx.reassign_recipe_ingredients(from.id, to.id)?;
        if tx.delete_ingredient(from.id)? == 0 {
            return Err(StoreError::Deletion(format!("ingredient {}", from.id)));
        }

        tracing::info!(
            source = %from.name,
            target = %to.name,
            moved,
            "catalog: ingredients merged"
        );
        Ok(moved)
    })
}
