//! Recipe persistence writer.
//!
//! A recipe is written in one transaction: the recipe row, its steps, the
//! catalog lookups and the ingredient links. Every multi-row insert is split
//! so that `rows * columns` stays within the store's parameter ceiling.

use uuid::Uuid;

use crate::catalog::{normalize_ingredient_name, resolve_or_create};
use crate::store::chunk::chunks;
use crate::store::{
    NewRecipeIngredientRow, NewRecipeRow, NewStepRow, RecipeStore, StoreError, RECIPE_COLUMNS,
    RECIPE_INGREDIENT_COLUMNS, STEP_COLUMNS,
};
use crate::types::{ExtractedRecipe, SourceMeta};
use crate::urls::normalize_url;

pub struct RecipeWriter<'a, S: RecipeStore> {
    store: &'a S,
}

impl<'a, S: RecipeStore> RecipeWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Persist an extracted recipe for `user_id`. Returns the new recipe id.
    ///
    /// Nothing is written if any statement fails.
    pub fn create(
        &self,
        user_id: Uuid,
        recipe: &ExtractedRecipe,
        source: &SourceMeta,
    ) -> Result<Uuid, StoreError> {
        let max_params = self.store.max_params_per_statement();
        if max_params < RECIPE_COLUMNS {
            return Err(StoreError::Validation(format!(
                "parameter ceiling {} is below the {} columns of a recipe row",
                max_params, RECIPE_COLUMNS
            )));
        }
        if recipe.title.trim().is_empty() {
            return Err(StoreError::Validation("recipe title is empty".to_string()));
        }

        let recipe_id = Uuid::new_v4();
        let row = recipe_row(recipe_id, user_id, recipe, source);
        let steps: Vec<NewStepRow> = recipe
            .steps
            .iter()
            .map(|step| NewStepRow {
                id: Uuid::new_v4(),
                recipe_id,
                step_number: step.step_number,
                instruction: step.instruction.clone(),
                timestamp_seconds: step.timestamp_seconds,
                duration_seconds: step.duration_seconds,
            })
            .collect();
        let ingredient_names: Vec<String> =
            recipe.ingredients.iter().map(|i| i.name.clone()).collect();

        self.store.transaction(|tx| {
            let recipe_id = tx.insert_recipe(&row)?;

            let mut step_statements = 0;
            for chunk in chunks(&steps, max_params, STEP_COLUMNS) {
                tx.insert_steps(chunk)?;
                step_statements += 1;
            }

            let ids = resolve_or_create(tx, max_params, &ingredient_names)?;

            let mut links = Vec::with_capacity(recipe.ingredients.len());
            for ingredient in &recipe.ingredients {
                let key = normalize_ingredient_name(&ingredient.name);
                if key.is_empty() {
                    continue;
                }
                let ingredient_id = ids.get(&key).copied().ok_or_else(|| {
                    StoreError::Creation(format!("ingredient '{}' was not resolved", key))
                })?;
                links.push(NewRecipeIngredientRow {
                    id: Uuid::new_v4(),
                    recipe_id,
                    ingredient_id,
                    quantity: ingredient.quantity.clone(),
                    unit: ingredient.unit.clone(),
                    notes: ingredient.notes.clone(),
                });
            }

            let mut link_statements = 0;
            for chunk in chunks(&links, max_params, RECIPE_INGREDIENT_COLUMNS) {
                tx.insert_recipe_ingredients(chunk)?;
                link_statements += 1;
            }

            tracing::info!(
                %recipe_id,
                %user_id,
                steps = steps.len(),
                step_statements,
                ingredients = links.len(),
                link_statements,
                "writer: recipe created"
            );
            Ok(recipe_id)
        })
    }

    /// Delete a recipe owned by `user_id`. Steps and ingredient links go with it.
    pub fn delete(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), StoreError> {
        self.store.transaction(|tx| {
            let owner = tx
                .recipe_owner(recipe_id)?
                .ok_or_else(|| StoreError::NotFound(format!("recipe {}", recipe_id)))?;
            if owner != user_id {
                return Err(StoreError::Validation(format!(
                    "recipe {} is not owned by user {}",
                    recipe_id, user_id
                )));
            }
            if tx.delete_recipe(recipe_id)? == 0 {
                return Err(StoreError::Deletion(format!("recipe {}", recipe_id)));
            }
            tracing::info!(%recipe_id, %user_id, "writer: recipe deleted");
            Ok(())
        })
    }
}

fn recipe_row(
    id: Uuid,
    user_id: Uuid,
    recipe: &ExtractedRecipe,
    source: &SourceMeta,
) -> NewRecipeRow {
    NewRecipeRow {
        id,
        created_by_id: user_id,
        title: recipe.title.clone(),
        description: recipe.description.clone(),
        servings: recipe.servings,
        prep_time_minutes: recipe.prep_time_minutes,
        cook_time_minutes: recipe.cook_time_minutes,
        calories: recipe.calories,
        protein: recipe.protein,
        carbs: recipe.carbs,
        fat: recipe.fat,
        fiber: recipe.fiber,
        source_url: source.source_url.clone(),
        normalized_url: normalize_url(&source.source_url),
        source_type: source.source_type.as_str().to_string(),
        youtube_video_id: source.youtube_video_id.clone(),
        thumbnail_url: source.thumbnail_url.clone(),
        author: source.author.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{ExtractedIngredient, ExtractedStep, SourceType};

    fn ingredient(name: &str) -> ExtractedIngredient {
        ExtractedIngredient {
            name: name.to_string(),
            quantity: Some("1".to_string()),
            unit: Some("cup".to_string()),
            notes: None,
        }
    }

    fn recipe(ingredients: usize, steps: usize) -> ExtractedRecipe {
        ExtractedRecipe {
            title: "Big Stew".to_string(),
            description: None,
            servings: Some(6),
            prep_time_minutes: None,
            cook_time_minutes: Some(90),
            calories: None,
            protein: None,
            carbs: None,
            fat: None,
            fiber: None,
            ingredients: (0..ingredients)
                .map(|i| ingredient(&format!("Ingredient {}", i)))
                .collect(),
            steps: (0..steps)
                .map(|i| ExtractedStep {
                    step_number: i as i32 + 1,
                    instruction: format!("Do thing {}", i + 1),
                    timestamp_seconds: None,
                    duration_seconds: None,
                })
                .collect(),
        }
    }

    fn blog_source(url: &str) -> SourceMeta {
        SourceMeta {
            source_url: url.to_string(),
            source_type: SourceType::Blog,
            youtube_video_id: None,
            thumbnail_url: None,
            author: None,
        }
    }

    #[test]
    fn test_create_writes_everything() {
        let store = MemoryStore::new();
        let writer = RecipeWriter::new(&store);
        let id = writer
            .create(
                Uuid::new_v4(),
                &recipe(3, 2),
                &blog_source("https://www.example.com/stew?utm_source=x"),
            )
            .unwrap();

        let recipes = store.recipes();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, id);
        assert_eq!(recipes[0].normalized_url, "https://example.com/stew");
        assert_eq!(recipes[0].source_type, "blog");
        assert_eq!(store.steps_for(id).len(), 2);
        assert_eq!(store.recipe_ingredients_for(id).len(), 3);
        assert_eq!(store.ingredients().len(), 3);
    }

    #[test]
    fn test_large_recipe_respects_ceiling() {
        let store = MemoryStore::new();
        let writer = RecipeWriter::new(&store);
        let id = writer
            .create(Uuid::new_v4(), &recipe(60, 40), &blog_source("https://example.com/a"))
            .unwrap();

        for statement in store.statements() {
            assert!(statement.params <= 100, "{:?}", statement);
        }
        // 40 steps at 16 per statement, 60 links at 16 per statement
        let inserts = |table: &str| {
            store
                .statements()
                .iter()
                .filter(|s| s.table == table && s.operation == "insert")
                .count()
        };
        assert_eq!(inserts("recipe_steps"), 3);
        assert_eq!(inserts("recipe_ingredients"), 4);
        assert_eq!(inserts("ingredients"), 2);
        assert_eq!(store.recipe_ingredients_for(id).len(), 60);
    }

    #[test]
    fn test_no_steps_no_ingredients() {
        let store = MemoryStore::new();
        let writer = RecipeWriter::new(&store);
        writer
            .create(Uuid::new_v4(), &recipe(0, 0), &blog_source("https://example.com/a"))
            .unwrap();

        let statements = store.statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].table, "recipes");
    }

    #[test]
    fn test_failure_leaves_nothing_behind() {
        let store = MemoryStore::new().failing_inserts_into("recipe_ingredients");
        let writer = RecipeWriter::new(&store);
        let err = writer
            .create(Uuid::new_v4(), &recipe(2, 2), &blog_source("https://example.com/a"))
            .unwrap_err();

        assert!(matches!(err, StoreError::Creation(_)));
        assert!(store.recipes().is_empty());
        assert!(store.ingredients().is_empty());
    }

    #[test]
    fn test_ceiling_below_recipe_row_rejected() {
        let store = MemoryStore::new().with_max_params(10);
        let writer = RecipeWriter::new(&store);
        let err = writer
            .create(Uuid::new_v4(), &recipe(1, 1), &blog_source("https://example.com/a"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.statements().is_empty());
    }

    #[test]
    fn test_duplicate_ingredient_entries_keep_their_own_links() {
        let store = MemoryStore::new();
        let writer = RecipeWriter::new(&store);
        let mut stew = recipe(0, 1);
        stew.ingredients = vec![ingredient("Salt"), ingredient(" salt ")];

        let id = writer
            .create(Uuid::new_v4(), &stew, &blog_source("https://example.com/a"))
            .unwrap();

        assert_eq!(store.ingredients().len(), 1);
        let links = store.recipe_ingredients_for(id);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].ingredient_id, links[1].ingredient_id);
    }

    #[test]
    fn test_delete_checks_ownership() {
        let store = MemoryStore::new();
        let writer = RecipeWriter::new(&store);
        let owner = Uuid::new_v4();
        let id = writer
            .create(owner, &recipe(2, 2), &blog_source("https://example.com/a"))
            .unwrap();

        assert!(matches!(
            writer.delete(Uuid::new_v4(), id),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            writer.delete(owner, Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));

        writer.delete(owner, id).unwrap();
        assert!(store.recipes().is_empty());
        assert!(store.steps_for(id).is_empty());
        assert!(store.recipe_ingredients_for(id).is_empty());
        // catalog rows are shared and survive
        assert_eq!(store.ingredients().len(), 2);
    }
}
