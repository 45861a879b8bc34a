//! In-memory `RecipeStore` for tests and dry runs.
//!
//! Behaves like the relational schema: unique catalog names, unique
//! `(recipe_id, step_number)`, cascade deletes, and transactions that commit
//! only on success. It also enforces the parameter ceiling and records every
//! statement so tests can assert on batching.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use super::{
    IngredientRow, NewIngredientRow, NewRecipeIngredientRow, NewRecipeRow, NewStepRow,
    RecipeStore, RecipeTx, StoreError, INGREDIENT_COLUMNS, MAX_PARAMS_PER_STATEMENT,
    RECIPE_COLUMNS, RECIPE_INGREDIENT_COLUMNS, STEP_COLUMNS,
};
use crate::types::ExistingRecipeSummary;

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table: &'static str,
    pub operation: &'static str,
    pub rows: usize,
    pub params: usize,
}

#[derive(Debug, Clone)]
struct StoredRecipe {
    row: NewRecipeRow,
    created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    recipes: Vec<StoredRecipe>,
    steps: Vec<NewStepRow>,
    ingredients: Vec<IngredientRow>,
    recipe_ingredients: Vec<NewRecipeIngredientRow>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    statements: Mutex<Vec<Statement>>,
    max_params: usize,
    failing_table: Option<&'static str>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            statements: Mutex::new(Vec::new()),
            max_params: MAX_PARAMS_PER_STATEMENT,
            failing_table: None,
        }
    }

    pub fn with_max_params(mut self, max_params: usize) -> Self {
        self.max_params = max_params;
        self
    }

    /// Make every insert into `table` fail, to exercise rollback.
    pub fn failing_inserts_into(mut self, table: &'static str) -> Self {
        self.failing_table = Some(table);
        self
    }

    /// Statements executed by committed and rolled-back transactions alike.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear_statements(&self) {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn snapshot(&self) -> MemoryState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn recipes(&self) -> Vec<NewRecipeRow> {
        self.snapshot().recipes.into_iter().map(|r| r.row).collect()
    }

    pub fn ingredients(&self) -> Vec<IngredientRow> {
        self.snapshot().ingredients
    }

    /// Steps of one recipe, ordered by step number.
    pub fn steps_for(&self, recipe_id: Uuid) -> Vec<NewStepRow> {
        let mut steps: Vec<NewStepRow> = self
            .snapshot()
            .steps
            .into_iter()
            .filter(|s| s.recipe_id == recipe_id)
            .collect();
        steps.sort_by_key(|s| s.step_number);
        steps
    }

    pub fn recipe_ingredients_for(&self, recipe_id: Uuid) -> Vec<NewRecipeIngredientRow> {
        self.snapshot()
            .recipe_ingredients
            .into_iter()
            .filter(|ri| ri.recipe_id == recipe_id)
            .collect()
    }

    /// Insert a catalog row directly, outside any transaction.
    pub fn seed_ingredient(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .ingredients
            .push(IngredientRow {
                id,
                name: name.to_string(),
                category: None,
            });
        id
    }
}

impl RecipeStore for MemoryStore {
    fn max_params_per_statement(&self) -> usize {
        self.max_params
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn RecipeTx) -> Result<T, StoreError>,
    {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut tx = MemoryTx {
            state: state.clone(),
            statements: Vec::new(),
            max_params: self.max_params,
            failing_table: self.failing_table,
        };

        let result = f(&mut tx);

        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(tx.statements);

        if result.is_ok() {
            *state = tx.state;
        }
        result
    }
}

struct MemoryTx {
    state: MemoryState,
    statements: Vec<Statement>,
    max_params: usize,
    failing_table: Option<&'static str>,
}

impl MemoryTx {
    fn execute(
        &mut self,
        table: &'static str,
        operation: &'static str,
        rows: usize,
        params: usize,
    ) -> Result<(), StoreError> {
        if params > self.max_params {
            return Err(StoreError::Query(format!(
                "{} {} uses {} parameters, limit is {}",
                operation, table, params, self.max_params
            )));
        }
        self.statements.push(Statement {
            table,
            operation,
            rows,
            params,
        });
        if operation == "insert" && self.failing_table == Some(table) {
            return Err(StoreError::Creation(format!("insert into {} failed", table)));
        }
        Ok(())
    }
}

impl RecipeTx for MemoryTx {
    fn insert_recipe(&mut self, row: &NewRecipeRow) -> Result<Uuid, StoreError> {
        self.execute("recipes", "insert", 1, RECIPE_COLUMNS)?;
        let seq = self.state.next_seq;
        self.state.next_seq += 1;
        self.state.recipes.push(StoredRecipe {
            row: row.clone(),
            created_at: Utc::now(),
            seq,
        });
        Ok(row.id)
    }

    fn insert_steps(&mut self, rows: &[NewStepRow]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.execute("recipe_steps", "insert", rows.len(), rows.len() * STEP_COLUMNS)?;
        for row in rows {
            if self
                .state
                .steps
                .iter()
                .any(|s| s.recipe_id == row.recipe_id && s.step_number == row.step_number)
            {
                return Err(StoreError::Creation(format!(
                    "duplicate step {} for recipe {}",
                    row.step_number, row.recipe_id
                )));
            }
            if !self.state.recipes.iter().any(|r| r.row.id == row.recipe_id) {
                return Err(StoreError::Creation(format!("recipe {} does not exist", row.recipe_id)));
            }
            self.state.steps.push(row.clone());
        }
        Ok(rows.len())
    }

    fn find_ingredients_by_name(
        &mut self,
        names: &[String],
    ) -> Result<Vec<IngredientRow>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        self.execute("ingredients", "select", names.len(), names.len())?;
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(self
            .state
            .ingredients
            .iter()
            .filter(|i| wanted.contains(i.name.as_str()))
            .cloned()
            .collect())
    }

    fn insert_ingredients(
        &mut self,
        rows: &[NewIngredientRow],
    ) -> Result<Vec<IngredientRow>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.execute("ingredients", "insert", rows.len(), rows.len() * INGREDIENT_COLUMNS)?;
        let mut created = Vec::new();
        for row in rows {
            // ON CONFLICT (name) DO NOTHING
            if self.state.ingredients.iter().any(|i| i.name == row.name) {
                continue;
            }
            let inserted = IngredientRow {
                id: row.id,
                name: row.name.clone(),
                category: row.category.clone(),
            };
            self.state.ingredients.push(inserted.clone());
            created.push(inserted);
        }
        Ok(created)
    }

    fn find_ingredient(&mut self, id: Uuid) -> Result<Option<IngredientRow>, StoreError> {
        self.execute("ingredients", "select", 1, 1)?;
        Ok(self.state.ingredients.iter().find(|i| i.id == id).cloned())
    }

    fn insert_recipe_ingredients(
        &mut self,
        rows: &[NewRecipeIngredientRow],
    ) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.execute(
            "recipe_ingredients",
            "insert",
            rows.len(),
            rows.len() * RECIPE_INGREDIENT_COLUMNS,
        )?;
        for row in rows {
            if !self.state.ingredients.iter().any(|i| i.id == row.ingredient_id) {
                return Err(StoreError::Creation(format!(
                    "ingredient {} does not exist",
                    row.ingredient_id
                )));
            }
            self.state.recipe_ingredients.push(row.clone());
        }
        Ok(rows.len())
    }

    fn find_recipe_by_normalized_url(
        &mut self,
        user_id: Uuid,
        normalized_url: &str,
    ) -> Result<Option<ExistingRecipeSummary>, StoreError> {
        self.execute("recipes", "select", 1, 2)?;
        Ok(self
            .state
            .recipes
            .iter()
            .filter(|r| r.row.created_by_id == user_id && r.row.normalized_url == normalized_url)
            .max_by_key(|r| r.seq)
            .map(|r| ExistingRecipeSummary {
                id: r.row.id,
                title: r.row.title.clone(),
                source_url: r.row.source_url.clone(),
                created_at: r.created_at,
            }))
    }

    fn recipe_owner(&mut self, recipe_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.execute("recipes", "select", 1, 1)?;
        Ok(self
            .state
            .recipes
            .iter()
            .find(|r| r.row.id == recipe_id)
            .map(|r| r.row.created_by_id))
    }

    fn delete_recipe(&mut self, recipe_id: Uuid) -> Result<usize, StoreError> {
        self.execute("recipes", "delete", 1, 1)?;
        let before = self.state.recipes.len();
        self.state.recipes.retain(|r| r.row.id != recipe_id);
        self.state.steps.retain(|s| s.recipe_id != recipe_id);
        self.state
            .recipe_ingredients
            .retain(|ri| ri.recipe_id != recipe_id);
        Ok(before - self.state.recipes.len())
    }

    fn reassign_recipe_ingredients(&mut self, from: Uuid, to: Uuid) -> Result<usize, StoreError> {
        self.execute("recipe_ingredients", "update", 0, 2)?;
        let mut moved = 0;
        for ri in self
            .state
            .recipe_ingredients
            .iter_mut()
            .filter(|ri| ri.ingredient_id == from)
        {
            ri.ingredient_id = to;
            moved += 1;
        }
        Ok(moved)
    }

    fn delete_ingredient(&mut self, id: Uuid) -> Result<usize, StoreError> {
        self.execute("ingredients", "delete", 1, 1)?;
        if self
            .state
            .recipe_ingredients
            .iter()
            .any(|ri| ri.ingredient_id == id)
        {
            return Err(StoreError::Deletion(format!(
                "ingredient {} is still referenced",
                id
            )));
        }
        let before = self.state.ingredients.len();
        self.state.ingredients.retain(|i| i.id != id);
        Ok(before - self.state.ingredients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str) -> NewIngredientRow {
        NewIngredientRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: None,
        }
    }

    #[test]
    fn test_rollback_on_error() {
        let store = MemoryStore::new();
        let result: Result<(), StoreError> = store.transaction(|tx| {
            tx.insert_ingredients(&[ingredient("salt")])?;
            Err(StoreError::Creation("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(store.ingredients().is_empty());
        assert_eq!(store.statements().len(), 1);
    }

    #[test]
    fn test_insert_ingredients_skips_existing_names() {
        let store = MemoryStore::new();
        store.seed_ingredient("salt");

        let created = store
            .transaction(|tx| tx.insert_ingredients(&[ingredient("salt"), ingredient("pepper")]))
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "pepper");
        assert_eq!(store.ingredients().len(), 2);
    }

    #[test]
    fn test_parameter_ceiling_enforced() {
        let store = MemoryStore::new().with_max_params(10);
        let rows: Vec<NewIngredientRow> = (0..4).map(|i| ingredient(&format!("i{}", i))).collect();

        let err = store.transaction(|tx| tx.insert_ingredients(&rows)).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));

        let ok = store.transaction(|tx| tx.insert_ingredients(&rows[..3])).unwrap();
        assert_eq!(ok.len(), 3);
    }

    #[test]
    fn test_failing_table() {
        let store = MemoryStore::new().failing_inserts_into("ingredients");
        let err = store
            .transaction(|tx| tx.insert_ingredients(&[ingredient("salt")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Creation(_)));
        assert!(store.ingredients().is_empty());
    }
}
