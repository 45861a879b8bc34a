//! Persistence boundary.
//!
//! The writer, catalog and dedup gate talk to storage only through
//! `RecipeStore` / `RecipeTx`. Every multi-row method issues exactly one
//! statement; callers chunk rows with `chunk::chunk_size` so no statement
//! exceeds the backend's parameter ceiling.

pub mod chunk;
mod memory;
mod models;
mod postgres;
mod schema;

pub use memory::{MemoryStore, Statement};
pub use postgres::{create_pool, DbPool, PgStore, MIGRATIONS};

use thiserror::Error;
use uuid::Uuid;

use crate::types::ExistingRecipeSummary;

/// Observed per-statement bind parameter ceiling of the storage backend.
pub const MAX_PARAMS_PER_STATEMENT: usize = 100;

pub const RECIPE_COLUMNS: usize = 18;
pub const STEP_COLUMNS: usize = 6;
pub const INGREDIENT_COLUMNS: usize = 3;
pub const RECIPE_INGREDIENT_COLUMNS: usize = 6;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to create: {0}")]
    Creation(String),

    #[error("Failed to delete: {0}")]
    Deletion(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Database connection failed: {0}")]
    Connection(String),
}

/// A recipe row ready to insert. Ids are generated by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipeRow {
    pub id: Uuid,
    pub created_by_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub servings: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub source_url: String,
    pub normalized_url: String,
    pub source_type: String,
    pub youtube_video_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStepRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_number: i32,
    pub instruction: String,
    pub timestamp_seconds: Option<i32>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredientRow {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipeIngredientRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

/// A catalog ingredient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientRow {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
}

/// Operations available inside one storage transaction.
pub trait RecipeTx {
    fn insert_recipe(&mut self, row: &NewRecipeRow) -> Result<Uuid, StoreError>;

    fn insert_steps(&mut self, rows: &[NewStepRow]) -> Result<usize, StoreError>;

    /// Catalog rows whose name is in `names`.
    fn find_ingredients_by_name(&mut self, names: &[String])
        -> Result<Vec<IngredientRow>, StoreError>;

    /// Insert catalog rows, skipping names that already exist. Returns only
    /// the rows actually created.
    fn insert_ingredients(
        &mut self,
        rows: &[NewIngredientRow],
    ) -> Result<Vec<IngredientRow>, StoreError>;

    fn find_ingredient(&mut self, id: Uuid) -> Result<Option<IngredientRow>, StoreError>;

    fn insert_recipe_ingredients(
        &mut self,
        rows: &[NewRecipeIngredientRow],
    ) -> Result<usize, StoreError>;

    /// Most recent recipe owned by `user_id` with this normalized URL.
    fn find_recipe_by_normalized_url(
        &mut self,
        user_id: Uuid,
        normalized_url: &str,
    ) -> Result<Option<ExistingRecipeSummary>, StoreError>;

    fn recipe_owner(&mut self, recipe_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Delete a recipe; its steps and ingredient links go with it.
    fn delete_recipe(&mut self, recipe_id: Uuid) -> Result<usize, StoreError>;

    /// Point every recipe link at `from` to `to` instead.
    fn reassign_recipe_ingredients(&mut self, from: Uuid, to: Uuid) -> Result<usize, StoreError>;

    fn delete_ingredient(&mut self, id: Uuid) -> Result<usize, StoreError>;
}

/// A relational store with transactions and a per-statement parameter ceiling.
pub trait RecipeStore: Send + Sync {
    fn max_params_per_statement(&self) -> usize;

    /// Run `f` in a transaction: committed if it returns `Ok`, rolled back otherwise.
    fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn RecipeTx) -> Result<T, StoreError>;
}
