//! Postgres-backed store on diesel + r2d2.

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use uuid::Uuid;

use super::models::{
    Ingredient, NewIngredient, NewRecipe, NewRecipeIngredient, NewStep, RecipeSummary,
};
use super::schema::{ingredients, recipe_ingredients, recipe_steps, recipes};
use super::{
    IngredientRow, NewIngredientRow, NewRecipeIngredientRow, NewRecipeRow, NewStepRow,
    RecipeStore, RecipeTx, StoreError, MAX_PARAMS_PER_STATEMENT,
};
use crate::types::ExistingRecipeSummary;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Build a connection pool and run pending migrations.
pub fn create_pool(database_url: &str) -> Result<DbPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .map_err(|e| StoreError::Connection(format!("failed to create pool: {}", e)))?;

    let mut conn = pool
        .get()
        .map_err(|e| StoreError::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Connection(format!("failed to run migrations: {}", e)))?;

    Ok(pool)
}

// Errors raised by diesel inside a transaction that no method classified.
impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

fn creation(err: diesel::result::Error) -> StoreError {
    StoreError::Creation(err.to_string())
}

fn deletion(err: diesel::result::Error) -> StoreError {
    StoreError::Deletion(err.to_string())
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    max_params: usize,
}

impl PgStore {
    /// Reads the parameter ceiling from `MISE_MAX_PARAMS_PER_STATEMENT` (default 100).
    pub fn new(pool: DbPool) -> Self {
        let max_params = std::env::var("MISE_MAX_PARAMS_PER_STATEMENT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(MAX_PARAMS_PER_STATEMENT);
        Self { pool, max_params }
    }

    pub fn with_max_params(mut self, max_params: usize) -> Self {
        self.max_params = max_params.max(1);
        self
    }
}

impl RecipeStore for PgStore {
    fn max_params_per_statement(&self) -> usize {
        self.max_params
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn RecipeTx) -> Result<T, StoreError>,
    {
        let mut pooled = self
            .pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<T, StoreError, _>(|conn| {
            let mut tx = PgTx { conn };
            f(&mut tx)
        })
    }
}

struct PgTx<'a> {
    conn: &'a mut PgConnection,
}

impl RecipeTx for PgTx<'_> {
    fn insert_recipe(&mut self, row: &NewRecipeRow) -> Result<Uuid, StoreError> {
        diesel::insert_into(recipes::table)
            .values(NewRecipe::from(row))
            .returning(recipes::id)
            .get_result(self.conn)
            .map_err(creation)
    }

    fn insert_steps(&mut self, rows: &[NewStepRow]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let values: Vec<NewStep> = rows.iter().map(NewStep::from).collect();
        diesel::insert_into(recipe_steps::table)
            .values(&values)
            .execute(self.conn)
            .map_err(creation)
    }

    fn find_ingredients_by_name(
        &mut self,
        names: &[String],
    ) -> Result<Vec<IngredientRow>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Ingredient> = ingredients::table
            .filter(ingredients::name.eq_any(names))
            .select(Ingredient::as_select())
            .load(self.conn)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(found.into_iter().map(IngredientRow::from).collect())
    }

    fn insert_ingredients(
        &mut self,
        rows: &[NewIngredientRow],
    ) -> Result<Vec<IngredientRow>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<NewIngredient> = rows.iter().map(NewIngredient::from).collect();
        let created: Vec<Ingredient> = diesel::insert_into(ingredients::table)
            .values(&values)
            .on_conflict(ingredients::name)
            .do_nothing()
            .returning(Ingredient::as_returning())
            .get_results(self.conn)
            .map_err(creation)?;
        Ok(created.into_iter().map(IngredientRow::from).collect())
    }

    fn find_ingredient(&mut self, id: Uuid) -> Result<Option<IngredientRow>, StoreError> {
        let found: Option<Ingredient> = ingredients::table
            .find(id)
            .select(Ingredient::as_select())
            .first(self.conn)
            .optional()
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(found.map(IngredientRow::from))
    }

    fn insert_recipe_ingredients(
        &mut self,
        rows: &[NewRecipeIngredientRow],
    ) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let values: Vec<NewRecipeIngredient> =
            rows.iter().map(NewRecipeIngredient::from).collect();
        diesel::insert_into(recipe_ingredients::table)
            .values(&values)
            .execute(self.conn)
            .map_err(creation)
    }

    fn find_recipe_by_normalized_url(
        &mut self,
        user_id: Uuid,
        normalized_url: &str,
    ) -> Result<Option<ExistingRecipeSummary>, StoreError> {
        let found: Option<RecipeSummary> = recipes::table
            .filter(recipes::created_by_id.eq(user_id))
            .filter(recipes::normalized_url.eq(normalized_url))
            .order(recipes::created_at.desc())
            .select(RecipeSummary::as_select())
            .first(self.conn)
            .optional()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(found.map(|r| ExistingRecipeSummary {
            id: r.id,
            title: r.title,
            source_url: r.source_url,
            created_at: r.created_at,
        }))
    }

    fn recipe_owner(&mut self, recipe_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        recipes::table
            .find(recipe_id)
            .select(recipes::created_by_id)
            .first(self.conn)
            .optional()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn delete_recipe(&mut self, recipe_id: Uuid) -> Result<usize, StoreError> {
        diesel::delete(recipes::table.find(recipe_id))
            .execute(self.conn)
            .map_err(deletion)
    }

    fn reassign_recipe_ingredients(&mut self, from: Uuid, to: Uuid) -> Result<usize, StoreError> {
        diesel::update(recipe_ingredients::table.filter(recipe_ingredients::ingredient_id.eq(from)))
            .set(recipe_ingredients::ingredient_id.eq(to))
            .execute(self.conn)
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn delete_ingredient(&mut self, id: Uuid) -> Result<usize, StoreError> {
        diesel::delete(ingredients::table.find(id))
            .execute(self.conn)
            .map_err(deletion)
    }
}
