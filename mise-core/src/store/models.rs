use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{ingredients, recipe_ingredients, recipe_steps, recipes};
use super::{IngredientRow, NewIngredientRow, NewRecipeIngredientRow, NewRecipeRow, NewStepRow};

#[derive(Insertable)]
#[diesel(table_name = recipes)]
pub struct NewRecipe<'a> {
    pub id: Uuid,
    pub created_by_id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub servings: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub source_url: &'a str,
    pub normalized_url: &'a str,
    pub source_type: &'a str,
    pub youtube_video_id: Option<&'a str>,
    pub thumbnail_url: Option<&'a str>,
    pub author: Option<&'a str>,
}

impl<'a> From<&'a NewRecipeRow> for NewRecipe<'a> {
    fn from(row: &'a NewRecipeRow) -> Self {
        Self {
            id: row.id,
            created_by_id: row.created_by_id,
            title: &row.title,
            description: row.description.as_deref(),
            servings: row.servings,
            prep_time_minutes: row.prep_time_minutes,
            cook_time_minutes: row.cook_time_minutes,
            calories: row.calories,
            protein: row.protein,
            carbs: row.carbs,
            fat: row.fat,
            fiber: row.fiber,
            source_url: &row.source_url,
            normalized_url: &row.normalized_url,
            source_type: &row.source_type,
            youtube_video_id: row.youtube_video_id.as_deref(),
            thumbnail_url: row.thumbnail_url.as_deref(),
            author: row.author.as_deref(),
        }
    }
}

/// Columns read back for the dedup lookup.
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = recipe_steps)]
pub struct NewStep<'a> {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_number: i32,
    pub instruction: &'a str,
    pub timestamp_seconds: Option<i32>,
    pub duration_seconds: Option<i32>,
}

impl<'a> From<&'a NewStepRow> for NewStep<'a> {
    fn from(row: &'a NewStepRow) -> Self {
        Self {
            id: row.id,
            recipe_id: row.recipe_id,
            step_number: row.step_number,
            instruction: &row.instruction,
            timestamp_seconds: row.timestamp_seconds,
            duration_seconds: row.duration_seconds,
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
}

impl From<Ingredient> for IngredientRow {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            category: ingredient.category,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = ingredients)]
pub struct NewIngredient<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub category: Option<&'a str>,
}

impl<'a> From<&'a NewIngredientRow> for NewIngredient<'a> {
    fn from(row: &'a NewIngredientRow) -> Self {
        Self {
            id: row.id,
            name: &row.name,
            category: row.category.as_deref(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = recipe_ingredients)]
pub struct NewRecipeIngredient<'a> {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Option<&'a str>,
    pub unit: Option<&'a str>,
    pub notes: Option<&'a str>,
}

impl<'a> From<&'a NewRecipeIngredientRow> for NewRecipeIngredient<'a> {
    fn from(row: &'a NewRecipeIngredientRow) -> Self {
        Self {
            id: row.id,
            recipe_id: row.recipe_id,
            ingredient_id: row.ingredient_id,
            quantity: row.quantity.as_deref(),
            unit: row.unit.as_deref(),
            notes: row.notes.as_deref(),
        }
    }
}
