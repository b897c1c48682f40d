use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::database::{
    error::ActionError,
    repository::CatalogRepository,
    schema::{Id, Ingredient, NewIngredient, NewTag, Tag},
};

use super::escape_like;

#[async_trait]
impl CatalogRepository for Pool<Postgres> {
    async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ActionError> {
        let row: Tag = sqlx::query_as(
            "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .fetch_one(self)
        .await
        .map_err(|e| match ActionError::from(e) {
            ActionError::Conflict(_) => {
                ActionError::conflict("A tag with that name, color or slug already exists")
            }
            e => e,
        })?;

        Ok(row)
    }

    async fn ensure_tag(&self, tag: &NewTag) -> Result<bool, ActionError> {
        let result = sqlx::query(
            "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .execute(self)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ActionError> {
        let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(self)
            .await?;

        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ActionError> {
        let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
            .fetch_all(self)
            .await?;

        Ok(list)
    }

    async fn create_ingredient(
        &self,
        ingredient: &NewIngredient,
    ) -> Result<Ingredient, ActionError> {
        let row: Ingredient = sqlx::query_as(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
        )
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .fetch_one(self)
        .await
        .map_err(|e| match ActionError::from(e) {
            ActionError::Conflict(_) => ActionError::conflict(format!(
                "Ingredient {} ({}) already exists",
                ingredient.name, ingredient.measurement_unit
            )),
            e => e,
        })?;

        Ok(row)
    }

    async fn ensure_ingredient(&self, ingredient: &NewIngredient) -> Result<bool, ActionError> {
        let result = sqlx::query(
            "
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            ON CONFLICT (name, measurement_unit) DO NOTHING
        ",
        )
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .execute(self)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ActionError> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(self)
            .await?;

        Ok(row)
    }

    async fn search_ingredients(&self, prefix: &str) -> Result<Vec<Ingredient>, ActionError> {
        let rows: Vec<Ingredient> = sqlx::query_as(
            "SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) || '%' ESCAPE '\\' ORDER BY name, measurement_unit",
        )
        .bind(escape_like(prefix))
        .fetch_all(self)
        .await?;

        Ok(rows)
    }
}
