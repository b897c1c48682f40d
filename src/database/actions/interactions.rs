use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::database::{
    error::ActionError,
    repository::InteractionRepository,
    schema::{Collection, Id},
};

/// Postgres names the column foreign keys `<table>_<column>_fkey`.
fn references_user(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(e) => e
            .constraint()
            .is_some_and(|constraint| constraint.ends_with("_user_id_fkey")),
        _ => false,
    }
}

#[async_trait]
impl InteractionRepository for Pool<Postgres> {
    async fn add_to(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<(), ActionError> {
        // The unique (user_id, recipe_id) constraint decides between racing requests.
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            collection.table()
        ))
        .bind(user)
        .bind(recipe)
        .execute(self)
        .await
        .map_err(|e| {
            let missing_user = references_user(&e);
            match ActionError::from(e) {
                ActionError::NotFound(_) if missing_user => {
                    ActionError::not_found("No user exists with specified id")
                }
                ActionError::NotFound(_) => {
                    ActionError::not_found("No recipe exists with specified id")
                }
                e => e,
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(ActionError::conflict(format!(
                "Recipe is already in {}",
                collection.label()
            )));
        }

        Ok(())
    }

    async fn remove_from(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<(), ActionError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            collection.table()
        ))
        .bind(user)
        .bind(recipe)
        .execute(self)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ActionError::not_found(format!(
                "Recipe is not in {}",
                collection.label()
            )));
        }

        Ok(())
    }

    async fn contains(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<bool, ActionError> {
        let row: Option<(Id,)> = sqlx::query_as(&format!(
            "SELECT id FROM {} WHERE user_id = $1 AND recipe_id = $2",
            collection.table()
        ))
        .bind(user)
        .bind(recipe)
        .fetch_optional(self)
        .await?;

        Ok(row.is_some())
    }
}
