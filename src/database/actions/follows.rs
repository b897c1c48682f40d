use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use crate::database::{
    error::ActionError,
    pagination::PageRequest,
    repository::FollowRepository,
    schema::{FollowedAuthor, Id, RecipeSummary, UserProfile},
};

#[derive(FromRow)]
struct FollowingRow {
    #[sqlx(flatten)]
    author: UserProfile,
    count: i64,
}

#[derive(FromRow)]
struct AuthoredRecipe {
    author_id: Id,
    #[sqlx(flatten)]
    summary: RecipeSummary,
}

#[async_trait]
impl FollowRepository for Pool<Postgres> {
    async fn insert_follow(&self, user: Id, target: Id) -> Result<(), ActionError> {
        let result = sqlx::query(
            "INSERT INTO follows (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(target)
        .execute(self)
        .await
        .map_err(|e| match ActionError::from(e) {
            ActionError::NotFound(_) => ActionError::not_found("No user exists with specified id"),
            e => e,
        })?;

        if result.rows_affected() == 0 {
            return Err(ActionError::conflict("You are already following this user"));
        }

        Ok(())
    }

    async fn delete_follow(&self, user: Id, target: Id) -> Result<(), ActionError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND following_id = $2")
            .bind(user)
            .bind(target)
            .execute(self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ActionError::not_found("You are not following this user"));
        }

        Ok(())
    }

    async fn is_following(&self, user: Id, target: Id) -> Result<bool, ActionError> {
        let row: Option<(Id,)> =
            sqlx::query_as("SELECT id FROM follows WHERE user_id = $1 AND following_id = $2")
                .bind(user)
                .bind(target)
                .fetch_optional(self)
                .await?;

        Ok(row.is_some())
    }

    async fn list_following(
        &self,
        user: Id,
        recipes_limit: Option<i64>,
        page: PageRequest,
    ) -> Result<(Vec<FollowedAuthor>, i64), ActionError> {
        let authors: Vec<FollowingRow> = sqlx::query_as(
            "
            SELECT u.id, u.username, u.email, u.first_name, u.last_name,
                TRUE AS is_subscribed,
                COUNT(*) OVER() AS count
            FROM follows f
            INNER JOIN users u ON u.id = f.following_id
            WHERE f.user_id = $1
            ORDER BY u.username
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(user)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self)
        .await?;

        let Some(total_count) = authors.first().map(|row| row.count) else {
            // Past the last page the window count is gone with the rows.
            let (count,): (i64,) = sqlx::query_as(
                "
                SELECT COUNT(*)
                FROM follows f
                INNER JOIN users u ON u.id = f.following_id
                WHERE f.user_id = $1
            ",
            )
            .bind(user)
            .fetch_one(self)
            .await?;

            return Ok((vec![], count));
        };

        let author_ids: Vec<Id> = authors.iter().map(|row| row.author.id).collect();

        // One query for every author on the page instead of one per author.
        let counts: Vec<(Id, i64)> = sqlx::query_as(
            "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
        )
        .bind(&author_ids)
        .fetch_all(self)
        .await?;

        let recipes: Vec<AuthoredRecipe> = sqlx::query_as(
            "
            SELECT author_id, id, name, image, cooking_time
            FROM (
                SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                    ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS position
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE $2::BIGINT IS NULL OR position <= $2
            ORDER BY author_id, position
        ",
        )
        .bind(&author_ids)
        .bind(recipes_limit)
        .fetch_all(self)
        .await?;

        let counts: HashMap<Id, i64> = counts.into_iter().collect();
        let mut by_author: HashMap<Id, Vec<RecipeSummary>> = HashMap::new();
        for recipe in recipes {
            by_author
                .entry(recipe.author_id)
                .or_default()
                .push(recipe.summary);
        }

        let rows = authors
            .into_iter()
            .map(|row| {
                let id = row.author.id;
                FollowedAuthor {
                    author: row.author,
                    recipes: by_author.remove(&id).unwrap_or_default(),
                    recipes_count: counts.get(&id).copied().unwrap_or(0),
                }
            })
            .collect();

        Ok((rows, total_count))
    }
}
