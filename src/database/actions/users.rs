use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use crate::database::{
    error::ActionError,
    pagination::PageRequest,
    repository::UserRepository,
    schema::{Id, NewUser, User},
};

#[derive(FromRow)]
struct UserRow {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

#[async_trait]
impl UserRepository for Pool<Postgres> {
    async fn create_user(&self, user: &NewUser) -> Result<User, ActionError> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (username, email, first_name, last_name, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password)
        .fetch_one(self)
        .await
        .map_err(|e| match ActionError::from(e) {
            ActionError::Conflict(_) => {
                ActionError::conflict("A user with that username or email already exists")
            }
            e => e,
        })?;

        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, ActionError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self)
            .await?;

        Ok(row)
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ActionError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.username LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self)
        .await?;

        let total_count = match rows.first() {
            Some(row) => row.count,
            None if page.offset > 0 => {
                let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                    .fetch_one(self)
                    .await?;
                count
            }
            None => 0,
        };

        Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
    }

    async fn set_password(&self, id: Id, password_hash: &str) -> Result<(), ActionError> {
        let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ActionError::not_found("No user exists with specified id"));
        }

        Ok(())
    }

    async fn delete_user(&self, id: Id) -> Result<(), ActionError> {
        // follows, favorites and cart_items cascade, recipes.author_id is SET NULL
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ActionError::not_found("No user exists with specified id"));
        }

        Ok(())
    }
}
