//! Postgres implementations of the repository traits.
//!
//! Every trait in `database::repository` is implemented directly on
//! `Pool<Postgres>`, so a pool can be handed to any service as the store.

mod catalog;
mod follows;
mod interactions;
mod recipes;
mod shopping_list;
mod users;

use sqlx::{Pool, Postgres};

use super::error::ActionError;

/// Applies the bundled schema migrations.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), ActionError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ActionError::Query(format!("Migration failed: {e}")))?;

    log::info!("Database schema is up to date");
    Ok(())
}

/// Escapes `%`, `_` and `\` so user input can be used as a LIKE prefix.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
