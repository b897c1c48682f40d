use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::database::{
    error::ActionError,
    repository::ShoppingListRepository,
    schema::{Id, ShoppingListEntry},
};

#[async_trait]
impl ShoppingListRepository for Pool<Postgres> {
    async fn shopping_list(&self, user: Id) -> Result<Vec<ShoppingListEntry>, ActionError> {
        let rows: Vec<ShoppingListEntry> = sqlx::query_as(
            "
            SELECT i.name AS name, SUM(ri.amount) AS total_amount, i.measurement_unit AS measurement_unit
            FROM cart_items c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
            GROUP BY i.id, i.name, i.measurement_unit
            ORDER BY i.name, i.measurement_unit
        ",
        )
        .bind(user)
        .fetch_all(self)
        .await?;

        Ok(rows)
    }
}
