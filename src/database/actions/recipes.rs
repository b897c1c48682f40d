use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, Pool, Postgres, QueryBuilder};

use crate::database::{
    error::ActionError,
    pagination::PageRequest,
    repository::RecipeRepository,
    schema::{Id, Recipe, RecipeDraft, RecipeFilter, RecipePart, Tag},
};

#[derive(FromRow)]
struct RecipeRow {
    #[sqlx(flatten)]
    recipe: Recipe,
    count: i64,
}

fn recipe_name_conflict(e: sqlx::Error) -> ActionError {
    match ActionError::from(e) {
        ActionError::Conflict(_) => ActionError::conflict("A recipe with that name already exists"),
        e => e,
    }
}

/// Fails with NotFound on the first tag or ingredient id that doesn't exist.
async fn ensure_references(conn: &mut PgConnection, draft: &RecipeDraft) -> Result<(), ActionError> {
    let tag_ids: Vec<Id> = draft.tags.iter().copied().collect();
    let missing: Option<(Id,)> = sqlx::query_as(
        "
        SELECT requested.id
        FROM UNNEST($1::INTEGER[]) AS requested(id)
        WHERE NOT EXISTS (SELECT 1 FROM tags t WHERE t.id = requested.id)
        LIMIT 1
    ",
    )
    .bind(&tag_ids)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = missing {
        return Err(ActionError::not_found(format!("Tag {id} doesn't exist")));
    }

    let ingredient_ids: Vec<Id> = draft.ingredients.iter().map(|part| part.id).collect();
    let missing: Option<(Id,)> = sqlx::query_as(
        "
        SELECT requested.id
        FROM UNNEST($1::INTEGER[]) AS requested(id)
        WHERE NOT EXISTS (SELECT 1 FROM ingredients i WHERE i.id = requested.id)
        LIMIT 1
    ",
    )
    .bind(&ingredient_ids)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((id,)) = missing {
        return Err(ActionError::not_found(format!("Ingredient {id} doesn't exist")));
    }

    Ok(())
}

/// Deletes the recipe's tag links and ingredient rows and inserts the
/// submitted ones.
async fn replace_associations(
    conn: &mut PgConnection,
    recipe_id: Id,
    draft: &RecipeDraft,
) -> Result<(), ActionError> {
    let tag_ids: Vec<Id> = draft.tags.iter().copied().collect();

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::INTEGER[])")
        .bind(recipe_id)
        .bind(&tag_ids)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(draft.ingredients.iter(), |mut row, part| {
        row.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });
    builder.build().execute(&mut *conn).await?;

    Ok(())
}

/// Appends the listing filters to a query over `recipes r`.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter, viewer: Option<Id>) {
    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            builder
                .push(" AND EXISTS (SELECT 1 FROM cart_items c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }
}

#[async_trait]
impl RecipeRepository for Pool<Postgres> {
    async fn insert_recipe(&self, author: Id, draft: &RecipeDraft) -> Result<Recipe, ActionError> {
        let mut tr = self.begin().await?;

        ensure_references(&mut tr, draft).await?;

        let recipe: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(author)
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .fetch_one(&mut *tr)
        .await
        .map_err(recipe_name_conflict)?;

        replace_associations(&mut tr, recipe.id, draft).await?;

        tr.commit().await?;
        Ok(recipe)
    }

    async fn replace_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<Recipe, ActionError> {
        let mut tr = self.begin().await?;

        let recipe: Option<Recipe> = sqlx::query_as(
            "
            UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4
            WHERE id = $5
            RETURNING *
        ",
        )
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .bind(id)
        .fetch_optional(&mut *tr)
        .await
        .map_err(recipe_name_conflict)?;

        let Some(recipe) = recipe else {
            return Err(ActionError::not_found("No recipe exists with specified id"));
        };

        ensure_references(&mut tr, draft).await?;
        replace_associations(&mut tr, recipe.id, draft).await?;

        tr.commit().await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: Id) -> Result<(), ActionError> {
        // recipe_ingredients, recipe_tags, favorites and cart_items cascade
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ActionError::not_found("No recipe exists with specified id"));
        }

        Ok(())
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ActionError> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(self)
            .await?;

        Ok(row)
    }

    async fn recipe_tags(&self, id: Id) -> Result<Vec<Tag>, ActionError> {
        let list: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.*
            FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY t.id
        ",
        )
        .bind(id)
        .fetch_all(self)
        .await?;

        Ok(list)
    }

    async fn recipe_parts(&self, id: Id) -> Result<Vec<RecipePart>, ActionError> {
        let rows: Vec<RecipePart> = sqlx::query_as(
            "
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY ri.id
        ",
        )
        .bind(id)
        .fetch_all(self)
        .await?;

        Ok(rows)
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), ActionError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
        push_filters(&mut builder, filter, viewer);
        builder
            .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows: Vec<RecipeRow> = builder.build_query_as().fetch_all(self).await?;

        let total_count = match rows.first() {
            Some(row) => row.count,
            None if page.offset > 0 => {
                let mut builder: QueryBuilder<Postgres> =
                    QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
                push_filters(&mut builder, filter, viewer);

                let (count,): (i64,) = builder.build_query_as().fetch_one(self).await?;
                count
            }
            None => 0,
        };

        Ok((rows.into_iter().map(|row| row.recipe).collect(), total_count))
    }
}
