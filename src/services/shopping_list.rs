use warp::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    Reply,
};

use crate::{
    constants::{SHOPPING_LIST_FILE_NAME, SHOPPING_LIST_HEADER},
    error::ActionError,
    repository::ShoppingListRepository,
    schema::{Id, ShoppingListEntry},
};

/// Sums the ingredient amounts of every recipe in the user's cart.
pub async fn shopping_list<S>(store: &S, user: Id) -> Result<Vec<ShoppingListEntry>, ActionError>
where
    S: ShoppingListRepository,
{
    let entries = store.shopping_list(user).await?;
    log::debug!("Shopping list of user {user} has {} entries", entries.len());
    Ok(entries)
}

pub fn render_shopping_list(entries: &[ShoppingListEntry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                "{} - {} {}.",
                entry.name, entry.total_amount, entry.measurement_unit
            )
        })
        .collect();

    if lines.is_empty() {
        return SHOPPING_LIST_HEADER.to_owned();
    }
    format!("{SHOPPING_LIST_HEADER}\n{}", lines.join("\n"))
}

/// Plain text download of the shopping list.
pub fn shopping_list_attachment(entries: &[ShoppingListEntry]) -> impl Reply {
    let body = render_shopping_list(entries);
    let reply = warp::reply::with_header(body, CONTENT_TYPE, "text/plain; charset=utf-8");
    warp::reply::with_header(
        reply,
        CONTENT_DISPOSITION,
        format!("attachment; filename={SHOPPING_LIST_FILE_NAME}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fixtures::{draft, register, seed_catalog},
        memory::MemoryStore,
        services::{interactions::add_to_cart, recipes::create_recipe},
    };

    fn entry(name: &str, total_amount: i64, unit: &str) -> ShoppingListEntry {
        ShoppingListEntry {
            name: name.to_owned(),
            total_amount,
            measurement_unit: unit.to_owned(),
        }
    }

    #[tokio::test]
    async fn amounts_are_summed_across_cart_recipes() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let bread = create_recipe(
            &store,
            anna,
            &draft("Bread", &[catalog.dinner], &[(catalog.flour, 200)]),
        )
        .await
        .unwrap();
        let crepes = create_recipe(
            &store,
            anna,
            &draft(
                "Crepes",
                &[catalog.breakfast],
                &[(catalog.flour, 300), (catalog.eggs, 2)],
            ),
        )
        .await
        .unwrap();
        add_to_cart(&store, anna, bread.id).await.unwrap();
        add_to_cart(&store, anna, crepes.id).await.unwrap();

        let mut entries = shopping_list(&store, anna).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![entry("eggs", 2, "pcs"), entry("flour", 500, "g")]
        );
    }

    #[tokio::test]
    async fn empty_cart_gives_empty_list() {
        let store = MemoryStore::new();
        let anna = register(&store, "anna").await;

        assert!(shopping_list(&store, anna).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_users_carts_are_not_counted() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let boris = register(&store, "boris").await;
        let bread = create_recipe(
            &store,
            anna,
            &draft("Bread", &[catalog.dinner], &[(catalog.flour, 200)]),
        )
        .await
        .unwrap();
        add_to_cart(&store, boris, bread.id).await.unwrap();

        assert!(shopping_list(&store, anna).await.unwrap().is_empty());
        assert_eq!(shopping_list(&store, boris).await.unwrap().len(), 1);
    }

    #[test]
    fn rendering() {
        let text = render_shopping_list(&[entry("eggs", 2, "pcs"), entry("flour", 500, "g")]);
        assert_eq!(text, "Shopping list:\neggs - 2 pcs.\nflour - 500 g.");
        assert_eq!(render_shopping_list(&[]), "Shopping list:");
    }

    #[test]
    fn attachment_headers() {
        let response = shopping_list_attachment(&[entry("flour", 500, "g")]).into_response();
        let headers = response.headers();

        assert_eq!(
            headers.get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=shopping_cart.txt"
        );
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
