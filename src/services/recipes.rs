use crate::{
    error::ActionError,
    form::Form,
    pagination::{PageContext, PageRequest},
    repository::{RecipeRepository, Store},
    schema::{Collection, Id, Recipe, RecipeDetail, RecipeDraft, RecipeFilter},
    services::users::profile_for,
    validation::validate_recipe,
};

pub fn parse_recipe_form(form: &Form) -> Result<RecipeDraft, ActionError> {
    RecipeDraft::try_from(form)
}

/// Validates the draft and writes the recipe with its tags and ingredient
/// amounts. Nothing is stored when any part is rejected.
pub async fn create_recipe<S>(
    store: &S,
    author: Id,
    draft: &RecipeDraft,
) -> Result<Recipe, ActionError>
where
    S: RecipeRepository,
{
    if let Err(e) = validate_recipe(draft) {
        log::warn!("Rejected recipe '{}' from user {author}: {e}", draft.name);
        return Err(e.into());
    }

    let recipe = store.insert_recipe(author, draft).await?;
    log::info!("User {author} created recipe {} ({})", recipe.id, recipe.name);
    Ok(recipe)
}

/// Replaces the recipe with `draft`. Tags and ingredient amounts that are
/// not part of the draft are dropped.
pub async fn update_recipe<S>(
    store: &S,
    recipe_id: Id,
    draft: &RecipeDraft,
) -> Result<Recipe, ActionError>
where
    S: RecipeRepository,
{
    if let Err(e) = validate_recipe(draft) {
        log::warn!("Rejected update of recipe {recipe_id}: {e}");
        return Err(e.into());
    }

    let recipe = store.replace_recipe(recipe_id, draft).await?;
    log::info!("Updated recipe {recipe_id}");
    Ok(recipe)
}

pub async fn delete_recipe<S>(store: &S, recipe_id: Id) -> Result<(), ActionError>
where
    S: RecipeRepository,
{
    store.delete_recipe(recipe_id).await?;
    log::info!("Deleted recipe {recipe_id}");
    Ok(())
}

pub async fn get_recipe<S>(
    store: &S,
    viewer: Option<Id>,
    recipe_id: Id,
) -> Result<RecipeDetail, ActionError>
where
    S: Store,
{
    let recipe = store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| ActionError::not_found("No recipe exists with specified id"))?;

    let author = match recipe.author_id {
        Some(author_id) => match store.get_user(author_id).await? {
            Some(user) => Some(profile_for(store, viewer, user).await?),
            None => None,
        },
        None => None,
    };

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            store.contains(Collection::Favorites, viewer, recipe_id).await?,
            store.contains(Collection::Cart, viewer, recipe_id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeDetail {
        tags: store.recipe_tags(recipe_id).await?,
        ingredients: store.recipe_parts(recipe_id).await?,
        recipe,
        author,
        is_favorited,
        is_in_shopping_cart,
    })
}

pub async fn list_recipes<S>(
    store: &S,
    viewer: Option<Id>,
    mut filter: RecipeFilter,
    page: PageRequest,
) -> Result<PageContext<Recipe>, ActionError>
where
    S: RecipeRepository,
{
    if viewer.is_none() {
        filter.is_favorited = false;
        filter.is_in_shopping_cart = false;
    }

    let (rows, total_count) = store.fetch_recipes(&filter, viewer, page).await?;
    log::debug!("Recipe listing matched {total_count} rows");

    Ok(PageContext::from_rows(rows, total_count, page))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::{
        error::ValidationError,
        fixtures::{draft, register, seed_catalog},
        form::FormData,
        memory::MemoryStore,
        repository::{CatalogRepository, InteractionRepository, UserRepository},
        services::interactions::{add_favorite, add_to_cart},
    };

    fn names(page: &PageContext<Recipe>) -> Vec<&str> {
        page.rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn created_recipe_has_its_tags_and_amounts() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let recipe = create_recipe(
            &store,
            anna,
            &draft(
                "Pancakes",
                &[catalog.breakfast],
                &[(catalog.flour, 200), (catalog.milk, 300)],
            ),
        )
        .await
        .unwrap();
        assert_eq!(recipe.author_id, Some(anna));

        let detail = get_recipe(&store, None, recipe.id).await.unwrap();
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.tags[0].slug, "breakfast");
        let amounts: Vec<(&str, i32)> = detail
            .ingredients
            .iter()
            .map(|part| (part.name.as_str(), part.amount))
            .collect();
        assert_eq!(amounts, vec![("flour", 200), ("milk", 300)]);
        assert_eq!(detail.author.unwrap().username, "anna");
    }

    #[tokio::test]
    async fn duplicate_ingredient_stores_nothing() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let err = create_recipe(
            &store,
            anna,
            &draft(
                "Pancakes",
                &[catalog.breakfast],
                &[(catalog.flour, 200), (catalog.flour, 100)],
            ),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            ActionError::Validation(ValidationError::DuplicateIngredient(catalog.flour))
        );

        let (rows, total) = store
            .fetch_recipes(&RecipeFilter::default(), None, PageRequest::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 0);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(32000, true)]
    #[case(32001, false)]
    #[tokio::test]
    async fn amount_bounds(#[case] amount: i32, #[case] accepted: bool) {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let result = create_recipe(
            &store,
            anna,
            &draft("Toast", &[catalog.breakfast], &[(catalog.flour, amount)]),
        )
        .await;

        match result {
            Ok(_) => assert!(accepted),
            Err(e) => {
                assert!(!accepted);
                assert!(matches!(
                    e,
                    ActionError::Validation(ValidationError::AmountOutOfRange { .. })
                ));
            }
        }
    }

    #[tokio::test]
    async fn unknown_references_are_not_found() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let unknown_tag = draft("Toast", &[999], &[(catalog.flour, 10)]);
        let err = create_recipe(&store, anna, &unknown_tag).await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));

        let unknown_ingredient = draft("Toast", &[catalog.breakfast], &[(999, 10)]);
        let err = create_recipe(&store, anna, &unknown_ingredient)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let toast = draft("Toast", &[catalog.breakfast], &[(catalog.flour, 10)]);

        create_recipe(&store, anna, &toast).await.unwrap();
        let err = create_recipe(&store, anna, &toast).await.unwrap_err();
        assert!(matches!(err, ActionError::Conflict(_)));
    }

    #[rstest]
    #[case::tags(true, false)]
    #[case::ingredients(false, true)]
    #[tokio::test]
    async fn empty_collections_are_rejected(#[case] no_tags: bool, #[case] no_parts: bool) {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let mut toast = draft("Toast", &[catalog.breakfast], &[(catalog.flour, 10)]);
        if no_tags {
            toast.tags.clear();
        }
        if no_parts {
            toast.ingredients.clear();
        }

        let err = create_recipe(&store, anna, &toast).await.unwrap_err();
        let expected = if no_tags {
            ValidationError::EmptyTags
        } else {
            ValidationError::EmptyIngredients
        };
        assert_eq!(err, ActionError::Validation(expected));
    }

    #[tokio::test]
    async fn update_replaces_tags_and_ingredients() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;

        let recipe = create_recipe(
            &store,
            anna,
            &draft(
                "Pancakes",
                &[catalog.breakfast],
                &[(catalog.flour, 200), (catalog.eggs, 2)],
            ),
        )
        .await
        .unwrap();

        let mut replacement = draft(
            "Savoury pancakes",
            &[catalog.dinner],
            &[(catalog.eggs, 3), (catalog.milk, 250)],
        );
        replacement.cooking_time = 45;
        let updated = update_recipe(&store, recipe.id, &replacement).await.unwrap();
        assert_eq!(updated.name, "Savoury pancakes");
        assert_eq!(updated.cooking_time, 45);
        assert_eq!(updated.author_id, Some(anna));

        let detail = get_recipe(&store, Some(anna), recipe.id).await.unwrap();
        let tags: Vec<Id> = detail.tags.iter().map(|t| t.id).collect();
        assert_eq!(tags, vec![catalog.dinner]);
        let mut parts: Vec<(Id, i32)> = detail
            .ingredients
            .iter()
            .map(|part| (part.id, part.amount))
            .collect();
        parts.sort();
        let mut expected = vec![(catalog.eggs, 3), (catalog.milk, 250)];
        expected.sort();
        assert_eq!(parts, expected);
    }

    #[tokio::test]
    async fn rejected_update_keeps_the_old_recipe() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let recipe = create_recipe(
            &store,
            anna,
            &draft("Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]),
        )
        .await
        .unwrap();

        let broken = draft("Pancakes", &[catalog.breakfast], &[(999, 10)]);
        let err = update_recipe(&store, recipe.id, &broken).await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));

        let detail = get_recipe(&store, None, recipe.id).await.unwrap();
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.ingredients[0].id, catalog.flour);
        assert_eq!(detail.ingredients[0].amount, 200);
    }

    #[tokio::test]
    async fn updating_a_missing_recipe_is_not_found() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;

        let err = update_recipe(
            &store,
            999,
            &draft("Toast", &[catalog.breakfast], &[(catalog.flour, 10)]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_cascades_but_keeps_ingredients_and_users() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let boris = register(&store, "boris").await;
        let recipe = create_recipe(
            &store,
            anna,
            &draft("Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]),
        )
        .await
        .unwrap();
        add_favorite(&store, boris, recipe.id).await.unwrap();
        add_to_cart(&store, boris, recipe.id).await.unwrap();

        delete_recipe(&store, recipe.id).await.unwrap();

        assert!(store.recipe_parts(recipe.id).await.unwrap().is_empty());
        assert!(!store
            .contains(Collection::Favorites, boris, recipe.id)
            .await
            .unwrap());
        assert!(!store.contains(Collection::Cart, boris, recipe.id).await.unwrap());
        assert!(store.get_ingredient(catalog.flour).await.unwrap().is_some());
        assert!(store.get_user(anna).await.unwrap().is_some());

        let err = get_recipe(&store, None, recipe.id).await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));
        let err = delete_recipe(&store, recipe.id).await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));
    }

    #[tokio::test]
    async fn recipe_survives_its_author() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let recipe = create_recipe(
            &store,
            anna,
            &draft("Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]),
        )
        .await
        .unwrap();

        store.delete_user(anna).await.unwrap();
        let detail = get_recipe(&store, None, recipe.id).await.unwrap();
        assert_eq!(detail.recipe.author_id, None);
        assert!(detail.author.is_none());
    }

    #[tokio::test]
    async fn detail_reports_viewer_state() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let boris = register(&store, "boris").await;
        let recipe = create_recipe(
            &store,
            anna,
            &draft("Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]),
        )
        .await
        .unwrap();
        add_favorite(&store, boris, recipe.id).await.unwrap();

        let seen_by_boris = get_recipe(&store, Some(boris), recipe.id).await.unwrap();
        assert!(seen_by_boris.is_favorited);
        assert!(!seen_by_boris.is_in_shopping_cart);

        let anonymous = get_recipe(&store, None, recipe.id).await.unwrap();
        assert!(!anonymous.is_favorited);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        let boris = register(&store, "boris").await;

        let porridge = create_recipe(
            &store,
            anna,
            &draft("Porridge", &[catalog.breakfast], &[(catalog.milk, 200)]),
        )
        .await
        .unwrap();
        create_recipe(
            &store,
            boris,
            &draft("Stew", &[catalog.dinner], &[(catalog.flour, 50)]),
        )
        .await
        .unwrap();
        create_recipe(
            &store,
            anna,
            &draft("Omelette", &[catalog.breakfast], &[(catalog.eggs, 3)]),
        )
        .await
        .unwrap();
        add_favorite(&store, boris, porridge.id).await.unwrap();

        let all = list_recipes(&store, None, RecipeFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&all), vec!["Omelette", "Stew", "Porridge"]);

        let by_anna = RecipeFilter {
            author: Some(anna),
            ..Default::default()
        };
        let page = list_recipes(&store, None, by_anna, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["Omelette", "Porridge"]);

        let dinner = RecipeFilter {
            tags: vec![String::from("dinner")],
            ..Default::default()
        };
        let page = list_recipes(&store, None, dinner, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["Stew"]);

        let favorited = RecipeFilter {
            is_favorited: true,
            ..Default::default()
        };
        let page = list_recipes(&store, Some(boris), favorited.clone(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["Porridge"]);

        let page = list_recipes(&store, None, favorited, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_rows, 3);
    }

    #[tokio::test]
    async fn listing_pages() {
        let store = MemoryStore::new();
        let catalog = seed_catalog(&store).await;
        let anna = register(&store, "anna").await;
        for name in ["A", "B", "C"] {
            create_recipe(
                &store,
                anna,
                &draft(name, &[catalog.dinner], &[(catalog.flour, 1)]),
            )
            .await
            .unwrap();
        }

        let page = list_recipes(
            &store,
            None,
            RecipeFilter::default(),
            PageRequest::new(Some(2), Some(2)),
        )
        .await
        .unwrap();
        assert_eq!(names(&page), vec!["A"]);
        assert_eq!(page.total_rows, 3);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(0));
    }

    #[test]
    fn form_parses_into_draft() {
        let data: FormData = serde_json::from_value(json!({
            "name": "Toast",
            "text": "Toast the bread.",
            "cooking_time": "5",
            "image": "recipes/images/toast.png",
            "tags": [1, 2, 2],
            "ingredients": [{"id": 3, "amount": 2}],
        }))
        .unwrap();

        let draft = parse_recipe_form(&Form::from_data(data)).unwrap();
        assert_eq!(draft.cooking_time, 5);
        assert_eq!(draft.tags.len(), 2);
        assert_eq!(draft.ingredients.len(), 1);
    }
}
