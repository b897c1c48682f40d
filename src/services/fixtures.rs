//! Shared setup for the service tests.

use std::collections::BTreeSet;

use rstest::fixture;

use crate::{
    memory::MemoryStore,
    repository::CatalogRepository,
    schema::{Id, IngredientAmount, NewIngredient, NewTag, RecipeDraft},
    services::users::{register_user, NewUserForm},
};

#[fixture]
pub fn store() -> MemoryStore {
    MemoryStore::new()
}

pub fn user_form(username: &str) -> NewUserForm {
    NewUserForm {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: String::from("secret-password"),
    }
}

pub async fn register(store: &MemoryStore, username: &str) -> Id {
    register_user(store, user_form(username)).await.unwrap().id
}

pub struct Catalog {
    pub breakfast: Id,
    pub dinner: Id,
    pub flour: Id,
    pub eggs: Id,
    pub milk: Id,
}

pub async fn seed_catalog(store: &MemoryStore) -> Catalog {
    let tag = |name: &str, color: &str| NewTag {
        name: name.to_owned(),
        color: color.to_owned(),
        slug: name.to_lowercase(),
    };
    let ingredient = |name: &str, unit: &str| NewIngredient {
        name: name.to_owned(),
        measurement_unit: unit.to_owned(),
    };

    Catalog {
        breakfast: store.create_tag(&tag("Breakfast", "#E26C2D")).await.unwrap().id,
        dinner: store.create_tag(&tag("Dinner", "#494CE8")).await.unwrap().id,
        flour: store
            .create_ingredient(&ingredient("flour", "g"))
            .await
            .unwrap()
            .id,
        eggs: store
            .create_ingredient(&ingredient("eggs", "pcs"))
            .await
            .unwrap()
            .id,
        milk: store
            .create_ingredient(&ingredient("milk", "ml"))
            .await
            .unwrap()
            .id,
    }
}

pub fn draft(name: &str, tags: &[Id], parts: &[(Id, i32)]) -> RecipeDraft {
    RecipeDraft {
        name: name.to_owned(),
        text: format!("How to make {name}."),
        cooking_time: 30,
        image: format!("recipes/images/{}.png", name.to_lowercase()),
        tags: tags.iter().copied().collect::<BTreeSet<Id>>(),
        ingredients: parts
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}
