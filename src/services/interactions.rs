use crate::{
    error::ActionError,
    repository::InteractionRepository,
    schema::{Collection, Id},
};

async fn add<S>(store: &S, collection: Collection, user: Id, recipe: Id) -> Result<(), ActionError>
where
    S: InteractionRepository,
{
    store.add_to(collection, user, recipe).await?;
    log::info!("User {user} added recipe {recipe} to {}", collection.label());
    Ok(())
}

async fn remove<S>(
    store: &S,
    collection: Collection,
    user: Id,
    recipe: Id,
) -> Result<(), ActionError>
where
    S: InteractionRepository,
{
    store.remove_from(collection, user, recipe).await?;
    log::info!("User {user} removed recipe {recipe} from {}", collection.label());
    Ok(())
}

pub async fn add_favorite<S>(store: &S, user: Id, recipe: Id) -> Result<(), ActionError>
where
    S: InteractionRepository,
{
    add(store, Collection::Favorites, user, recipe).await
}

pub async fn remove_favorite<S>(store: &S, user: Id, recipe: Id) -> Result<(), ActionError>
where
    S: InteractionRepository,
{
    remove(store, Collection::Favorites, user, recipe).await
}

pub async fn add_to_cart<S>(store: &S, user: Id, recipe: Id) -> Result<(), ActionError>
where
    S: InteractionRepository,
{
    add(store, Collection::Cart, user, recipe).await
}

pub async fn remove_from_cart<S>(store: &S, user: Id, recipe: Id) -> Result<(), ActionError>
where
    S: InteractionRepository,
{
    remove(store, Collection::Cart, user, recipe).await
}

pub async fn is_favorited<S>(store: &S, user: Id, recipe: Id) -> Result<bool, ActionError>
where
    S: InteractionRepository,
{
    store.contains(Collection::Favorites, user, recipe).await
}

pub async fn is_in_cart<S>(store: &S, user: Id, recipe: Id) -> Result<bool, ActionError>
where
    S: InteractionRepository,
{
    store.contains(Collection::Cart, user, recipe).await
}
