//! Storage interfaces used by the services.
//!
//! Each trait is implemented for `Pool<Postgres>` in `database::actions` and
//! for the in-process `MemoryStore`. Implementations must enforce the
//! uniqueness rules themselves (storage constraints) and report a lost race
//! as `ActionError::Conflict`.

use async_trait::async_trait;

use super::{
    error::ActionError,
    pagination::PageRequest,
    schema::{
        Collection, FollowedAuthor, Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe,
        RecipeDraft, RecipeFilter, RecipePart, ShoppingListEntry, Tag, User,
    },
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Conflict when the username or email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, ActionError>;

    async fn get_user(&self, id: Id) -> Result<Option<User>, ActionError>;

    /// Users ordered by username, with the total row count.
    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ActionError>;

    async fn set_password(&self, id: Id, password_hash: &str) -> Result<(), ActionError>;

    /// Removes follows, favorites and cart items of the user. Authored
    /// recipes are kept with their author cleared.
    async fn delete_user(&self, id: Id) -> Result<(), ActionError>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// NotFound when the target doesn't exist, Conflict when the edge does.
    async fn insert_follow(&self, user: Id, target: Id) -> Result<(), ActionError>;

    /// NotFound when the edge is absent.
    async fn delete_follow(&self, user: Id, target: Id) -> Result<(), ActionError>;

    async fn is_following(&self, user: Id, target: Id) -> Result<bool, ActionError>;

    /// Followed authors ordered by username, each with at most
    /// `recipes_limit` of their newest recipes and their total recipe count.
    async fn list_following(
        &self,
        user: Id,
        recipes_limit: Option<i64>,
        page: PageRequest,
    ) -> Result<(Vec<FollowedAuthor>, i64), ActionError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ActionError>;

    /// Inserts the tag unless it clashes with an existing one. Returns
    /// whether a row was written.
    async fn ensure_tag(&self, tag: &NewTag) -> Result<bool, ActionError>;

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ActionError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, ActionError>;

    async fn create_ingredient(&self, ingredient: &NewIngredient)
        -> Result<Ingredient, ActionError>;

    /// Get-or-create on (name, unit). Returns whether a row was written.
    async fn ensure_ingredient(&self, ingredient: &NewIngredient) -> Result<bool, ActionError>;

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ActionError>;

    /// Case-insensitive name prefix search ordered by name.
    async fn search_ingredients(&self, prefix: &str) -> Result<Vec<Ingredient>, ActionError>;
}

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Writes the recipe, its tag links and its ingredient rows in one
    /// transaction. Unknown tag or ingredient ids are NotFound.
    async fn insert_recipe(&self, author: Id, draft: &RecipeDraft) -> Result<Recipe, ActionError>;

    /// Full replace: tag links and ingredient rows are deleted and the
    /// submitted sets inserted, all in one transaction.
    async fn replace_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<Recipe, ActionError>;

    async fn delete_recipe(&self, id: Id) -> Result<(), ActionError>;

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ActionError>;

    async fn recipe_tags(&self, id: Id) -> Result<Vec<Tag>, ActionError>;

    async fn recipe_parts(&self, id: Id) -> Result<Vec<RecipePart>, ActionError>;

    /// Newest first.
    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), ActionError>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// NotFound for a missing recipe, Conflict for an existing pair.
    async fn add_to(&self, collection: Collection, user: Id, recipe: Id)
        -> Result<(), ActionError>;

    /// NotFound when the pair is absent.
    async fn remove_from(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<(), ActionError>;

    async fn contains(&self, collection: Collection, user: Id, recipe: Id)
        -> Result<bool, ActionError>;
}

#[async_trait]
pub trait ShoppingListRepository: Send + Sync {
    /// Ingredient amounts of every recipe in the user's cart, summed per
    /// ingredient.
    async fn shopping_list(&self, user: Id) -> Result<Vec<ShoppingListEntry>, ActionError>;
}

/// Everything a full backend needs, for services spanning several stores.
pub trait Store:
    UserRepository
    + FollowRepository
    + CatalogRepository
    + RecipeRepository
    + InteractionRepository
    + ShoppingListRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + FollowRepository
        + CatalogRepository
        + RecipeRepository
        + InteractionRepository
        + ShoppingListRepository
{
}
