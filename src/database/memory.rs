//! In-process store with the same constraint, cascade and set-null rules as
//! the Postgres schema. Used by the test suites.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    error::ActionError,
    pagination::PageRequest,
    repository::{
        CatalogRepository, FollowRepository, InteractionRepository, RecipeRepository,
        ShoppingListRepository, UserRepository,
    },
    schema::{
        Collection, FollowedAuthor, Id, Ingredient, NewIngredient, NewTag, NewUser, Recipe,
        RecipeDraft, RecipeFilter, RecipeIngredient, RecipePart, RecipeSummary,
        ShoppingListEntry, Tag, User, UserProfile,
    },
};

#[derive(Default)]
struct MemoryState {
    last_id: Id,
    users: BTreeMap<Id, User>,
    /// (user, following)
    follows: BTreeSet<(Id, Id)>,
    tags: BTreeMap<Id, Tag>,
    ingredients: BTreeMap<Id, Ingredient>,
    recipes: BTreeMap<Id, Recipe>,
    /// (recipe, tag)
    recipe_tags: BTreeSet<(Id, Id)>,
    recipe_ingredients: Vec<RecipeIngredient>,
    /// (user, recipe)
    favorites: BTreeSet<(Id, Id)>,
    cart: BTreeSet<(Id, Id)>,
}

impl MemoryState {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn collection(&mut self, collection: Collection) -> &mut BTreeSet<(Id, Id)> {
        match collection {
            Collection::Favorites => &mut self.favorites,
            Collection::Cart => &mut self.cart,
        }
    }

    fn ensure_references(&self, draft: &RecipeDraft) -> Result<(), ActionError> {
        if let Some(id) = draft.tags.iter().find(|id| !self.tags.contains_key(id)) {
            return Err(ActionError::not_found(format!("Tag {id} doesn't exist")));
        }
        if let Some(part) = draft
            .ingredients
            .iter()
            .find(|part| !self.ingredients.contains_key(&part.id))
        {
            return Err(ActionError::not_found(format!(
                "Ingredient {} doesn't exist",
                part.id
            )));
        }
        Ok(())
    }

    fn ensure_unique_name(&self, name: &str, except: Option<Id>) -> Result<(), ActionError> {
        let taken = self
            .recipes
            .values()
            .any(|recipe| recipe.name == name && Some(recipe.id) != except);
        if taken {
            return Err(ActionError::conflict("A recipe with that name already exists"));
        }
        Ok(())
    }

    fn replace_associations(&mut self, recipe_id: Id, draft: &RecipeDraft) {
        self.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
        self.recipe_tags
            .extend(draft.tags.iter().map(|tag| (recipe_id, *tag)));

        self.recipe_ingredients
            .retain(|row| row.recipe_id != recipe_id);
        for part in draft.ingredients.iter() {
            let id = self.next_id();
            self.recipe_ingredients.push(RecipeIngredient {
                id,
                recipe_id,
                ingredient_id: part.id,
                amount: part.amount,
            });
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn paginate<T>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect();
    (rows, total)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, ActionError> {
        let mut state = self.lock();
        let taken = state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(ActionError::conflict(
                "A user with that username or email already exists",
            ));
        }

        let row = User {
            id: state.next_id(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            password: user.password.to_owned(),
        };
        state.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, ActionError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ActionError> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(paginate(users, page))
    }

    async fn set_password(&self, id: Id, password_hash: &str) -> Result<(), ActionError> {
        match self.lock().users.get_mut(&id) {
            Some(user) => {
                user.password = password_hash.to_owned();
                Ok(())
            }
            None => Err(ActionError::not_found("No user exists with specified id")),
        }
    }

    async fn delete_user(&self, id: Id) -> Result<(), ActionError> {
        let mut state = self.lock();
        if state.users.remove(&id).is_none() {
            return Err(ActionError::not_found("No user exists with specified id"));
        }

        state
            .follows
            .retain(|(user, following)| *user != id && *following != id);
        state.favorites.retain(|(user, _)| *user != id);
        state.cart.retain(|(user, _)| *user != id);
        for recipe in state.recipes.values_mut() {
            if recipe.author_id == Some(id) {
                recipe.author_id = None;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn insert_follow(&self, user: Id, target: Id) -> Result<(), ActionError> {
        let mut state = self.lock();
        if !state.users.contains_key(&user) || !state.users.contains_key(&target) {
            return Err(ActionError::not_found("No user exists with specified id"));
        }
        if !state.follows.insert((user, target)) {
            return Err(ActionError::conflict("You are already following this user"));
        }
        Ok(())
    }

    async fn delete_follow(&self, user: Id, target: Id) -> Result<(), ActionError> {
        if !self.lock().follows.remove(&(user, target)) {
            return Err(ActionError::not_found("You are not following this user"));
        }
        Ok(())
    }

    async fn is_following(&self, user: Id, target: Id) -> Result<bool, ActionError> {
        Ok(self.lock().follows.contains(&(user, target)))
    }

    async fn list_following(
        &self,
        user: Id,
        recipes_limit: Option<i64>,
        page: PageRequest,
    ) -> Result<(Vec<FollowedAuthor>, i64), ActionError> {
        let state = self.lock();
        let mut authors: Vec<&User> = state
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user)
            .filter_map(|(_, following)| state.users.get(following))
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));

        let (authors, total) = paginate(authors, page);
        let rows = authors
            .into_iter()
            .map(|author| {
                let mut recipes: Vec<&Recipe> = state
                    .recipes
                    .values()
                    .filter(|recipe| recipe.author_id == Some(author.id))
                    .collect();
                recipes.sort_by(|a, b| (b.pub_date, b.id).cmp(&(a.pub_date, a.id)));
                let recipes_count = recipes.len() as i64;
                let shown = recipes_limit.map_or(recipes.len(), |limit| limit.max(0) as usize);

                FollowedAuthor {
                    author: UserProfile::from_user(author.clone(), true),
                    recipes: recipes
                        .into_iter()
                        .take(shown)
                        .map(RecipeSummary::from)
                        .collect(),
                    recipes_count,
                }
            })
            .collect();

        Ok((rows, total))
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ActionError> {
        let mut state = self.lock();
        let taken = state
            .tags
            .values()
            .any(|t| t.name == tag.name || t.color == tag.color || t.slug == tag.slug);
        if taken {
            return Err(ActionError::conflict(
                "A tag with that name, color or slug already exists",
            ));
        }

        let row = Tag {
            id: state.next_id(),
            name: tag.name.to_owned(),
            color: tag.color.to_owned(),
            slug: tag.slug.to_owned(),
        };
        state.tags.insert(row.id, row.clone());
        Ok(row)
    }

    async fn ensure_tag(&self, tag: &NewTag) -> Result<bool, ActionError> {
        match self.create_tag(tag).await {
            Ok(_) => Ok(true),
            Err(ActionError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ActionError> {
        Ok(self.lock().tags.get(&id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ActionError> {
        Ok(self.lock().tags.values().cloned().collect())
    }

    async fn create_ingredient(
        &self,
        ingredient: &NewIngredient,
    ) -> Result<Ingredient, ActionError> {
        let mut state = self.lock();
        let taken = state.ingredients.values().any(|i| {
            i.name == ingredient.name && i.measurement_unit == ingredient.measurement_unit
        });
        if taken {
            return Err(ActionError::conflict(format!(
                "Ingredient {} ({}) already exists",
                ingredient.name, ingredient.measurement_unit
            )));
        }

        let row = Ingredient {
            id: state.next_id(),
            name: ingredient.name.to_owned(),
            measurement_unit: ingredient.measurement_unit.to_owned(),
        };
        state.ingredients.insert(row.id, row.clone());
        Ok(row)
    }

    async fn ensure_ingredient(&self, ingredient: &NewIngredient) -> Result<bool, ActionError> {
        match self.create_ingredient(ingredient).await {
            Ok(_) => Ok(true),
            Err(ActionError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ActionError> {
        Ok(self.lock().ingredients.get(&id).cloned())
    }

    async fn search_ingredients(&self, prefix: &str) -> Result<Vec<Ingredient>, ActionError> {
        let prefix = prefix.to_lowercase();
        let mut rows: Vec<Ingredient> = self
            .lock()
            .ingredients
            .values()
            .filter(|i| i.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.name, &a.measurement_unit).cmp(&(&b.name, &b.measurement_unit))
        });
        Ok(rows)
    }
}

#[async_trait]
impl RecipeRepository for MemoryStore {
    async fn insert_recipe(&self, author: Id, draft: &RecipeDraft) -> Result<Recipe, ActionError> {
        let mut state = self.lock();
        state.ensure_references(draft)?;
        state.ensure_unique_name(&draft.name, None)?;
        if !state.users.contains_key(&author) {
            return Err(ActionError::not_found("No user exists with specified id"));
        }

        let recipe = Recipe {
            id: state.next_id(),
            author_id: Some(author),
            name: draft.name.to_owned(),
            image: draft.image.to_owned(),
            text: draft.text.to_owned(),
            cooking_time: draft.cooking_time,
            pub_date: Utc::now(),
        };
        state.recipes.insert(recipe.id, recipe.clone());
        state.replace_associations(recipe.id, draft);

        Ok(recipe)
    }

    async fn replace_recipe(&self, id: Id, draft: &RecipeDraft) -> Result<Recipe, ActionError> {
        let mut state = self.lock();
        if !state.recipes.contains_key(&id) {
            return Err(ActionError::not_found("No recipe exists with specified id"));
        }
        state.ensure_unique_name(&draft.name, Some(id))?;
        state.ensure_references(draft)?;

        let Some(recipe) = state.recipes.get_mut(&id) else {
            return Err(ActionError::not_found("No recipe exists with specified id"));
        };
        recipe.name = draft.name.to_owned();
        recipe.image = draft.image.to_owned();
        recipe.text = draft.text.to_owned();
        recipe.cooking_time = draft.cooking_time;
        let recipe = recipe.clone();

        state.replace_associations(id, draft);
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: Id) -> Result<(), ActionError> {
        let mut state = self.lock();
        if state.recipes.remove(&id).is_none() {
            return Err(ActionError::not_found("No recipe exists with specified id"));
        }

        state.recipe_tags.retain(|(recipe, _)| *recipe != id);
        state.recipe_ingredients.retain(|row| row.recipe_id != id);
        state.favorites.retain(|(_, recipe)| *recipe != id);
        state.cart.retain(|(_, recipe)| *recipe != id);
        Ok(())
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ActionError> {
        Ok(self.lock().recipes.get(&id).cloned())
    }

    async fn recipe_tags(&self, id: Id) -> Result<Vec<Tag>, ActionError> {
        let state = self.lock();
        Ok(state
            .recipe_tags
            .iter()
            .filter(|(recipe, _)| *recipe == id)
            .filter_map(|(_, tag)| state.tags.get(tag).cloned())
            .collect())
    }

    async fn recipe_parts(&self, id: Id) -> Result<Vec<RecipePart>, ActionError> {
        let state = self.lock();
        Ok(state
            .recipe_ingredients
            .iter()
            .filter(|row| row.recipe_id == id)
            .filter_map(|row| {
                state.ingredients.get(&row.ingredient_id).map(|i| RecipePart {
                    id: i.id,
                    name: i.name.to_owned(),
                    measurement_unit: i.measurement_unit.to_owned(),
                    amount: row.amount,
                })
            })
            .collect())
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), ActionError> {
        let state = self.lock();
        let tagged = |recipe: &Recipe| {
            filter.tags.is_empty()
                || state.recipe_tags.iter().any(|(r, tag)| {
                    *r == recipe.id
                        && state
                            .tags
                            .get(tag)
                            .is_some_and(|tag| filter.tags.contains(&tag.slug))
                })
        };

        let mut recipes: Vec<Recipe> = state
            .recipes
            .values()
            .filter(|recipe| filter.author.map_or(true, |a| recipe.author_id == Some(a)))
            .filter(|recipe| tagged(*recipe))
            .filter(|recipe| match viewer {
                Some(viewer) => {
                    (!filter.is_favorited || state.favorites.contains(&(viewer, recipe.id)))
                        && (!filter.is_in_shopping_cart
                            || state.cart.contains(&(viewer, recipe.id)))
                }
                None => true,
            })
            .cloned()
            .collect();
        recipes.sort_by(|a, b| (b.pub_date, b.id).cmp(&(a.pub_date, a.id)));

        Ok(paginate(recipes, page))
    }
}

#[async_trait]
impl InteractionRepository for MemoryStore {
    async fn add_to(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<(), ActionError> {
        let mut state = self.lock();
        if !state.recipes.contains_key(&recipe) {
            return Err(ActionError::not_found("No recipe exists with specified id"));
        }
        if !state.users.contains_key(&user) {
            return Err(ActionError::not_found("No user exists with specified id"));
        }
        if !state.collection(collection).insert((user, recipe)) {
            return Err(ActionError::conflict(format!(
                "Recipe is already in {}",
                collection.label()
            )));
        }
        Ok(())
    }

    async fn remove_from(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<(), ActionError> {
        if !self.lock().collection(collection).remove(&(user, recipe)) {
            return Err(ActionError::not_found(format!(
                "Recipe is not in {}",
                collection.label()
            )));
        }
        Ok(())
    }

    async fn contains(
        &self,
        collection: Collection,
        user: Id,
        recipe: Id,
    ) -> Result<bool, ActionError> {
        Ok(self.lock().collection(collection).contains(&(user, recipe)))
    }
}

#[async_trait]
impl ShoppingListRepository for MemoryStore {
    async fn shopping_list(&self, user: Id) -> Result<Vec<ShoppingListEntry>, ActionError> {
        let state = self.lock();
        let mut totals: BTreeMap<Id, i64> = BTreeMap::new();
        for (_, recipe) in state.cart.iter().filter(|(owner, _)| *owner == user) {
            for row in state
                .recipe_ingredients
                .iter()
                .filter(|row| row.recipe_id == *recipe)
            {
                *totals.entry(row.ingredient_id).or_insert(0) += i64::from(row.amount);
            }
        }

        let mut rows: Vec<ShoppingListEntry> = totals
            .into_iter()
            .filter_map(|(id, total_amount)| {
                state.ingredients.get(&id).map(|i| ShoppingListEntry {
                    name: i.name.to_owned(),
                    total_amount,
                    measurement_unit: i.measurement_unit.to_owned(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (&a.name, &a.measurement_unit).cmp(&(&b.name, &b.measurement_unit))
        });
        Ok(rows)
    }
}
