use serde::Deserialize;

use crate::{
    cryptography::{hash_password, verify_password},
    error::{ActionError, ValidationError},
    pagination::{PageContext, PageRequest},
    repository::{FollowRepository, UserRepository},
    schema::{Id, NewUser, User, UserProfile},
    validation::{validate_email, validate_person_name, validate_username},
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Builds the public profile of `user` as seen by `viewer`. Nobody is
/// subscribed to themselves and anonymous viewers are subscribed to no one.
pub async fn profile_for<S>(
    store: &S,
    viewer: Option<Id>,
    user: User,
) -> Result<UserProfile, ActionError>
where
    S: FollowRepository,
{
    let is_subscribed = match viewer {
        Some(viewer) if viewer != user.id => store.is_following(viewer, user.id).await?,
        _ => false,
    };

    Ok(UserProfile::from_user(user, is_subscribed))
}

pub async fn register_user<S>(store: &S, form: NewUserForm) -> Result<UserProfile, ActionError>
where
    S: UserRepository,
{
    validate_username(&form.username)?;
    validate_email(&form.email)?;
    validate_person_name("first_name", &form.first_name)?;
    validate_person_name("last_name", &form.last_name)?;
    if form.password.trim().is_empty() {
        return Err(ValidationError::Blank("password").into());
    }

    let user = store
        .create_user(&NewUser {
            username: form.username,
            email: form.email,
            first_name: form.first_name,
            last_name: form.last_name,
            password: hash_password(&form.password)?,
        })
        .await?;

    log::info!("Registered user {} ({})", user.id, user.username);
    Ok(UserProfile::from_user(user, false))
}

pub async fn get_profile<S>(
    store: &S,
    viewer: Option<Id>,
    user_id: Id,
) -> Result<UserProfile, ActionError>
where
    S: UserRepository + FollowRepository,
{
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ActionError::not_found("No user exists with specified id"))?;

    profile_for(store, viewer, user).await
}

pub async fn list_users<S>(
    store: &S,
    viewer: Option<Id>,
    page: PageRequest,
) -> Result<PageContext<UserProfile>, ActionError>
where
    S: UserRepository + FollowRepository,
{
    let (users, total_count) = store.list_users(page).await?;

    let mut rows = Vec::with_capacity(users.len());
    for user in users {
        rows.push(profile_for(store, viewer, user).await?);
    }

    Ok(PageContext::from_rows(rows, total_count, page))
}

pub async fn set_password<S>(
    store: &S,
    user_id: Id,
    current_password: &str,
    new_password: &str,
) -> Result<(), ActionError>
where
    S: UserRepository,
{
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ActionError::not_found("No user exists with specified id"))?;

    if !verify_password(current_password, &user.password)? {
        log::warn!("Rejected password change for user {user_id}");
        return Err(ValidationError::WrongPassword.into());
    }
    if new_password.trim().is_empty() {
        return Err(ValidationError::Blank("new_password").into());
    }

    store
        .set_password(user_id, &hash_password(new_password)?)
        .await
}

pub async fn delete_user<S>(store: &S, user_id: Id) -> Result<(), ActionError>
where
    S: UserRepository,
{
    store.delete_user(user_id).await?;
    log::info!("Deleted user {user_id}");
    Ok(())
}
