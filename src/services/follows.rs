use crate::{
    error::{ActionError, ValidationError},
    pagination::{PageContext, PageRequest},
    repository::FollowRepository,
    schema::{FollowedAuthor, Id},
};

pub async fn follow<S>(store: &S, user: Id, target: Id) -> Result<(), ActionError>
where
    S: FollowRepository,
{
    if user == target {
        log::warn!("User {user} tried to follow themselves");
        return Err(ValidationError::SelfFollow.into());
    }

    store.insert_follow(user, target).await?;
    log::info!("User {user} now follows {target}");
    Ok(())
}

pub async fn unfollow<S>(store: &S, user: Id, target: Id) -> Result<(), ActionError>
where
    S: FollowRepository,
{
    store.delete_follow(user, target).await?;
    log::info!("User {user} unfollowed {target}");
    Ok(())
}

/// Authors `user` follows, each with up to `recipes_limit` of their newest
/// recipes (all of them when `None`) and their recipe count.
pub async fn list_following<S>(
    store: &S,
    user: Id,
    recipes_limit: Option<i64>,
    page: PageRequest,
) -> Result<PageContext<FollowedAuthor>, ActionError>
where
    S: FollowRepository,
{
    if recipes_limit.is_some_and(|limit| limit < 0) {
        return Err(ActionError::malformed("recipes_limit must not be negative"));
    }

    let (rows, total_count) = store.list_following(user, recipes_limit, page).await?;
    log::debug!("User {user} follows {total_count} authors");

    Ok(PageContext::from_rows(rows, total_count, page))
}
