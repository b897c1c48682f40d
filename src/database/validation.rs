use std::collections::{BTreeSet, HashSet};

use crate::constants::{
    COLOR_LENGTH, EMAIL_LENGTH, MAX_AMOUNT, MAX_USERNAME, MIN_AMOUNT, MIN_USERNAME, NAME_LENGTH,
    TEXT_LENGTH, UNIT_LENGTH,
};

use super::{
    error::ValidationError,
    schema::{NewIngredient, NewTag, RecipeDraft},
};

fn amount_in_range(value: i32) -> bool {
    (MIN_AMOUNT..=MAX_AMOUNT).contains(&value)
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Checks a recipe payload before any store access.
pub fn validate_recipe(draft: &RecipeDraft) -> Result<(), ValidationError> {
    check_text("name", &draft.name, NAME_LENGTH)?;
    check_text("text", &draft.text, TEXT_LENGTH)?;
    if draft.image.trim().is_empty() {
        return Err(ValidationError::Blank("image"));
    }

    if !amount_in_range(draft.cooking_time) {
        return Err(ValidationError::CookingTimeOutOfRange(draft.cooking_time));
    }

    if draft.tags.is_empty() {
        return Err(ValidationError::EmptyTags);
    }
    if draft.ingredients.is_empty() {
        return Err(ValidationError::EmptyIngredients);
    }

    let mut seen = HashSet::with_capacity(draft.ingredients.len());
    for part in draft.ingredients.iter() {
        if !seen.insert(part.id) {
            return Err(ValidationError::DuplicateIngredient(part.id));
        }
        if !amount_in_range(part.amount) {
            return Err(ValidationError::AmountOutOfRange {
                ingredient: part.id,
                amount: part.amount,
            });
        }
    }

    Ok(())
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let length = username.chars().count();
    if !(MIN_USERNAME..=MAX_USERNAME).contains(&length) {
        return Err(ValidationError::UsernameLength {
            min: MIN_USERNAME,
            max: MAX_USERNAME,
        });
    }

    let invalid: BTreeSet<char> = username.chars().filter(|c| !is_username_char(*c)).collect();
    if !invalid.is_empty() {
        return Err(ValidationError::UsernameCharacters(
            invalid.into_iter().collect(),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

pub fn validate_person_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    check_text(field, value, NAME_LENGTH)
}

pub fn validate_tag(tag: &NewTag) -> Result<(), ValidationError> {
    check_text("name", &tag.name, NAME_LENGTH)?;

    let color = tag.color.strip_prefix('#');
    let valid_color = tag.color.len() == COLOR_LENGTH
        && color.is_some_and(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid_color {
        return Err(ValidationError::InvalidColor(tag.color.to_owned()));
    }

    let valid_slug = !tag.slug.is_empty()
        && tag.slug.len() <= NAME_LENGTH
        && tag
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_slug {
        return Err(ValidationError::InvalidSlug(tag.slug.to_owned()));
    }

    Ok(())
}

pub fn validate_ingredient(ingredient: &NewIngredient) -> Result<(), ValidationError> {
    check_text("name", &ingredient.name, NAME_LENGTH)?;
    check_text("measurement_unit", &ingredient.measurement_unit, UNIT_LENGTH)
}
