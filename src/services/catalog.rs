use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
    constants::DEFAULT_TAGS,
    error::ActionError,
    repository::CatalogRepository,
    schema::{Id, Ingredient, NewIngredient, NewTag, Tag},
    validation::{validate_ingredient, validate_tag},
};

pub async fn list_tags<S>(store: &S) -> Result<Vec<Tag>, ActionError>
where
    S: CatalogRepository,
{
    store.list_tags().await
}

pub async fn get_tag<S>(store: &S, id: Id) -> Result<Tag, ActionError>
where
    S: CatalogRepository,
{
    store
        .get_tag(id)
        .await?
        .ok_or_else(|| ActionError::not_found("No tag exists with specified id"))
}

pub async fn create_tag<S>(store: &S, tag: NewTag) -> Result<Tag, ActionError>
where
    S: CatalogRepository,
{
    validate_tag(&tag)?;

    let tag = store.create_tag(&tag).await?;
    log::info!("Created tag {} ({})", tag.id, tag.slug);
    Ok(tag)
}

/// Inserts the built-in meal tags. Safe to run on every start.
pub async fn seed_default_tags<S>(store: &S) -> Result<usize, ActionError>
where
    S: CatalogRepository,
{
    let mut inserted = 0;
    for (name, color, slug) in DEFAULT_TAGS {
        let tag = NewTag {
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        };
        if store.ensure_tag(&tag).await? {
            inserted += 1;
        }
    }

    if inserted > 0 {
        log::info!("Seeded {inserted} default tags");
    }
    Ok(inserted)
}

pub async fn search_ingredients<S>(store: &S, prefix: &str) -> Result<Vec<Ingredient>, ActionError>
where
    S: CatalogRepository,
{
    store.search_ingredients(prefix.trim()).await
}

pub async fn get_ingredient<S>(store: &S, id: Id) -> Result<Ingredient, ActionError>
where
    S: CatalogRepository,
{
    store
        .get_ingredient(id)
        .await?
        .ok_or_else(|| ActionError::not_found("No ingredient exists with specified id"))
}

pub async fn create_ingredient<S>(
    store: &S,
    ingredient: NewIngredient,
) -> Result<Ingredient, ActionError>
where
    S: CatalogRepository,
{
    validate_ingredient(&ingredient)?;

    let ingredient = store.create_ingredient(&ingredient).await?;
    log::info!(
        "Created ingredient {} ({}, {})",
        ingredient.id,
        ingredient.name,
        ingredient.measurement_unit
    );
    Ok(ingredient)
}

fn parse_ingredient_record(
    line: u64,
    record: &StringRecord,
) -> Result<Option<NewIngredient>, ActionError> {
    if record.iter().all(|field| field.is_empty()) {
        return Ok(None);
    }

    let (Some(name), Some(unit)) = (record.get(0), record.get(1)) else {
        return Err(ActionError::malformed(format!(
            "Line {line}: expected 'name,measurement_unit'"
        )));
    };

    let ingredient = NewIngredient {
        name: name.to_owned(),
        measurement_unit: unit.to_owned(),
    };
    validate_ingredient(&ingredient)
        .map_err(|e| ActionError::malformed(format!("Line {line}: {e}")))?;

    Ok(Some(ingredient))
}

/// Loads `name,measurement_unit` CSV records. Quoted fields may contain
/// commas and columns past the second are ignored. Existing ingredients are
/// left alone. The whole input is checked before anything is written.
/// Returns how many ingredients were new.
pub async fn import_ingredients<S>(store: &S, input: &str) -> Result<usize, ActionError>
where
    S: CatalogRepository,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut ingredients = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map_or(0, |position| position.line());
            ActionError::malformed(format!("Line {line}: {e}"))
        })?;
        let line = record.position().map_or(0, |position| position.line());

        if let Some(ingredient) = parse_ingredient_record(line, &record)? {
            ingredients.push(ingredient);
        }
    }

    let mut inserted = 0;
    for ingredient in ingredients.iter() {
        if store.ensure_ingredient(ingredient).await? {
            inserted += 1;
        }
    }

    log::info!(
        "Imported {inserted} new ingredients out of {}",
        ingredients.len()
    );
    Ok(inserted)
}
