use thiserror::Error;

use super::schema::Id;

/// Rule violations raised before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one tag is required")]
    EmptyTags,
    #[error("At least one ingredient is required")]
    EmptyIngredients,
    #[error("Ingredient {0} is listed more than once")]
    DuplicateIngredient(Id),
    #[error("Amount {amount} of ingredient {ingredient} is out of range")]
    AmountOutOfRange { ingredient: Id, amount: i32 },
    #[error("Cooking time {0} is out of range")]
    CookingTimeOutOfRange(i32),
    #[error("Field '{0}' must not be blank")]
    Blank(&'static str),
    #[error("Field '{field}' is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Username must be between {min} and {max} characters")]
    UsernameLength { min: usize, max: usize },
    #[error("Username contains invalid characters: {0}")]
    UsernameCharacters(String),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid color code '{0}'")]
    InvalidColor(String),
    #[error("Invalid slug '{0}'")]
    InvalidSlug(String),
    #[error("You can't follow yourself")]
    SelfFollow,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Malformed request: {0}")]
    Malformed(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Query failed: {0}")]
    Query(String),
}

impl ActionError {
    pub fn conflict(info: impl Into<String>) -> Self {
        Self::Conflict(info.into())
    }

    pub fn not_found(info: impl Into<String>) -> Self {
        Self::NotFound(info.into())
    }

    pub fn malformed(info: impl Into<String>) -> Self {
        Self::Validation(ValidationError::Malformed(info.into()))
    }
}

impl From<sqlx::Error> for ActionError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::conflict(format!("Already exists ({})", e.constraint().unwrap_or("unique")))
            }
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => Self::not_found(format!(
                "Referenced row does not exist ({})",
                e.constraint().unwrap_or("foreign key")
            )),
            sqlx::Error::Database(e) if e.is_check_violation() => ValidationError::Constraint(
                e.constraint().unwrap_or("check").to_owned(),
            )
            .into(),
            sqlx::Error::RowNotFound => Self::not_found("RowNotFound"),
            sqlx::Error::PoolTimedOut => Self::Query(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::Query(String::from("Pool closed")),
            e => {
                log::error!("Query failed: {e}");
                Self::Query(format!("{e}"))
            }
        }
    }
}

impl Into<potion::Error> for ActionError {
    fn into(self) -> potion::Error {
        let code = match &self {
            ActionError::Validation(_) => 400,
            ActionError::NotFound(_) => 404,
            ActionError::Conflict(_) => 409,
            ActionError::Query(_) => 500,
        };

        potion::Error {
            code,
            info: Some(self.to_string()),
            redirect: None,
        }
    }
}
