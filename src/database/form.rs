use std::{collections::HashMap, str::FromStr};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    error::ActionError,
    schema::{Id, IngredientAmount, RecipeDraft},
};

pub type FormData = HashMap<String, Value>;

pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    fn get(&self, key: &str) -> Result<&Value, ActionError> {
        self.inner
            .get(key)
            .ok_or_else(|| ActionError::malformed(format!("Missing field '{key}'")))
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, ActionError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.get(key)?.to_owned())
            .map_err(|e| ActionError::malformed(format!("Invalid field '{key}': {e}")))
    }

    /// Accepts both JSON numbers and numeric strings.
    pub fn get_number<T>(&self, key: &str) -> Result<T, ActionError>
    where
        T: FromStr,
    {
        let value = self.get(key)?;
        let raw = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_owned(),
            _ => return Err(ActionError::malformed(format!("Field '{key}' is not a number"))),
        };

        raw.parse()
            .map_err(|_e| ActionError::malformed(format!("Field '{key}' is not a number")))
    }

    pub fn get_str(&self, key: &str) -> Result<String, ActionError> {
        match self.get(key)?.as_str() {
            Some(v) => Ok(v.to_string()),
            None => Err(ActionError::malformed(format!("Field '{key}' is not a string"))),
        }
    }
}

impl TryFrom<&Form> for RecipeDraft {
    type Error = ActionError;

    /// Reads `name`, `text`, `cooking_time`, `image`, `tags: [id]` and
    /// `ingredients: [{id, amount}]`. Rule checks happen later, in
    /// `validate_recipe`.
    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        let tags: Vec<Id> = form.get_value("tags")?;
        let ingredients: Vec<IngredientAmount> = form.get_value("ingredients")?;

        Ok(Self {
            name: form.get_str("name")?,
            text: form.get_str("text")?,
            cooking_time: form.get_number("cooking_time")?,
            image: form.get_str("image")?,
            tags: tags.into_iter().collect(),
            ingredients,
        })
    }
}
