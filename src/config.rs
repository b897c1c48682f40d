use std::{env, fmt::Display, str::FromStr, time::Duration};

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: &str = "5";
const DEFAULT_ACQUIRE_TIMEOUT_SECS: &str = "5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    Missing(&'static str),
    #[error("Failed to connect to the database: {0}")]
    Connect(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Config {
    /// Reads the process environment, after loading a `.env` file if present.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_err() {
            log::debug!("No .env file found");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let acquire_timeout: u64 = try_load(
            &lookup,
            "DATABASE_ACQUIRE_TIMEOUT_SECS",
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        );

        Ok(Self {
            database_url,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(acquire_timeout),
        })
    }

    pub async fn connect(&self) -> Result<Pool<Postgres>, ConfigError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await?;

        log::info!(
            "Connected to database with up to {} connections",
            self.max_connections
        );
        Ok(pool)
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> T
where
    T: FromStr + Default,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let fallback = || default.parse().unwrap_or_default();

    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            fallback()
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            fallback()
        }
    }
}
