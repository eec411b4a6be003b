/// Database configuration and connection management
pub mod database;

/// Initial account seeding from config.toml
pub mod accounts;

use crate::errors::Result;
use std::path::PathBuf;

/// Application configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `SQLite` connection string
    pub database_url: String,
    /// Path to the optional account-seed TOML file
    pub accounts_config: PathBuf,
}

impl AppConfig {
    /// Reads the configuration from environment variables, applying the
    /// documented defaults where a variable is unset.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: database::get_database_url()?,
            accounts_config: std::env::var("ACCOUNTS_CONFIG")
                .map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from),
        })
    }
}
