//! Initial account seeding from config.toml
//!
//! Loads account definitions from a TOML file and inserts any that are
//! missing for the user, so a fresh database starts with a working
//! allocation configuration. Existing accounts are never modified.

use crate::{
    core::account,
    entities::account::AllocationKind,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// List of account configurations to seed
    pub accounts: Vec<AccountConfig>,
}

/// Configuration for a single account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Name of the account
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Allocation kind: "percentage" or "fixed"
    pub kind: String,
    /// Percentage on the 0-100 scale, or a fixed dollar amount
    pub rate: f64,
    /// Whether a percentage applies to the gross deposit (defaults to net)
    #[serde(default)]
    pub affect_gross: bool,
}

impl AccountConfig {
    fn allocation_kind(&self) -> Result<AllocationKind> {
        match self.kind.as_str() {
            "percentage" => Ok(AllocationKind::Percentage),
            "fixed" => Ok(AllocationKind::Fixed),
            other => Err(Error::Config {
                message: format!("Unknown allocation kind '{other}' for account '{}'", self.name),
            }),
        }
    }
}

/// Loads account configuration from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read, the TOML syntax is
/// invalid, or required fields are missing.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Seeds the user's accounts from the configuration, skipping any account
/// whose name already exists. Returns how many accounts were created.
pub async fn seed_initial_accounts(
    db: &DatabaseConnection,
    user_id: i64,
    config: &Config,
) -> Result<usize> {
    let mut created = 0;
    for entry in &config.accounts {
        if account::get_account_by_name(db, user_id, &entry.name)
            .await?
            .is_some()
        {
            continue;
        }
        account::create_account(
            db,
            user_id,
            &entry.name,
            entry.description.clone(),
            entry.allocation_kind()?,
            entry.rate,
            entry.affect_gross,
        )
        .await?;
        created += 1;
    }
    if created > 0 {
        info!(created, "seeded accounts from configuration");
    }
    Ok(created)
}
