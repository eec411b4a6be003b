//! Shared test utilities.
//!
//! Common helpers for setting up in-memory test databases and creating test
//! users and accounts with sensible defaults.

use crate::{
    core::{account, user},
    entities::{self, account::AllocationKind},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A fixed calendar date for tests that do not care which day it is.
#[must_use]
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap_or_default()
}

/// Creates a test account with sensible defaults: a net-percentage account
/// taking 100% of the remainder, so a single-account user passes the
/// reconfiguration check.
pub async fn create_test_account(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
) -> Result<entities::account::Model> {
    account::create_account(
        db,
        user_id,
        name,
        None,
        AllocationKind::Percentage,
        100.0,
        false, // affect_gross
    )
    .await
}

/// Creates a test account with a specific allocation rule.
/// Use this when a test needs a particular gross/net/fixed configuration.
pub async fn create_custom_account(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
    kind: AllocationKind,
    rate: f64,
    affect_gross: bool,
) -> Result<entities::account::Model> {
    account::create_account(db, user_id, name, None, kind, rate, affect_gross).await
}

/// Sets up a test environment with a user who has whole-account actions
/// enabled. Returns (db, user).
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let user = user::create_user(&db, "test_user", true).await?;
    Ok((db, user))
}

/// Sets up a test environment with a user and one default account.
/// Returns (db, user, account) for transaction-heavy tests.
pub async fn setup_with_account() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::account::Model,
)> {
    let (db, user) = setup_with_user().await?;
    let account = create_test_account(&db, user.id, "Test Account").await?;
    Ok((db, user, account))
}
