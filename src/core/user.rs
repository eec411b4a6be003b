//! User business logic - creation, lookup, and login recording.
//!
//! The ledger is single-user per session, but users are still rows: names
//! are unique without regard to case (login by "SPAM" and "spam" reach the
//! same row) and each successful login is timestamped.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{
    Set, prelude::*,
    sea_query::{Expr, Func},
};
use tracing::info;

/// Creates a new user, rejecting blank and case-insensitively duplicate
/// names.
pub async fn create_user(
    db: &DatabaseConnection,
    name: &str,
    whole_account_actions: bool,
) -> Result<user::Model> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "User name cannot be blank".to_string(),
        });
    }

    if get_user_by_name(db, trimmed).await?.is_some() {
        return Err(Error::Validation {
            message: format!("User '{trimmed}' already exists"),
        });
    }

    let model = user::ActiveModel {
        name: Set(trimmed.to_string()),
        active: Set(true),
        whole_account_actions: Set(whole_account_actions),
        last_login: Set(None),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(user = %created.name, id = created.id, "created user");
    Ok(created)
}

/// Finds a user by name, ignoring case.
pub async fn get_user_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(
            Expr::expr(Func::upper(Expr::col(user::Column::Name)))
                .eq(name.trim().to_uppercase()),
        )
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by id.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Records a successful login by stamping `last_login` with the current
/// time.
pub async fn record_login(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    let user = require_user(db, user_id).await?;
    let mut model: user::ActiveModel = user.into();
    model.last_login = Set(Some(chrono::Utc::now()));
    model.update(db).await.map_err(Into::into)
}

/// Enables or disables whole-account (split) deposits for a user.
pub async fn set_whole_account_actions(
    db: &DatabaseConnection,
    user_id: i64,
    enabled: bool,
) -> Result<user::Model> {
    let user = require_user(db, user_id).await?;
    let mut model: user::ActiveModel = user.into();
    model.whole_account_actions = Set(enabled);
    model.update(db).await.map_err(Into::into)
}

async fn require_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            name: user_id.to_string(),
        })
}
