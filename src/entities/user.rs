//! User entity - The owner of the sub-accounts and transactions.
//!
//! A single user owns every account and transaction in the ledger. The
//! `whole_account_actions` flag records whether deposits without an explicit
//! account should be split across the user's accounts by the allocation
//! engine.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, never blank, unique without regard to case
    pub name: String,
    /// Whether the user is active
    pub active: bool,
    /// Whether whole-account (split) deposits are enabled for this user
    pub whole_account_actions: bool,
    /// Timestamp of the most recent login, None if never logged in
    pub last_login: Option<DateTimeUtc>,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many accounts
    #[sea_orm(has_many = "super::account::Entity")]
    Accounts,
    /// One user has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
