//! Account entity - A named sub-account with a running balance and an
//! allocation rule.
//!
//! The `total` column is stored in integer minor units (cents) and is kept
//! equal to the sum of the account's active deposits minus its active
//! withdrawals. The allocation rule (`kind`, `rate`, `affect_gross`) drives
//! how whole-account deposits are split: `rate` holds hundredths of a percent
//! for percentage accounts (10000 = 100%) and cents for fixed accounts.
//! Accounts are deactivated rather than deleted so transaction history stays
//! intact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How an account participates in a whole-account deposit split.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum AllocationKind {
    /// Receives a percentage of the gross or net amount
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// Receives a fixed dollar amount
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Human-readable name, never blank
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Whether the account participates in new activity (never deleted)
    pub active: bool,
    /// Running balance in minor units (cents)
    pub total: i64,
    /// Percentage or fixed allocation rule
    pub kind: AllocationKind,
    /// Allocation rate in minor units: hundredths of a percent for
    /// percentage accounts, cents for fixed accounts
    pub rate: i64,
    /// Whether a percentage rule is taken from the gross (true) or the
    /// net (false); meaningless for fixed accounts
    pub affect_gross: bool,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each account belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One account has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
