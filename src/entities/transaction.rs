//! Transaction entity - Every movement of money in the ledger.
//!
//! Transactions form parent/child trees: a whole-account deposit owns one
//! child deposit per funded account plus one child deduction per supplied
//! deduction, and a transfer owns exactly one withdrawal child and one
//! deposit child. `account_id` of None marks a whole-account aggregate
//! transaction. Rows are inserted with `active = false` (transient) and only
//! affect account balances once committed; flipping `active` back off
//! reverses the effect.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The kind of transaction, discriminating the balance effect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Action {
    /// Adds its amount to the account total
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Subtracts its amount from the account total
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Subtracted from the gross of a deposit before allocation; no account
    #[sea_orm(string_value = "deduction")]
    Deduction,
    /// Aggregate of one withdrawal child and one deposit child; no account
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Recorded for information only; no balance effect
    #[sea_orm(string_value = "informational")]
    Informational,
}

impl Action {
    /// Whether this kind of transaction moves an account balance.
    #[must_use]
    pub const fn affects_balance(self) -> bool {
        matches!(self, Self::Deposit | Self::Withdrawal)
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User the transaction belongs to
    pub user_id: i64,
    /// Affected account; None marks a whole-account aggregate transaction
    pub account_id: Option<i64>,
    /// Parent transaction when this is part of a tree, None for roots
    pub parent_id: Option<i64>,
    /// Date the transaction occurred (user-supplied, not insertion time)
    pub date: Date,
    /// When the transaction was recorded
    pub timestamp: DateTimeUtc,
    /// Amount in minor units (cents), always non-negative; the action
    /// determines the sign of the balance effect
    pub amount: i64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Deposit, withdrawal, deduction, transfer, or informational
    pub action: Action,
    /// Whether the balance effect is currently applied
    pub active: bool,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// A transaction may reference one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
    /// A transaction may reference a parent transaction; children are
    /// queried by filtering on `parent_id` rather than through a relation
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
