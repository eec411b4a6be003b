//! Account ledger business logic - Handles all account-related operations.
//!
//! Provides functions for creating, retrieving, updating, and deactivating
//! accounts, plus balance maintenance helpers used by the transaction
//! ledger. Account totals are stored in integer minor units and always equal
//! the sum of the account's active deposits minus its active withdrawals;
//! accounts are deactivated rather than deleted so history stays intact.

use crate::{
    core::money,
    entities::{
        Account,
        account::{self, AllocationKind},
        transaction::{self, Action},
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Retrieves all active accounts for a user, ordered alphabetically by name.
///
/// This is the account set consulted for whole-account deposits and the
/// reconfiguration check.
pub async fn get_active_accounts(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<account::Model>> {
    Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .filter(account::Column::Active.eq(true))
        .order_by_asc(account::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every account for a user, active or not.
pub async fn get_all_accounts(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<account::Model>> {
    Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .order_by_asc(account::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active account by name for the given user.
pub async fn get_account_by_name(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
) -> Result<Option<account::Model>> {
    Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .filter(account::Column::Name.eq(name))
        .filter(account::Column::Active.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an account by its unique id, whether active or deactivated.
pub async fn get_account_by_id(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<Option<account::Model>> {
    Account::find_by_id(account_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new account with a validated name and allocation rule.
///
/// `rate` crosses the boundary as a decimal: a percentage on the 0-100
/// scale for percentage accounts, dollars for fixed accounts. The running
/// total is seeded at zero; only committed transactions move it.
pub async fn create_account(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
    description: Option<String>,
    kind: AllocationKind,
    rate: f64,
    affect_gross: bool,
) -> Result<account::Model> {
    let name = validate_name(name)?;
    let rate_minor = validate_rate(kind, rate)?;

    let model = account::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.clone()),
        description: Set(description),
        active: Set(true),
        total: Set(0),
        kind: Set(kind),
        rate: Set(rate_minor),
        affect_gross: Set(affect_gross),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(account = %name, id = created.id, ?kind, rate_minor, "created account");
    Ok(created)
}

/// Changes an account's allocation rule.
///
/// Callers are expected to re-run the reconfiguration check afterwards
/// before permitting further whole-account actions.
pub async fn update_allocation(
    db: &DatabaseConnection,
    account_id: i64,
    kind: AllocationKind,
    rate: f64,
    affect_gross: bool,
) -> Result<account::Model> {
    let rate_minor = validate_rate(kind, rate)?;
    let account = require_account(db, account_id).await?;

    let mut model: account::ActiveModel = account.into();
    model.kind = Set(kind);
    model.rate = Set(rate_minor);
    model.affect_gross = Set(affect_gross);
    let updated = model.update(db).await?;
    info!(id = account_id, ?kind, rate_minor, affect_gross, "updated allocation rule");
    Ok(updated)
}

/// Renames an account, rejecting blank names.
pub async fn rename_account(
    db: &DatabaseConnection,
    account_id: i64,
    name: &str,
) -> Result<account::Model> {
    let name = validate_name(name)?;
    let account = require_account(db, account_id).await?;

    let mut model: account::ActiveModel = account.into();
    model.name = Set(name);
    model.update(db).await.map_err(Into::into)
}

/// Replaces an account's description.
pub async fn update_description(
    db: &DatabaseConnection,
    account_id: i64,
    description: Option<String>,
) -> Result<account::Model> {
    let account = require_account(db, account_id).await?;
    let mut model: account::ActiveModel = account.into();
    model.description = Set(description);
    model.update(db).await.map_err(Into::into)
}

/// Activates or deactivates an account.
///
/// Deactivation removes the account from whole-account splits and by-name
/// lookups but never deletes it, so its transaction history stays valid.
pub async fn set_account_active(
    db: &DatabaseConnection,
    account_id: i64,
    active: bool,
) -> Result<account::Model> {
    let account = require_account(db, account_id).await?;
    if account.active == active {
        return Ok(account);
    }
    let mut model: account::ActiveModel = account.into();
    model.active = Set(active);
    let updated = model.update(db).await?;
    info!(id = account_id, active, "changed account status");
    Ok(updated)
}

/// Atomically adds `delta_minor` cents to an account's running total.
///
/// Uses a single `UPDATE accounts SET total = total + ?` expression rather
/// than read-modify-write, and is generic over the connection so it can run
/// inside a surrounding database transaction.
pub async fn adjust_account_total<C>(db: &C, account_id: i64, delta_minor: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let result = Account::update_many()
        .col_expr(
            account::Column::Total,
            Expr::col(account::Column::Total).add(delta_minor),
        )
        .filter(account::Column::Id.eq(account_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::AccountNotFound {
            name: account_id.to_string(),
        });
    }
    Ok(())
}

/// One row of the total-consistency audit produced by
/// [`recalculate_account_totals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalAudit {
    /// The audited account
    pub account: account::Model,
    /// Total currently stored on the account row, in cents
    pub stored: i64,
    /// Total recomputed from the active transaction log, in cents
    pub recomputed: i64,
}

impl TotalAudit {
    /// Whether the stored total matches the transaction log.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.stored == self.recomputed
    }
}

/// Recomputes every account total from the sum of its active transactions.
///
/// Reports, but does not repair, any account whose stored total has drifted
/// from the ledger. Deposits add, withdrawals subtract; inactive (reversed)
/// transactions are ignored.
pub async fn recalculate_account_totals(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<TotalAudit>> {
    let accounts = get_all_accounts(db, user_id).await?;
    let mut audits = Vec::with_capacity(accounts.len());
    for account in accounts {
        let rows = crate::entities::Transaction::find()
            .filter(transaction::Column::AccountId.eq(account.id))
            .filter(transaction::Column::Active.eq(true))
            .all(db)
            .await?;
        let recomputed = rows
            .iter()
            .map(|t| match t.action {
                Action::Deposit => t.amount,
                Action::Withdrawal => -t.amount,
                Action::Deduction | Action::Transfer | Action::Informational => 0,
            })
            .sum();
        audits.push(TotalAudit {
            stored: account.total,
            recomputed,
            account,
        });
    }
    Ok(audits)
}

async fn require_account(db: &DatabaseConnection, account_id: i64) -> Result<account::Model> {
    get_account_by_id(db, account_id)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            name: account_id.to_string(),
        })
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "Account name cannot be blank".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_rate(kind: AllocationKind, rate: f64) -> Result<i64> {
    if !rate.is_finite() {
        return Err(Error::InvalidAmount { amount: rate });
    }
    match kind {
        AllocationKind::Percentage => {
            if !(0.0..=100.0).contains(&rate) {
                return Err(Error::Validation {
                    message: format!("Percentage must be between 0 and 100, got {rate}"),
                });
            }
            Ok(money::to_minor_units_rate(rate))
        }
        AllocationKind::Fixed => {
            if rate < 0.0 {
                return Err(Error::Validation {
                    message: format!("Fixed amount cannot be negative, got {rate}"),
                });
            }
            Ok(money::to_minor_units(rate))
        }
    }
}
