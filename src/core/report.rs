//! Report generation business logic.
//!
//! Summarizes a user's committed ledger activity over an inclusive date
//! range, grouped by account. All totals are computed in integer minor
//! units and only rendered as decimal dollars at the formatting edge.

use crate::{
    core::account,
    entities::{
        account as account_entity,
        transaction::{self, Action},
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, prelude::*};

/// Activity totals for one account over the report range.
#[derive(Debug, Clone)]
pub struct AccountActivity {
    /// The account being reported on
    pub account: account_entity::Model,
    /// Sum of active deposits in the range, in cents
    pub deposit_total: i64,
    /// Sum of active withdrawals in the range, in cents
    pub withdrawal_total: i64,
}

impl AccountActivity {
    /// Deposits minus withdrawals for this account, in cents.
    #[must_use]
    pub const fn net(&self) -> i64 {
        self.deposit_total - self.withdrawal_total
    }
}

/// A per-account activity report over an inclusive date range.
#[derive(Debug, Clone)]
pub struct ActivityReport {
    /// First date included
    pub start: NaiveDate,
    /// Last date included
    pub end: NaiveDate,
    /// One row per account with activity, ordered by account name
    pub rows: Vec<AccountActivity>,
}

impl ActivityReport {
    /// Sum of all deposits in the report, in cents.
    #[must_use]
    pub fn deposit_total(&self) -> i64 {
        self.rows.iter().map(|row| row.deposit_total).sum()
    }

    /// Sum of all withdrawals in the report, in cents.
    #[must_use]
    pub fn withdrawal_total(&self) -> i64 {
        self.rows.iter().map(|row| row.withdrawal_total).sum()
    }

    /// Net movement across every account, in cents.
    #[must_use]
    pub fn net(&self) -> i64 {
        self.deposit_total() - self.withdrawal_total()
    }

    /// Renders the report as delimited text, one line per account plus a
    /// header and a grand-total line. Amounts are plain decimal dollars so
    /// the output loads cleanly into a spreadsheet.
    #[must_use]
    pub fn to_delimited(&self, separator: &str) -> String {
        let mut out = String::new();
        out.push_str(&["Account", "Deposits", "Withdrawals", "Net"].join(separator));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!(
                "{}{separator}{}{separator}{}{separator}{}\n",
                row.account.name,
                format_cell(row.deposit_total),
                format_cell(row.withdrawal_total),
                format_cell(row.net()),
            ));
        }
        out.push_str(&format!(
            "Total{separator}{}{separator}{}{separator}{}\n",
            format_cell(self.deposit_total()),
            format_cell(self.withdrawal_total()),
            format_cell(self.net()),
        ));
        out
    }
}

fn format_cell(minor: i64) -> String {
    format!("{:.2}", crate::core::money::from_minor_units(minor))
}

/// Generates a per-account activity report for the inclusive date range.
///
/// Only committed (active) deposits and withdrawals count; transient and
/// reversed transactions are invisible here. Accounts with no activity in
/// the range are omitted. Deactivated accounts still appear when they have
/// history in the range.
pub async fn generate_activity_report(
    db: &DatabaseConnection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ActivityReport> {
    let accounts = account::get_all_accounts(db, user_id).await?;
    let mut rows = Vec::new();
    for account in accounts {
        let transactions = crate::entities::Transaction::find()
            .filter(transaction::Column::AccountId.eq(account.id))
            .filter(transaction::Column::Active.eq(true))
            .filter(transaction::Column::Date.gte(start))
            .filter(transaction::Column::Date.lte(end))
            .all(db)
            .await?;
        let deposit_total = transactions
            .iter()
            .filter(|t| t.action == Action::Deposit)
            .map(|t| t.amount)
            .sum();
        let withdrawal_total = transactions
            .iter()
            .filter(|t| t.action == Action::Withdrawal)
            .map(|t| t.amount)
            .sum();
        if deposit_total == 0 && withdrawal_total == 0 {
            continue;
        }
        rows.push(AccountActivity {
            account,
            deposit_total,
            withdrawal_total,
        });
    }
    Ok(ActivityReport { start, end, rows })
}
