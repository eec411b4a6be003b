//! Reconfiguration checker - percentage invariants for whole-account
//! actions.
//!
//! Gross-percentage accounts are skimmed off the top of a deposit, so their
//! rates may sum to at most 100%; net-percentage accounts must exhaust the
//! remainder exactly, so their rates must sum to exactly 100%. Whole-account
//! deposits refuse to run while either side is violated, and callers consult
//! this module whenever an account's rate, gross/net flag, or active status
//! changes.

use crate::{
    core::{account, money},
    entities::account::{AllocationKind, Model as AccountModel},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;

/// Which sides of the percentage configuration need interactive correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconfigurationCheck {
    /// Gross-percentage rates sum to more than 100%
    pub gross_needs_fix: bool,
    /// Net-percentage rates do not sum to exactly 100%
    pub net_needs_fix: bool,
}

impl ReconfigurationCheck {
    /// Whether whole-account actions may proceed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.gross_needs_fix && !self.net_needs_fix
    }

    /// Converts a failed check into the blocking error callers surface.
    ///
    /// # Errors
    /// [`Error::ReconfigurationRequired`] unless the check is clean.
    pub const fn into_result(self) -> Result<()> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(Error::ReconfigurationRequired {
                gross: self.gross_needs_fix,
                net: self.net_needs_fix,
            })
        }
    }
}

/// Determines whether the account set needs reconfiguring before
/// whole-account actions.
///
/// Rates are compared in minor units (10000 = 100%) so the boundary is
/// exact: net sums of 9999 and 10001 both need fixing, 10000 does not.
#[must_use]
pub fn require_reconfiguration(
    accounts: &[AccountModel],
    check_gross: bool,
    check_net: bool,
    active_only: bool,
) -> ReconfigurationCheck {
    let mut check = ReconfigurationCheck::default();

    let percentage_rates = |gross: bool| -> i64 {
        accounts
            .iter()
            .filter(|a| !active_only || a.active)
            .filter(|a| a.kind == AllocationKind::Percentage && a.affect_gross == gross)
            .map(|a| a.rate)
            .sum()
    };

    if check_gross {
        check.gross_needs_fix = percentage_rates(true) > money::RATE_SCALE;
    }
    if check_net {
        check.net_needs_fix = percentage_rates(false) != money::RATE_SCALE;
    }
    check
}

/// Loads the user's active accounts and runs the full check, the guard the
/// whole-account deposit path uses.
pub async fn check_for_whole_account(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<ReconfigurationCheck> {
    let accounts = account::get_active_accounts(db, user_id).await?;
    Ok(require_reconfiguration(&accounts, true, true, true))
}
