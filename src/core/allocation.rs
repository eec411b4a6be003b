//! Deposit-allocation engine - splits a gross amount across accounts.
//!
//! Given a gross deposit in cents, a list of allocation rules derived from
//! the user's accounts, and a total of deductions, the engine produces one
//! entry per funded account such that the entries plus the deductions sum
//! exactly to the gross amount. The operation order is strict because later
//! steps consume the remainder left by earlier ones:
//!
//! 1. percentage-of-gross rules, skimmed off the gross;
//! 2. deductions, subtracted from the remainder;
//! 3. fixed rules, funded from the shared remainder in rule order;
//! 4. percentage-of-net rules, applied to whatever is left;
//! 5. reconciliation, which folds any rounding drift into the last
//!    net-percentage entry so the sum invariant holds to the cent.
//!
//! All arithmetic is integer minor units; the only rounding happens inside
//! [`money::apply_rate`] and is absorbed by reconciliation.

use crate::{
    core::money,
    entities::account::{self, AllocationKind},
    errors::{Error, Result},
};
use tracing::debug;

/// An allocation rule, derived from an [`account::Model`] at allocation time.
///
/// Ephemeral: rules are rebuilt from the account rows on every allocation and
/// never persisted separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRule {
    /// Account to fund
    pub account_id: i64,
    /// Account name, carried along for error and log messages
    pub name: String,
    /// Percentage or fixed
    pub kind: AllocationKind,
    /// Rate in minor units: hundredths of a percent, or cents when fixed
    pub rate: i64,
    /// Percentage of the gross (true) or of the net (false)
    pub affect_gross: bool,
}

impl AllocationRule {
    /// Derives the rule an account row contributes to a deposit split.
    #[must_use]
    pub fn from_account(account: &account::Model) -> Self {
        Self {
            account_id: account.id,
            name: account.name.clone(),
            kind: account.kind,
            rate: account.rate,
            affect_gross: account.affect_gross,
        }
    }

    const fn is_gross_percentage(&self) -> bool {
        matches!(self.kind, AllocationKind::Percentage) && self.affect_gross
    }

    const fn is_net_percentage(&self) -> bool {
        matches!(self.kind, AllocationKind::Percentage) && !self.affect_gross
    }

    const fn is_fixed(&self) -> bool {
        matches!(self.kind, AllocationKind::Fixed)
    }
}

/// One (account, amount) pair produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationEntry {
    /// Account to fund
    pub account_id: i64,
    /// Account name, for display
    pub name: String,
    /// Amount in cents
    pub amount: i64,
}

/// The smallest gross amount for which the given rules and deductions are
/// feasible: deductions, plus the skim of every gross-percentage rule, plus
/// every fixed amount.
#[must_use]
pub fn minimum_required(gross: i64, rules: &[AllocationRule], deduction_total: i64) -> i64 {
    let gross_skim: i64 = rules
        .iter()
        .filter(|r| r.is_gross_percentage())
        .map(|r| money::apply_rate(gross, r.rate))
        .sum();
    let fixed_total: i64 = rules.iter().filter(|r| r.is_fixed()).map(|r| r.rate).sum();
    deduction_total + gross_skim + fixed_total
}

/// Partitions `gross` (cents) into per-account amounts.
///
/// Zero-amount allocations are dropped rather than emitted. The returned
/// entries plus `deduction_total` sum exactly to `gross` whenever at least
/// one net-percentage rule exists; without net-percentage rules any
/// remainder is deliberately left undistributed.
///
/// # Errors
/// [`Error::Funds`] when `gross` cannot cover the minimum required
/// distribution, [`Error::InvalidDeposit`] on a negative fixed amount.
pub fn allocate(
    gross: i64,
    rules: &[AllocationRule],
    deduction_total: i64,
) -> Result<Vec<AllocationEntry>> {
    let minimum = minimum_required(gross, rules, deduction_total);
    if gross < minimum {
        return Err(Error::Funds {
            minimum: money::from_minor_units(minimum),
        });
    }

    let mut entries: Vec<AllocationEntry> = Vec::new();
    let mut running = gross;

    // 1) Percentage amounts on the gross
    for rule in rules.iter().filter(|r| r.is_gross_percentage()) {
        let amount = money::apply_rate(gross, rule.rate);
        if amount > 0 {
            running -= amount;
            entries.push(AllocationEntry {
                account_id: rule.account_id,
                name: rule.name.clone(),
                amount,
            });
        }
    }

    // 2) Execute deductions
    running -= deduction_total;

    // 3) Fixed amounts, in rule order, from the shared remainder
    for rule in rules.iter().filter(|r| r.is_fixed()) {
        if rule.rate < 0 {
            return Err(Error::InvalidDeposit {
                message: format!("Negative fixed amount for account '{}'", rule.name),
            });
        }
        if rule.rate == 0 {
            continue;
        }
        if running <= 0 {
            return Err(Error::Funds {
                minimum: money::from_minor_units(minimum),
            });
        }
        running -= rule.rate;
        entries.push(AllocationEntry {
            account_id: rule.account_id,
            name: rule.name.clone(),
            amount: rule.rate,
        });
    }

    // 4) Percentage amounts on the net
    let net_rules: Vec<&AllocationRule> = rules.iter().filter(|r| r.is_net_percentage()).collect();
    if running > 0 {
        let net = running;
        for rule in &net_rules {
            let amount = money::apply_rate(net, rule.rate);
            if amount > 0 {
                running -= amount;
                entries.push(AllocationEntry {
                    account_id: rule.account_id,
                    name: rule.name.clone(),
                    amount,
                });
            }
        }
    }

    // 5) Reconciliation: fold rounding drift into the last entry so the
    //    emitted amounts plus deductions match the gross exactly. Only
    //    applies when net-percentage rules exist; without them the
    //    remainder is intentionally left undistributed.
    if !net_rules.is_empty() {
        let emitted: i64 = entries.iter().map(|e| e.amount).sum();
        let difference = gross - (emitted + deduction_total);
        if difference != 0 {
            // Net entries sit at the tail, so the last entry is the last
            // net-percentage entry when any were emitted; when every net
            // amount rounded to zero this falls back to the last entry of
            // any kind
            if let Some(entry) = entries.last_mut() {
                debug!(
                    difference,
                    account = %entry.name,
                    "absorbing rounding drift into final allocation entry"
                );
                entry.amount += difference;
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn gross_rule(id: i64, name: &str, percent: f64) -> AllocationRule {
        AllocationRule {
            account_id: id,
            name: name.to_string(),
            kind: AllocationKind::Percentage,
            rate: money::to_minor_units_rate(percent),
            affect_gross: true,
        }
    }

    fn net_rule(id: i64, name: &str, percent: f64) -> AllocationRule {
        AllocationRule {
            account_id: id,
            name: name.to_string(),
            kind: AllocationKind::Percentage,
            rate: money::to_minor_units_rate(percent),
            affect_gross: false,
        }
    }

    fn fixed_rule(id: i64, name: &str, dollars: f64) -> AllocationRule {
        AllocationRule {
            account_id: id,
            name: name.to_string(),
            kind: AllocationKind::Fixed,
            rate: money::to_minor_units(dollars),
            affect_gross: false,
        }
    }

    #[test]
    fn test_example_scenario_full_split() {
        // A at 10% of gross, B fixed $50, C at 100% of net, $500 deposit
        let rules = vec![
            gross_rule(1, "A", 10.0),
            fixed_rule(2, "B", 50.0),
            net_rule(3, "C", 100.0),
        ];
        let entries = allocate(50_000, &rules, 0).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].amount, 5000); // A: $50.00
        assert_eq!(entries[1].amount, 5000); // B: $50.00
        assert_eq!(entries[2].amount, 40_000); // C: $400.00
        let total: i64 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(total, 50_000);
    }

    #[test]
    fn test_example_scenario_funds_shortfall() {
        // Same accounts, $40 deposit: minimum = $4 (A) + $50 (B) = $54
        let rules = vec![
            gross_rule(1, "A", 10.0),
            fixed_rule(2, "B", 50.0),
            net_rule(3, "C", 100.0),
        ];
        let err = allocate(4000, &rules, 0).unwrap_err();
        match err {
            Error::Funds { minimum } => assert!((minimum - 54.0).abs() < f64::EPSILON),
            other => panic!("expected funds error, got {other:?}"),
        }
    }

    #[test]
    fn test_sum_invariant_with_rounding_drift() {
        // Three net accounts at 33.33/33.33/33.34: each entry rounds, the
        // reconciliation step must still make the cents add up exactly
        let rules = vec![
            net_rule(1, "one", 33.33),
            net_rule(2, "two", 33.33),
            net_rule(3, "three", 33.34),
        ];
        for gross in [3, 7, 99, 101, 1000, 12_345, 99_999] {
            let entries = allocate(gross, &rules, 0).unwrap();
            let total: i64 = entries.iter().map(|e| e.amount).sum();
            assert_eq!(total, gross, "gross {gross} did not reconcile");
        }
    }

    #[test]
    fn test_sum_invariant_with_deductions() {
        let rules = vec![gross_rule(1, "skim", 5.0), net_rule(2, "rest", 100.0)];
        let deductions = 1234; // $12.34 withheld before allocation
        let gross = 98_765;
        let entries = allocate(gross, &rules, deductions).unwrap();
        let total: i64 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(total + deductions, gross);
    }

    #[test]
    fn test_deductions_count_toward_minimum() {
        let rules = vec![net_rule(1, "rest", 100.0)];
        // $10 gross, $15 of deductions
        let err = allocate(1000, &rules, 1500).unwrap_err();
        assert!(matches!(err, Error::Funds { .. }));
    }

    #[test]
    fn test_zero_allocations_are_dropped() {
        // 0.01% of $1.00 rounds to zero and must not emit an entry
        let rules = vec![gross_rule(1, "tiny", 0.01), net_rule(2, "rest", 100.0)];
        let entries = allocate(100, &rules, 0).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account_id, 2);
        assert_eq!(entries[0].amount, 100);
    }

    #[test]
    fn test_negative_fixed_amount_rejected() {
        let rules = vec![
            AllocationRule {
                account_id: 1,
                name: "bad".to_string(),
                kind: AllocationKind::Fixed,
                rate: -500,
                affect_gross: false,
            },
            net_rule(2, "rest", 100.0),
        ];
        let err = allocate(10_000, &rules, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidDeposit { .. }));
    }

    #[test]
    fn test_leftover_without_net_rules_is_not_distributed() {
        // Explicit-accounts variant: remainder after fixed rules simply
        // stays with the caller, it is not an error
        let rules = vec![gross_rule(1, "skim", 10.0), fixed_rule(2, "fixed", 50.0)];
        let entries = allocate(50_000, &rules, 0).unwrap();
        let total: i64 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(total, 10_000); // $50 + $50, $400 undistributed
    }

    #[test]
    fn test_tiny_remainder_falls_back_to_last_entry() {
        // One cent of net split between two 50% rules: both round to zero
        // (half-to-even), reconciliation lands the cent on the last emitted
        // entry of any kind
        let rules = vec![
            fixed_rule(1, "fixed", 1.0),
            net_rule(2, "half-a", 50.0),
            net_rule(3, "half-b", 50.0),
        ];
        let entries = allocate(101, &rules, 0).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account_id, 1);
        assert_eq!(entries[0].amount, 101);
    }

    #[test]
    fn test_fixed_rules_funded_in_order() {
        let rules = vec![
            fixed_rule(1, "first", 30.0),
            fixed_rule(2, "second", 20.0),
            net_rule(3, "rest", 100.0),
        ];
        let entries = allocate(10_000, &rules, 0).unwrap();
        assert_eq!(entries[0].account_id, 1);
        assert_eq!(entries[0].amount, 3000);
        assert_eq!(entries[1].account_id, 2);
        assert_eq!(entries[1].amount, 2000);
        assert_eq!(entries[2].account_id, 3);
        assert_eq!(entries[2].amount, 5000);
    }

    #[test]
    fn test_gross_equal_to_minimum_allowed() {
        // Exactly the minimum: net accounts receive nothing, nothing fails
        let rules = vec![fixed_rule(1, "fixed", 54.0), net_rule(2, "rest", 100.0)];
        let entries = allocate(5400, &rules, 0).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, 5400);
    }

    #[test]
    fn test_minimum_required_figure() {
        let rules = vec![
            gross_rule(1, "A", 10.0),
            fixed_rule(2, "B", 50.0),
            net_rule(3, "C", 100.0),
        ];
        assert_eq!(minimum_required(4000, &rules, 0), 5400);
        assert_eq!(minimum_required(4000, &rules, 600), 6000);
    }
}
