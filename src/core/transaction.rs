//! Transaction ledger business logic.
//!
//! Transactions are created transient (inserted with `active = false`, no
//! balance effect), then committed, which activates the whole parent/child
//! tree and applies each node's balance effect exactly once. Reversal flips
//! `active` back off and undoes the effects, recursively for every child of
//! the toggled node; a child toggled directly never touches its parent.
//!
//! Deposits without an explicit account are whole-account deposits: the
//! allocation engine splits the gross amount across the user's active
//! accounts, and the resulting per-account deposits plus any deductions
//! become children of the aggregate root. Every deposit and withdrawal row
//! passes duplicate detection unless the caller explicitly overrides it.

use crate::{
    core::{
        account,
        allocation::{self, AllocationRule},
        money, reconfigure,
    },
    entities::{
        Account,
        account as account_entity,
        transaction::{self, Action},
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Retrieves a transaction by id.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    crate::entities::Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the direct children of a transaction, in insertion order.
pub async fn get_children(
    db: &DatabaseConnection,
    parent_id: i64,
) -> Result<Vec<transaction::Model>> {
    crate::entities::Transaction::find()
        .filter(transaction::Column::ParentId.eq(parent_id))
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves transactions against a specific account, newest first.
pub async fn get_transactions_for_account(
    db: &DatabaseConnection,
    account_id: i64,
    limit: Option<u64>,
) -> Result<Vec<transaction::Model>> {
    let mut query = crate::entities::Transaction::find()
        .filter(transaction::Column::AccountId.eq(account_id))
        .order_by_desc(transaction::Column::Timestamp)
        .order_by_desc(transaction::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Retrieves a user's transactions within an inclusive date range,
/// oldest first.
pub async fn get_transactions_in_range(
    db: &DatabaseConnection,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<transaction::Model>> {
    crate::entities::Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::Date.gte(start))
        .filter(transaction::Column::Date.lte(end))
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds currently-active transactions that look like duplicates of a
/// prospective insert: same date, account, and amount, excluding kinds that
/// legitimately repeat (transfers, deductions, informational rows) and
/// excluding siblings under the same parent.
pub async fn find_duplicate_candidates<C>(
    db: &C,
    date: NaiveDate,
    account_id: Option<i64>,
    amount_minor: i64,
    parent_id: Option<i64>,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    let mut query = crate::entities::Transaction::find()
        .filter(transaction::Column::Action.ne(Action::Transfer))
        .filter(transaction::Column::Action.ne(Action::Deduction))
        .filter(transaction::Column::Action.ne(Action::Informational))
        .filter(transaction::Column::Active.eq(true))
        .filter(transaction::Column::Date.eq(date))
        .filter(transaction::Column::Amount.eq(amount_minor));

    query = match account_id {
        Some(id) => query.filter(transaction::Column::AccountId.eq(id)),
        None => query.filter(transaction::Column::AccountId.is_null()),
    };

    if let Some(parent_id) = parent_id {
        query = query.filter(
            Condition::any()
                .add(transaction::Column::ParentId.ne(parent_id))
                .add(transaction::Column::ParentId.is_null()),
        );
    }

    query.all(db).await.map_err(Into::into)
}

/// Creates a deposit.
///
/// With an `account_id` this is a single-account deposit: the amount net of
/// deductions lands on that account when committed. Without one it is a
/// whole-account deposit: the reconfiguration invariants are checked, the
/// allocation engine splits the gross across the user's active accounts, and
/// one child deposit per funded account plus one child deduction per
/// supplied deduction are created under the aggregate root.
///
/// Everything is inserted transient (`active = false`) inside a single
/// database transaction; call [`commit_transaction`] to apply the balance
/// effects. Returns the root transaction.
#[allow(clippy::too_many_arguments)]
pub async fn create_deposit(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    date: NaiveDate,
    description: &str,
    account_id: Option<i64>,
    deductions: &[(f64, String)],
    override_duplicate: bool,
) -> Result<transaction::Model> {
    let amount_minor = validate_amount(amount)?;
    let deduction_minors = validate_deductions(deductions)?;
    let deduction_total: i64 = deduction_minors.iter().map(|(amount, _)| amount).sum();
    if deduction_total > amount_minor {
        return Err(Error::Funds {
            minimum: money::from_minor_units(deduction_total),
        });
    }

    match account_id {
        Some(account_id) => {
            create_single_deposit(
                db,
                user_id,
                amount_minor,
                date,
                description,
                account_id,
                &deduction_minors,
                override_duplicate,
            )
            .await
        }
        None => {
            create_whole_account_deposit(
                db,
                user_id,
                amount_minor,
                date,
                description,
                &deduction_minors,
                override_duplicate,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn create_single_deposit(
    db: &DatabaseConnection,
    user_id: i64,
    amount_minor: i64,
    date: NaiveDate,
    description: &str,
    account_id: i64,
    deductions: &[(i64, String)],
    override_duplicate: bool,
) -> Result<transaction::Model> {
    let deduction_total: i64 = deductions.iter().map(|(amount, _)| amount).sum();
    let net = amount_minor - deduction_total;

    let txn = db.begin().await?;
    require_account(&txn, account_id).await?;
    let root = insert_transaction(
        &txn,
        user_id,
        date,
        net,
        description.to_string(),
        Action::Deposit,
        Some(account_id),
        None,
        override_duplicate,
    )
    .await?;
    insert_deductions(&txn, user_id, date, root.id, deductions).await?;
    txn.commit().await?;

    info!(
        id = root.id,
        account_id,
        amount = %money::format_amount(net),
        "created deposit"
    );
    Ok(root)
}

async fn create_whole_account_deposit(
    db: &DatabaseConnection,
    user_id: i64,
    amount_minor: i64,
    date: NaiveDate,
    description: &str,
    deductions: &[(i64, String)],
    override_duplicate: bool,
) -> Result<transaction::Model> {
    reconfigure::check_for_whole_account(db, user_id)
        .await?
        .into_result()?;

    let accounts = account::get_active_accounts(db, user_id).await?;
    if accounts.is_empty() {
        return Err(Error::InvalidDeposit {
            message: "Accounts are required for a whole account deposit".to_string(),
        });
    }
    let rules: Vec<AllocationRule> = accounts.iter().map(AllocationRule::from_account).collect();
    let deduction_total: i64 = deductions.iter().map(|(amount, _)| amount).sum();
    let entries = allocation::allocate(amount_minor, &rules, deduction_total)?;
    debug!(
        gross = %money::format_amount(amount_minor),
        entries = entries.len(),
        "allocated whole account deposit"
    );

    let txn = db.begin().await?;
    let root = insert_transaction(
        &txn,
        user_id,
        date,
        amount_minor,
        description.to_string(),
        Action::Deposit,
        None,
        None,
        override_duplicate,
    )
    .await?;
    for entry in &entries {
        insert_transaction(
            &txn,
            user_id,
            date,
            entry.amount,
            description.to_string(),
            Action::Deposit,
            Some(entry.account_id),
            Some(root.id),
            override_duplicate,
        )
        .await?;
    }
    insert_deductions(&txn, user_id, date, root.id, deductions).await?;
    txn.commit().await?;

    info!(
        id = root.id,
        gross = %money::format_amount(amount_minor),
        accounts = entries.len(),
        "created whole account deposit"
    );
    Ok(root)
}

/// Creates a withdrawal against an explicit account.
///
/// Whole-account withdrawal splits are not supported; the account is
/// required by signature. The row is transient until committed.
pub async fn create_withdrawal(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    date: NaiveDate,
    description: &str,
    account_id: i64,
    override_duplicate: bool,
) -> Result<transaction::Model> {
    let amount_minor = validate_amount(amount)?;

    let txn = db.begin().await?;
    require_account(&txn, account_id).await?;
    let root = insert_transaction(
        &txn,
        user_id,
        date,
        amount_minor,
        description.to_string(),
        Action::Withdrawal,
        Some(account_id),
        None,
        override_duplicate,
    )
    .await?;
    txn.commit().await?;

    info!(
        id = root.id,
        account_id,
        amount = %money::format_amount(amount_minor),
        "created withdrawal"
    );
    Ok(root)
}

/// Creates a transfer: an aggregate root owning exactly one withdrawal
/// child (from) and one deposit child (to), described as
/// `[from -> to] description`.
pub async fn create_transfer(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    date: NaiveDate,
    to_account: i64,
    from_account: i64,
    description: &str,
    override_duplicate: bool,
) -> Result<transaction::Model> {
    let amount_minor = validate_amount(amount)?;
    if to_account == from_account {
        return Err(Error::Validation {
            message: "Cannot transfer an amount into the same account".to_string(),
        });
    }

    let txn = db.begin().await?;
    let from = require_account(&txn, from_account).await?;
    let to = require_account(&txn, to_account).await?;

    let root = insert_transaction(
        &txn,
        user_id,
        date,
        amount_minor,
        format!("[{} -> {}] {description}", from.name, to.name),
        Action::Transfer,
        None,
        None,
        override_duplicate,
    )
    .await?;
    insert_transaction(
        &txn,
        user_id,
        date,
        amount_minor,
        description.to_string(),
        Action::Withdrawal,
        Some(from_account),
        Some(root.id),
        override_duplicate,
    )
    .await?;
    insert_transaction(
        &txn,
        user_id,
        date,
        amount_minor,
        description.to_string(),
        Action::Deposit,
        Some(to_account),
        Some(root.id),
        override_duplicate,
    )
    .await?;
    txn.commit().await?;

    info!(
        id = root.id,
        from = %from.name,
        to = %to.name,
        amount = %money::format_amount(amount_minor),
        "created transfer"
    );
    Ok(root)
}

/// Commits a transaction tree: activates the root and every descendant and
/// applies each node's balance effect.
///
/// Idempotent - nodes that are already active are skipped, so committing
/// twice never double-applies an amount. The whole walk runs inside one
/// database transaction.
pub async fn commit_transaction(db: &DatabaseConnection, transaction_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let root = crate::entities::Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        let children = crate::entities::Transaction::find()
            .filter(transaction::Column::ParentId.eq(node.id))
            .all(&txn)
            .await?;
        pending.extend(children);
        if !node.active {
            apply_effect(&txn, &node, true).await?;
        }
    }
    txn.commit().await?;
    info!(id = transaction_id, "committed transaction tree");
    Ok(())
}

/// Applies or reverses a transaction tree's balance effects by toggling
/// `active` on the node and every descendant.
///
/// A no-op when the node is already in the requested state. Children that
/// independently match the requested state are left untouched so each
/// amount is added or removed exactly once. Toggling a child never
/// propagates upward to its parent.
pub async fn set_transaction_active(
    db: &DatabaseConnection,
    transaction_id: i64,
    active: bool,
) -> Result<()> {
    let txn = db.begin().await?;
    let root = crate::entities::Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;
    if root.active == active {
        return Ok(());
    }

    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        let children = crate::entities::Transaction::find()
            .filter(transaction::Column::ParentId.eq(node.id))
            .all(&txn)
            .await?;
        pending.extend(children);
        if node.active != active {
            apply_effect(&txn, &node, active).await?;
        }
    }
    txn.commit().await?;
    info!(id = transaction_id, active, "toggled transaction tree");
    Ok(())
}

/// Sets a node's `active` flag and moves the account total accordingly:
/// activating a deposit adds its amount, activating a withdrawal subtracts
/// it, deactivating does the opposite. Accountless nodes only flip the flag.
async fn apply_effect<C>(db: &C, node: &transaction::Model, active: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(account_id) = node.account_id {
        if node.action.affects_balance() {
            let delta = match node.action {
                Action::Deposit => node.amount,
                _ => -node.amount,
            };
            let delta = if active { delta } else { -delta };
            account::adjust_account_total(db, account_id, delta).await?;
        }
    }
    let mut model: transaction::ActiveModel = node.clone().into();
    model.active = Set(active);
    model.update(db).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction<C>(
    db: &C,
    user_id: i64,
    date: NaiveDate,
    amount_minor: i64,
    description: String,
    action: Action,
    account_id: Option<i64>,
    parent_id: Option<i64>,
    override_duplicate: bool,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    if !override_duplicate && action.affects_balance() {
        let candidates =
            find_duplicate_candidates(db, date, account_id, amount_minor, parent_id).await?;
        if !candidates.is_empty() {
            return Err(Error::Duplicate { candidates });
        }
    }

    transaction::ActiveModel {
        user_id: Set(user_id),
        account_id: Set(account_id),
        parent_id: Set(parent_id),
        date: Set(date),
        timestamp: Set(chrono::Utc::now()),
        amount: Set(amount_minor),
        description: Set(description),
        action: Set(action),
        active: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn insert_deductions<C>(
    db: &C,
    user_id: i64,
    date: NaiveDate,
    parent_id: i64,
    deductions: &[(i64, String)],
) -> Result<()>
where
    C: ConnectionTrait,
{
    for (amount_minor, description) in deductions {
        insert_transaction(
            db,
            user_id,
            date,
            *amount_minor,
            description.clone(),
            Action::Deduction,
            None,
            Some(parent_id),
            true,
        )
        .await?;
    }
    Ok(())
}

async fn require_account<C>(db: &C, account_id: i64) -> Result<account_entity::Model>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            name: account_id.to_string(),
        })
}

fn validate_amount(amount: f64) -> Result<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    let minor = money::to_minor_units(amount);
    if minor <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(minor)
}

fn validate_deductions(deductions: &[(f64, String)]) -> Result<Vec<(i64, String)>> {
    deductions
        .iter()
        .map(|(amount, description)| Ok((validate_amount(*amount)?, description.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::account::get_account_by_id,
        entities::account::AllocationKind,
        test_utils::{
            create_custom_account, create_test_account, setup_test_db, setup_with_account,
            setup_with_user, test_date,
        },
    };

    #[tokio::test]
    async fn test_validate_amount_rejects_bad_input() -> Result<()> {
        let db = setup_test_db().await?;
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result =
                create_withdrawal(&db, 1, bad, test_date(), "bad", 1, false).await;
            assert!(
                matches!(result.unwrap_err(), Error::InvalidAmount { .. }),
                "amount {bad} should be rejected"
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_single_deposit_commit_applies_balance() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;

        let root = create_deposit(
            &db,
            user.id,
            100.0,
            test_date(),
            "paycheck",
            Some(account.id),
            &[],
            false,
        )
        .await?;
        assert!(!root.active);
        // Transient: no balance effect yet
        assert_eq!(get_account_by_id(&db, account.id).await?.unwrap().total, 0);

        commit_transaction(&db, root.id).await?;
        assert_eq!(
            get_account_by_id(&db, account.id).await?.unwrap().total,
            10_000
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_is_idempotent() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;
        let root = create_deposit(
            &db,
            user.id,
            50.0,
            test_date(),
            "once",
            Some(account.id),
            &[],
            false,
        )
        .await?;

        commit_transaction(&db, root.id).await?;
        commit_transaction(&db, root.id).await?;
        assert_eq!(
            get_account_by_id(&db, account.id).await?.unwrap().total,
            5000
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_single_deposit_with_deductions() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;

        let root = create_deposit(
            &db,
            user.id,
            100.0,
            test_date(),
            "paycheck",
            Some(account.id),
            &[(10.0, "taxes".to_string()), (5.0, "dues".to_string())],
            false,
        )
        .await?;
        commit_transaction(&db, root.id).await?;

        // Net of deductions lands on the account
        assert_eq!(
            get_account_by_id(&db, account.id).await?.unwrap().total,
            8500
        );
        let children = get_children(&db, root.id).await?;
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.action == Action::Deduction));
        assert!(children.iter().all(|c| c.account_id.is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_deductions_exceeding_amount_rejected() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;
        let result = create_deposit(
            &db,
            user.id,
            10.0,
            test_date(),
            "small",
            Some(account.id),
            &[(15.0, "taxes".to_string())],
            false,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Funds { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_whole_account_deposit_example_scenario() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let a = create_custom_account(&db, user.id, "A", AllocationKind::Percentage, 10.0, true)
            .await?;
        let b =
            create_custom_account(&db, user.id, "B", AllocationKind::Fixed, 50.0, false).await?;
        let c = create_custom_account(&db, user.id, "C", AllocationKind::Percentage, 100.0, false)
            .await?;

        let root =
            create_deposit(&db, user.id, 500.0, test_date(), "salary", None, &[], false).await?;
        assert!(root.account_id.is_none());
        assert_eq!(root.amount, 50_000);

        commit_transaction(&db, root.id).await?;
        assert_eq!(get_account_by_id(&db, a.id).await?.unwrap().total, 5000);
        assert_eq!(get_account_by_id(&db, b.id).await?.unwrap().total, 5000);
        assert_eq!(get_account_by_id(&db, c.id).await?.unwrap().total, 40_000);

        let children = get_children(&db, root.id).await?;
        assert_eq!(children.len(), 3);
        let child_sum: i64 = children.iter().map(|t| t.amount).sum();
        assert_eq!(child_sum, 50_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_whole_account_deposit_funds_shortfall() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        create_custom_account(&db, user.id, "A", AllocationKind::Percentage, 10.0, true).await?;
        create_custom_account(&db, user.id, "B", AllocationKind::Fixed, 50.0, false).await?;
        create_custom_account(&db, user.id, "C", AllocationKind::Percentage, 100.0, false).await?;

        let err = create_deposit(&db, user.id, 40.0, test_date(), "tiny", None, &[], false)
            .await
            .unwrap_err();
        match err {
            Error::Funds { minimum } => assert!((minimum - 54.0).abs() < f64::EPSILON),
            other => panic!("expected funds error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_whole_account_deposit_requires_clean_configuration() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        // Net percentages sum to 50%, not 100%
        create_custom_account(&db, user.id, "half", AllocationKind::Percentage, 50.0, false)
            .await?;

        let err = create_deposit(&db, user.id, 100.0, test_date(), "pay", None, &[], false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ReconfigurationRequired { gross: false, net: true }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_whole_account_deposit_requires_accounts() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        // No accounts at all: the net invariant fails before allocation
        let err = create_deposit(&db, user.id, 100.0, test_date(), "pay", None, &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReconfigurationRequired { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_detection_and_override() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;

        let first = create_deposit(
            &db,
            user.id,
            25.0,
            test_date(),
            "first",
            Some(account.id),
            &[],
            false,
        )
        .await?;
        commit_transaction(&db, first.id).await?;

        // Identical date, account, and amount: flagged with the candidate
        let err = create_deposit(
            &db,
            user.id,
            25.0,
            test_date(),
            "second",
            Some(account.id),
            &[],
            false,
        )
        .await
        .unwrap_err();
        match err {
            Error::Duplicate { candidates } => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].id, first.id);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }

        // Explicit override lets the caller repeat the transaction
        let second = create_deposit(
            &db,
            user.id,
            25.0,
            test_date(),
            "second",
            Some(account.id),
            &[],
            true,
        )
        .await?;
        commit_transaction(&db, second.id).await?;
        assert_eq!(
            get_account_by_id(&db, account.id).await?.unwrap().total,
            5000
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_uncommitted_transactions_are_not_duplicates() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;

        // Transient first deposit never flags the second
        create_deposit(
            &db,
            user.id,
            25.0,
            test_date(),
            "first",
            Some(account.id),
            &[],
            false,
        )
        .await?;
        let second = create_deposit(
            &db,
            user.id,
            25.0,
            test_date(),
            "second",
            Some(account.id),
            &[],
            false,
        )
        .await;
        assert!(second.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_structure_and_reversal() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let x = create_test_account(&db, user.id, "X").await?;
        let y = create_test_account(&db, user.id, "Y").await?;
        // Seed X with $100
        let seed =
            create_deposit(&db, user.id, 100.0, test_date(), "seed", Some(x.id), &[], false)
                .await?;
        commit_transaction(&db, seed.id).await?;

        let root = create_transfer(
            &db,
            user.id,
            25.0,
            test_date(),
            y.id,
            x.id,
            "rebalance",
            false,
        )
        .await?;
        assert_eq!(root.action, Action::Transfer);
        assert!(root.account_id.is_none());
        assert_eq!(root.description, "[X -> Y] rebalance");

        let children = get_children(&db, root.id).await?;
        assert_eq!(children.len(), 2);
        let withdrawal = children.iter().find(|t| t.action == Action::Withdrawal).unwrap();
        let deposit = children.iter().find(|t| t.action == Action::Deposit).unwrap();
        assert_eq!(withdrawal.account_id, Some(x.id));
        assert_eq!(deposit.account_id, Some(y.id));
        assert_eq!(withdrawal.amount, 2500);
        assert_eq!(deposit.amount, 2500);
        assert_eq!(withdrawal.date, root.date);
        assert_eq!(withdrawal.parent_id, Some(root.id));
        assert_eq!(deposit.parent_id, Some(root.id));

        commit_transaction(&db, root.id).await?;
        assert_eq!(get_account_by_id(&db, x.id).await?.unwrap().total, 7500);
        assert_eq!(get_account_by_id(&db, y.id).await?.unwrap().total, 2500);

        // Reversing the root flips both children and restores the totals
        set_transaction_active(&db, root.id, false).await?;
        assert_eq!(get_account_by_id(&db, x.id).await?.unwrap().total, 10_000);
        assert_eq!(get_account_by_id(&db, y.id).await?.unwrap().total, 0);
        let children = get_children(&db, root.id).await?;
        assert!(children.iter().all(|t| !t.active));

        // And a transaction can be made active again
        set_transaction_active(&db, root.id, true).await?;
        assert_eq!(get_account_by_id(&db, x.id).await?.unwrap().total, 7500);
        assert_eq!(get_account_by_id(&db, y.id).await?.unwrap().total, 2500);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejects_same_account() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;
        let result = create_transfer(
            &db,
            user.id,
            25.0,
            test_date(),
            account.id,
            account.id,
            "loop",
            false,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_child_toggle_does_not_recurse_upward() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let x = create_test_account(&db, user.id, "X").await?;
        let y = create_test_account(&db, user.id, "Y").await?;
        let root =
            create_transfer(&db, user.id, 10.0, test_date(), y.id, x.id, "move", false).await?;
        commit_transaction(&db, root.id).await?;

        let children = get_children(&db, root.id).await?;
        let deposit = children.iter().find(|t| t.action == Action::Deposit).unwrap();
        set_transaction_active(&db, deposit.id, false).await?;

        // Only the deposit side is reversed
        assert_eq!(get_account_by_id(&db, y.id).await?.unwrap().total, 0);
        assert_eq!(get_account_by_id(&db, x.id).await?.unwrap().total, -1000);
        let root = get_transaction_by_id(&db, root.id).await?.unwrap();
        assert!(root.active);
        let children = get_children(&db, root.id).await?;
        let withdrawal = children.iter().find(|t| t.action == Action::Withdrawal).unwrap();
        assert!(withdrawal.active);
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_consistency_through_toggle_sequences() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;

        let d1 = create_deposit(
            &db,
            user.id,
            100.0,
            test_date(),
            "d1",
            Some(account.id),
            &[],
            false,
        )
        .await?;
        commit_transaction(&db, d1.id).await?;
        let w1 = create_withdrawal(&db, user.id, 30.0, test_date(), "w1", account.id, false)
            .await?;
        commit_transaction(&db, w1.id).await?;

        set_transaction_active(&db, d1.id, false).await?;
        set_transaction_active(&db, d1.id, true).await?;
        set_transaction_active(&db, w1.id, false).await?;

        // total == sum(active deposits) - sum(active withdrawals)
        assert_eq!(
            get_account_by_id(&db, account.id).await?.unwrap().total,
            10_000
        );
        let audits = crate::core::account::recalculate_account_totals(&db, user.id).await?;
        assert!(audits.iter().all(|audit| audit.is_consistent()));
        Ok(())
    }

    #[tokio::test]
    async fn test_range_query_and_account_history() -> Result<()> {
        let (db, user, account) = setup_with_account().await?;
        let early = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let d1 =
            create_deposit(&db, user.id, 10.0, early, "jan", Some(account.id), &[], false).await?;
        commit_transaction(&db, d1.id).await?;
        let d2 =
            create_deposit(&db, user.id, 20.0, late, "mar", Some(account.id), &[], false).await?;
        commit_transaction(&db, d2.id).await?;

        let january = get_transactions_in_range(
            &db,
            user.id,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .await?;
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].id, d1.id);

        let history = get_transactions_for_account(&db, account.id, Some(1)).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, d2.id);
        Ok(())
    }
}
