//! Core business logic - framework-agnostic ledger operations.
//!
//! The money codec and allocation engine are pure; everything else operates
//! over a SeaORM connection supplied by the caller.

/// Account ledger operations - creation, lookup, balance maintenance
pub mod account;
/// Deposit-allocation engine - splits a gross amount across accounts
pub mod allocation;
/// Money codec - decimal dollars to and from integer minor units
pub mod money;
/// Reconfiguration checker - percentage invariants for whole-account actions
pub mod reconfigure;
/// Activity reports over a date range
pub mod report;
/// Transaction ledger - deposits, withdrawals, transfers, reversal
pub mod transaction;
/// User operations - creation, lookup, login recording
pub mod user;
