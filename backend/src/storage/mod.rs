//! # Storage Module
//!
//! Handles all data persistence for the library bank.
//!
//! ## Key Responsibilities
//!
//! - **Connection Management**: SQLite pool creation and schema bootstrap
//! - **Repositories**: One repository per aggregate (users, accounts,
//!   transactions, books, sessions, flash messages)
//! - **Atomic Postings**: Balance changes and the ledger row that records them
//!   are written in a single database transaction
//!
//! Repositories return `anyhow::Result`; the domain layer decides which
//! failures are user-facing.

pub mod connection;
pub mod repositories;

pub use connection::DbConnection;
pub use repositories::{
    AccountRepository, BookRepository, LoanRequestOutcome, MessageRepository, PayLoanOutcome,
    SessionRepository, TransactionRepository, UserRepository,
};

#[cfg(test)]
pub mod test_utils;
