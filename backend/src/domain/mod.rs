//! # Domain Module
//!
//! Business logic of the library bank: accounts and sessions, the ledger
//! (deposits, withdrawals, loans, reports), the book catalogue with its
//! buy-now flow, notification email and flash messages.
//!
//! Services own their repositories and are cheap to clone; the REST layer
//! holds them in the shared application state.
//!
//! ## Business Rules
//!
//! - Deposits are at least `limits.min_deposit`
//! - Withdrawals stay within the configured limits and never exceed the balance
//! - A loan request only moves money once a staff member approves it
//! - No more loan requests are taken once `limits.max_approved_loans` loans are approved
//! - Balances never go negative

pub mod account_service;
pub mod book_service;
pub mod commands;
pub mod email_service;
pub mod errors;
pub mod message_service;
pub mod models;
pub mod transaction_forms;
pub mod transaction_service;

pub use account_service::AccountService;
pub use book_service::BookService;
pub use email_service::{EmailTemplate, LogMailer, SmtpMailer, TransactionMailer};
pub use errors::{DomainError, DomainResult};
pub use message_service::MessageService;
pub use transaction_forms::{format_amount, parse_amount, TransactionForms};
pub use transaction_service::TransactionService;
