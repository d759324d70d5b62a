//! Domain-level command and result types.
//!
//! These are used by the services and are not exposed directly: the REST layer
//! maps the form DTOs from the `shared` crate into commands and renders the
//! results as pages or JSON.

pub mod accounts {
    use crate::domain::models::{Account, User};

    /// Input for registering a new user
    #[derive(Debug, Clone, Default)]
    pub struct RegisterCommand {
        pub username: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub password: String,
        pub confirm_password: String,
    }

    /// A logged-in user together with their account
    #[derive(Debug, Clone, PartialEq)]
    pub struct AccountHolder {
        pub user: User,
        pub account: Account,
    }
}

pub mod transactions {
    use chrono::NaiveDate;

    use crate::domain::models::{Account, Transaction};

    /// A recorded transaction plus the message shown to the user
    #[derive(Debug, Clone)]
    pub struct TransactionReceipt {
        pub transaction: Transaction,
        pub success_message: String,
    }

    /// Raw report filters as typed into the report form
    #[derive(Debug, Clone, Default)]
    pub struct ReportQuery {
        pub start_date: Option<String>,
        pub end_date: Option<String>,
    }

    /// Result of the transaction report.
    ///
    /// When a date range was applied `balance` is the sum of the listed
    /// amounts, otherwise it is the current account balance.
    #[derive(Debug, Clone)]
    pub struct TransactionReport {
        pub account: Account,
        pub balance: f64,
        pub range: Option<(NaiveDate, NaiveDate)>,
        pub transactions: Vec<Transaction>,
    }
}

pub mod books {
    use crate::domain::models::{Account, Profile, Transaction};

    /// Input for adding a book to the catalogue
    #[derive(Debug, Clone, Default)]
    pub struct CreateBookCommand {
        pub title: String,
        pub description: String,
        pub borrowing_price: String,
    }

    #[derive(Debug, Clone)]
    pub enum PurchaseOutcome {
        Purchased { transaction: Transaction, message: String },
        InsufficientBalance { message: String },
    }

    impl PurchaseOutcome {
        pub fn message(&self) -> &str {
            match self {
                PurchaseOutcome::Purchased { message, .. } => message,
                PurchaseOutcome::InsufficientBalance { message } => message,
            }
        }
    }

    /// Everything the profile page shows
    #[derive(Debug, Clone)]
    pub struct ProfileView {
        pub account: Account,
        pub profile: Profile,
    }
}
