//! # BookBank Backend
//!
//! A small library bank: users deposit and withdraw money, request loans that
//! staff approve, and spend their balance on books.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (axum handlers, HTML pages, JSON API)
//!     ↓
//! Domain Layer (services, form rules, notification email)
//!     ↓
//! Storage Layer (SQLite repositories)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod logging;
pub mod storage;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{
    AccountService, BookService, LogMailer, MessageService, SmtpMailer, TransactionMailer, TransactionService,
};
use crate::io::rest::{account_apis, book_apis, transaction_apis};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub transaction_service: TransactionService,
    pub book_service: BookService,
    pub message_service: MessageService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: DbConnection, config: AppConfig, mailer: Arc<dyn TransactionMailer>) -> Self {
        Self {
            account_service: AccountService::new(db.clone(), config.auth.clone()),
            transaction_service: TransactionService::new(db.clone(), config.limits.clone(), mailer.clone()),
            book_service: BookService::new(db.clone(), mailer),
            message_service: MessageService::new(db),
            config: Arc::new(config),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: AppConfig) -> Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(&config.database.url, config.database.max_connections).await?;

    info!("Setting up email");
    let mailer: Arc<dyn TransactionMailer> = if config.email.enabled {
        Arc::new(SmtpMailer::new(&config.email)?)
    } else {
        info!("Email notifications disabled");
        Arc::new(LogMailer)
    };

    info!("Setting up application state");
    let state = AppState::new(db, config, mailer);
    state.account_service.purge_expired_sessions().await?;
    Ok(state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/transactions", get(transaction_apis::report_json))
        .route("/books", get(book_apis::books_json));

    Router::new()
        .route("/", get(account_apis::index))
        .route(
            "/accounts/register",
            get(account_apis::register_form).post(account_apis::register),
        )
        .route("/accounts/login", get(account_apis::login_form).post(account_apis::login))
        .route("/accounts/logout", post(account_apis::logout))
        .route(
            "/transactions/deposit",
            get(transaction_apis::deposit_form).post(transaction_apis::deposit),
        )
        .route(
            "/transactions/withdraw",
            get(transaction_apis::withdraw_form).post(transaction_apis::withdraw),
        )
        .route(
            "/transactions/loan_request",
            get(transaction_apis::loan_request_form).post(transaction_apis::loan_request),
        )
        .route("/transactions/report", get(transaction_apis::report))
        .route("/transactions/loans", get(transaction_apis::loans))
        .route("/transactions/loans/:id/pay", post(transaction_apis::pay_loan))
        .route("/transactions/loans/:id/approve", post(transaction_apis::approve_loan))
        .route("/transactions/buy_now/:book_id", post(book_apis::buy_now))
        .route("/books", get(book_apis::list_books).post(book_apis::create_book))
        .route("/profile", get(book_apis::profile))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
