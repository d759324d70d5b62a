//! Fixtures shared by the storage and domain tests.
use chrono::{Duration, Utc};

use crate::domain::models::{Account, Book, NewTransaction, NewUser, Session, TransactionType, User};
use crate::storage::{BookRepository, DbConnection, SessionRepository, TransactionRepository, UserRepository};

/// Register a user (with account and profile). Password hashes are fake.
pub async fn seed_user(db: &DbConnection, username: &str) -> User {
    seed_account(db, username, 0.0).await.0
}

/// Register a user and fund their account with `balance`
pub async fn seed_account(db: &DbConnection, username: &str, balance: f64) -> (User, Account) {
    let new_user = NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: "fixture".to_string(),
        first_name: username.to_string(),
        last_name: String::new(),
        is_staff: false,
    };
    let (user, mut account) = UserRepository::new(db.clone())
        .create_user(&new_user)
        .await
        .expect("Failed to seed user");

    if balance > 0.0 {
        let posted = TransactionRepository::new(db.clone())
            .post_transaction(&NewTransaction::new(account.id, balance, TransactionType::Deposit))
            .await
            .expect("Failed to fund account")
            .expect("Deposit rejected");
        account.balance = posted.balance_after_transaction;
    }

    (user, account)
}

pub async fn seed_book(db: &DbConnection, title: &str, price: f64) -> Book {
    BookRepository::new(db.clone())
        .create_book(title, "", price)
        .await
        .expect("Failed to seed book")
}

/// Register a user and open a session for them, returning the token
pub async fn seed_session(db: &DbConnection, username: &str) -> String {
    let user = seed_user(db, username).await;
    let now = Utc::now();
    let session = Session {
        token: format!("token-{}", username),
        user_id: user.id,
        created_at: now,
        expires_at: now + Duration::hours(1),
    };
    SessionRepository::new(db.clone())
        .store_session(&session)
        .await
        .expect("Failed to seed session");
    session.token
}
