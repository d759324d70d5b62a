use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::Account;
use crate::storage::connection::DbConnection;

/// Repository for account lookups. Balance changes go through
/// `TransactionRepository` so they are always paired with a ledger row.
#[derive(Clone)]
pub struct AccountRepository {
    db: DbConnection,
}

impl AccountRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: i64) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, user_id, account_no, balance FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(row_to_account).transpose()
    }

    /// Get the account owned by a user
    pub async fn get_by_user(&self, user_id: i64) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, user_id, account_no, balance FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(row_to_account).transpose()
    }
}

pub(crate) fn row_to_account(row: &SqliteRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_no: row.try_get("account_no")?,
        balance: row.try_get("balance")?,
    })
}
