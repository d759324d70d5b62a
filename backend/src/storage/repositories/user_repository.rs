use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::transaction::{format_timestamp, parse_timestamp};
use crate::domain::models::{Account, NewUser, User};
use crate::storage::connection::DbConnection;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_staff, date_joined";

/// Repository for user operations
#[derive(Clone)]
pub struct UserRepository {
    db: DbConnection,
}

impl UserRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Create a user together with their account and (empty) profile.
    ///
    /// All three rows are written in one database transaction.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<(User, Account)> {
        let date_joined = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, is_staff, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.is_staff)
        .bind(format_timestamp(&date_joined))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let account_no = Account::account_no_for(user_id);
        let account_id = sqlx::query("INSERT INTO accounts (user_id, account_no, balance) VALUES (?, ?, 0)")
            .bind(user_id)
            .bind(account_no)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("INSERT INTO profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let user = User {
            id: user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            is_staff: new_user.is_staff,
            // Stored with second precision
            date_joined: parse_timestamp(&format_timestamp(&date_joined))?,
        };
        let account = Account {
            id: account_id,
            user_id,
            account_no,
            balance: 0.0,
        };
        Ok((user, account))
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    /// Look up a user and their password hash for login
    pub async fn find_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        let sql = format!("SELECT {}, password_hash FROM users WHERE username = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(r) => Ok(Some((row_to_user(&r)?, r.try_get("password_hash")?))),
            None => Ok(None),
        }
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let date_joined: String = row.try_get("date_joined")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_staff: row.try_get("is_staff")?,
        date_joined: parse_timestamp(&date_joined)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AccountRepository, BookRepository};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "not-a-real-hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "Reader".to_string(),
            is_staff: false,
        }
    }

    #[tokio::test]
    async fn test_create_user_creates_account_and_profile() {
        let db = DbConnection::init_test().await.unwrap();
        let repo = UserRepository::new(db.clone());

        let (user, account) = repo.create_user(&new_user("mira")).await.unwrap();
        assert_eq!(account.user_id, user.id);
        assert_eq!(account.account_no, 100_000 + user.id);
        assert_eq!(account.balance, 0.0);

        let stored = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored, user);

        let stored_account = AccountRepository::new(db.clone()).get_by_user(user.id).await.unwrap();
        assert_eq!(stored_account, Some(account));

        let profile = BookRepository::new(db).get_profile(user.id).await.unwrap();
        assert!(profile.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected_by_schema() {
        let db = DbConnection::init_test().await.unwrap();
        let repo = UserRepository::new(db);

        repo.create_user(&new_user("nora")).await.unwrap();
        assert!(repo.username_exists("nora").await.unwrap());
        assert!(repo.create_user(&new_user("nora")).await.is_err());
    }

    #[tokio::test]
    async fn test_find_credentials() {
        let db = DbConnection::init_test().await.unwrap();
        let repo = UserRepository::new(db);
        repo.create_user(&new_user("otto")).await.unwrap();

        let (user, hash) = repo.find_credentials("otto").await.unwrap().unwrap();
        assert_eq!(user.username, "otto");
        assert_eq!(hash, "not-a-real-hash");
        assert!(repo.find_credentials("nobody").await.unwrap().is_none());
    }
}
