use anyhow::{anyhow, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::models::transaction::{format_timestamp, parse_timestamp};
use crate::domain::models::{Book, Profile};
use crate::storage::connection::DbConnection;

/// Repository for the book catalogue and user profiles
#[derive(Clone)]
pub struct BookRepository {
    db: DbConnection,
}

impl BookRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a new book in the catalogue
    pub async fn create_book(&self, title: &str, description: &str, borrowing_price: f64) -> Result<Book> {
        let created_at = Utc::now();
        let created_at_text = format_timestamp(&created_at);
        let id = sqlx::query(
            "INSERT INTO books (title, description, borrowing_price, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(borrowing_price)
        .bind(&created_at_text)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        Ok(Book {
            id,
            title: title.to_string(),
            description: description.to_string(),
            borrowing_price,
            created_at: parse_timestamp(&created_at_text)?,
        })
    }

    /// Get a book by ID
    pub async fn get_book(&self, book_id: i64) -> Result<Option<Book>> {
        let row = sqlx::query(
            "SELECT id, title, description, borrowing_price, created_at FROM books WHERE id = ?",
        )
        .bind(book_id)
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(row_to_book).transpose()
    }

    /// List the whole catalogue ordered by title
    pub async fn list_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, description, borrowing_price, created_at FROM books ORDER BY title ASC, id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(row_to_book).collect()
    }

    /// Get a user's profile with their saved books
    pub async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT id FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let profile_id: i64 = row.try_get("id")?;

        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.description, b.borrowing_price, b.created_at
            FROM books b
            JOIN profile_saved_books s ON s.book_id = b.id
            WHERE s.profile_id = ?
            ORDER BY b.title ASC, b.id ASC
            "#,
        )
        .bind(profile_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(Some(Profile {
            id: profile_id,
            user_id,
            saved_books: rows.iter().map(row_to_book).collect::<Result<Vec<_>>>()?,
        }))
    }

    /// Get a user's profile, creating an empty one if it doesn't exist yet
    pub async fn get_or_create_profile(&self, user_id: i64) -> Result<Profile> {
        sqlx::query("INSERT OR IGNORE INTO profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| anyhow!("Profile for user {} vanished after creation", user_id))
    }
}

fn row_to_book(row: &SqliteRow) -> Result<Book> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        borrowing_price: row.try_get("borrowing_price")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
