//! Library catalogue and the per-user profile of purchased books.
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub borrowing_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    /// Books the user has bought, as a set ordered by title
    pub saved_books: Vec<Book>,
}

impl Profile {
    pub fn has_book(&self, book_id: i64) -> bool {
        self.saved_books.iter().any(|b| b.id == book_id)
    }
}
