use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::models::book::Book;
use crate::domain::models::transaction::{
    format_timestamp, parse_timestamp, NewTransaction, Transaction, TransactionType,
};
use crate::storage::connection::DbConnection;

const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount, balance_after_transaction, transaction_type, timestamp, loan_approve";

/// Result of recording a loan request
#[derive(Debug, Clone, PartialEq)]
pub enum LoanRequestOutcome {
    Recorded(Transaction),
    /// The account already holds `approved` approved loans
    LimitReached { approved: i64 },
}

/// Result of paying back a loan
#[derive(Debug, Clone, PartialEq)]
pub enum PayLoanOutcome {
    Paid(Transaction),
    NotFound,
    NotApproved,
    InsufficientBalance { balance: f64 },
}

/// Repository for ledger operations.
///
/// Every method that moves money updates the account balance and writes the
/// ledger row inside one database transaction, so concurrent requests cannot
/// lose updates or overdraw an account.
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Apply a deposit, withdrawal or purchase to the account and record it.
    ///
    /// Returns `None` when the posting would make the balance negative.
    pub async fn post_transaction(&self, new: &NewTransaction) -> Result<Option<Transaction>> {
        let mut tx = self.db.pool().begin().await?;
        let posted = apply_posting(&mut *tx, new).await?;
        if posted.is_some() {
            tx.commit().await?;
        }
        Ok(posted)
    }

    /// Record a loan request unless the account already has `max_approved_loans`
    /// approved loans. The limit check and the insert are a single statement.
    pub async fn request_loan(
        &self,
        new: &NewTransaction,
        max_approved_loans: i64,
    ) -> Result<LoanRequestOutcome> {
        if new.transaction_type != TransactionType::Loan {
            return Err(anyhow!("Loan request recorded with type {}", new.transaction_type));
        }

        let sql = format!(
            r#"
            INSERT INTO transactions
                (account_id, amount, balance_after_transaction, transaction_type, timestamp, loan_approve)
            SELECT a.id, ?, a.balance, ?, ?, 0
            FROM accounts a
            WHERE a.id = ?
              AND (SELECT COUNT(*) FROM transactions t
                   WHERE t.account_id = a.id AND t.transaction_type = ? AND t.loan_approve = 1) < ?
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        );
        let inserted = sqlx::query(&sql)
            .bind(new.amount)
            .bind(TransactionType::Loan.code())
            .bind(format_timestamp(&new.timestamp))
            .bind(new.account_id)
            .bind(TransactionType::Loan.code())
            .bind(max_approved_loans)
            .fetch_optional(self.db.pool())
            .await?;

        if let Some(row) = inserted {
            return Ok(LoanRequestOutcome::Recorded(row_to_transaction(&row)?));
        }

        let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = ?")
            .bind(new.account_id)
            .fetch_optional(self.db.pool())
            .await?
            .is_some();
        if !exists {
            return Err(anyhow!("Account not found: {}", new.account_id));
        }
        let approved = self.count_approved_loans(new.account_id).await?;
        Ok(LoanRequestOutcome::LimitReached { approved })
    }

    /// Count the approved, not yet paid loans of an account
    pub async fn count_approved_loans(&self, account_id: i64) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS approved
            FROM transactions
            WHERE account_id = ? AND transaction_type = ? AND loan_approve = 1
            "#,
        )
        .bind(account_id)
        .bind(TransactionType::Loan.code())
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.try_get("approved")?)
    }

    /// List an account's transactions in chronological order, optionally
    /// restricted to an inclusive range of calendar dates
    pub async fn list_for_account(
        &self,
        account_id: i64,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {} FROM transactions WHERE account_id = ?", TRANSACTION_COLUMNS);
        if range.is_some() {
            sql.push_str(" AND date(timestamp) BETWEEN ? AND ?");
        }
        sql.push_str(" ORDER BY timestamp ASC, id ASC");

        let mut query = sqlx::query(&sql).bind(account_id);
        if let Some((start, end)) = range {
            query = query.bind(date_param(start)).bind(date_param(end));
        }

        let rows = query.fetch_all(self.db.pool()).await?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// Sum of the amounts of an account's transactions within a date range
    pub async fn sum_amount(&self, account_id: i64, start: NaiveDate, end: NaiveDate) -> Result<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0.0) AS total
            FROM transactions
            WHERE account_id = ? AND date(timestamp) BETWEEN ? AND ?
            "#,
        )
        .bind(account_id)
        .bind(date_param(start))
        .bind(date_param(end))
        .fetch_one(self.db.pool())
        .await?;

        Ok(row.try_get("total")?)
    }

    /// Loans (approved or pending) of an account, oldest first
    pub async fn list_loans(&self, account_id: i64) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE account_id = ? AND transaction_type = ? ORDER BY timestamp ASC, id ASC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(TransactionType::Loan.code())
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// Loans of every account still waiting for approval, oldest first
    pub async fn list_pending_loans(&self) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE transaction_type = ? AND loan_approve = 0 ORDER BY timestamp ASC, id ASC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(TransactionType::Loan.code())
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(row_to_transaction).collect()
    }

    /// Get a transaction by ID
    pub async fn get_transaction(&self, transaction_id: i64) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(transaction_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    /// Approve a pending loan and credit its amount to the borrowing account.
    ///
    /// Returns `None` if the transaction is not a pending loan. The loan row is
    /// flipped first so two approvals of the same loan cannot both credit it.
    pub async fn approve_loan(&self, loan_id: i64) -> Result<Option<Transaction>> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            "UPDATE transactions SET loan_approve = 1 WHERE id = ? AND transaction_type = ? AND loan_approve = 0 RETURNING {}",
            TRANSACTION_COLUMNS
        );
        let loan = match sqlx::query(&sql)
            .bind(loan_id)
            .bind(TransactionType::Loan.code())
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(row) => row_to_transaction(&row)?,
            None => return Ok(None),
        };

        let balance: f64 = sqlx::query(
            "UPDATE accounts SET balance = ROUND(balance + ?, 2) WHERE id = ? RETURNING balance",
        )
        .bind(loan.amount)
        .bind(loan.account_id)
        .fetch_one(&mut *tx)
        .await?
        .try_get("balance")?;

        sqlx::query("UPDATE transactions SET balance_after_transaction = ? WHERE id = ?")
            .bind(balance)
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(Transaction {
            balance_after_transaction: balance,
            ..loan
        }))
    }

    /// Pay back an approved loan from the account balance.
    ///
    /// The loan row is converted into a `LoanPaid` entry. Payment requires the
    /// balance to be strictly greater than the loan amount; otherwise the
    /// transaction is rolled back.
    pub async fn pay_loan(&self, account_id: i64, loan_id: i64) -> Result<PayLoanOutcome> {
        let mut tx = self.db.pool().begin().await?;

        let sql = format!(
            r#"
            UPDATE transactions SET transaction_type = ?
            WHERE id = ? AND account_id = ? AND transaction_type = ? AND loan_approve = 1
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        );
        let loan = match sqlx::query(&sql)
            .bind(TransactionType::LoanPaid.code())
            .bind(loan_id)
            .bind(account_id)
            .bind(TransactionType::Loan.code())
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(row) => row_to_transaction(&row)?,
            None => {
                let pending = sqlx::query(
                    "SELECT 1 FROM transactions WHERE id = ? AND account_id = ? AND transaction_type = ?",
                )
                .bind(loan_id)
                .bind(account_id)
                .bind(TransactionType::Loan.code())
                .fetch_optional(&mut *tx)
                .await?;
                return Ok(match pending {
                    Some(_) => PayLoanOutcome::NotApproved,
                    None => PayLoanOutcome::NotFound,
                });
            }
        };

        let updated = sqlx::query(
            "UPDATE accounts SET balance = ROUND(balance - ?, 2) WHERE id = ? AND balance > ? RETURNING balance",
        )
        .bind(loan.amount)
        .bind(account_id)
        .bind(loan.amount)
        .fetch_optional(&mut *tx)
        .await?;

        let balance: f64 = match updated {
            Some(row) => row.try_get("balance")?,
            None => {
                let balance: f64 = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
                    .bind(account_id)
                    .fetch_one(&mut *tx)
                    .await?
                    .try_get("balance")?;
                tx.rollback().await?;
                return Ok(PayLoanOutcome::InsufficientBalance { balance });
            }
        };

        sqlx::query("UPDATE transactions SET balance_after_transaction = ? WHERE id = ?")
            .bind(balance)
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PayLoanOutcome::Paid(Transaction {
            balance_after_transaction: balance,
            ..loan
        }))
    }

    /// Charge the borrowing price of a book and add it to the buyer's profile.
    ///
    /// Returns `None` (and changes nothing) when the balance is too low.
    pub async fn purchase_book(
        &self,
        account_id: i64,
        profile_id: i64,
        book: &Book,
    ) -> Result<Option<Transaction>> {
        let new = NewTransaction::new(account_id, book.borrowing_price, TransactionType::BorrowBook);

        let mut tx = self.db.pool().begin().await?;
        let Some(transaction) = apply_posting(&mut *tx, &new).await? else {
            return Ok(None);
        };

        sqlx::query("INSERT OR IGNORE INTO profile_saved_books (profile_id, book_id) VALUES (?, ?)")
            .bind(profile_id)
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(transaction))
    }
}

/// Conditionally move the balance and insert the ledger row on an open connection
async fn apply_posting(
    conn: &mut SqliteConnection,
    new: &NewTransaction,
) -> Result<Option<Transaction>> {
    let delta = new.balance_delta();

    let updated = sqlx::query(
        r#"
        UPDATE accounts
        SET balance = ROUND(balance + ?, 2)
        WHERE id = ? AND ROUND(balance + ?, 2) >= 0
        RETURNING balance
        "#,
    )
    .bind(delta)
    .bind(new.account_id)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?;

    let balance: f64 = match updated {
        Some(row) => row.try_get("balance")?,
        None => {
            let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = ?")
                .bind(new.account_id)
                .fetch_optional(&mut *conn)
                .await?
                .is_some();
            if !exists {
                return Err(anyhow!("Account not found: {}", new.account_id));
            }
            return Ok(None);
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO transactions
            (account_id, amount, balance_after_transaction, transaction_type, timestamp, loan_approve)
        VALUES (?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(new.account_id)
    .bind(new.amount)
    .bind(balance)
    .bind(new.transaction_type.code())
    .bind(format_timestamp(&new.timestamp))
    .execute(&mut *conn)
    .await?;

    Ok(Some(Transaction {
        id: result.last_insert_rowid(),
        account_id: new.account_id,
        amount: new.amount,
        balance_after_transaction: balance,
        transaction_type: new.transaction_type,
        timestamp: new.timestamp,
        loan_approve: false,
    }))
}

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let code: i64 = row.try_get("transaction_type")?;
    let transaction_type = TransactionType::from_code(code)
        .ok_or_else(|| anyhow!("Unknown transaction type code {}", code))?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        balance_after_transaction: row.try_get("balance_after_transaction")?,
        transaction_type,
        timestamp: parse_timestamp(&timestamp)?,
        loan_approve: row.try_get("loan_approve")?,
    })
}
