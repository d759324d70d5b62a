//! Domain model for a ledger transaction.
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

pub use shared::TransactionType;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    /// Always positive; `transaction_type` carries the direction
    pub amount: f64,
    pub balance_after_transaction: f64,
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
    pub loan_approve: bool,
}

impl Transaction {
    pub fn is_pending_loan(&self) -> bool {
        self.transaction_type == TransactionType::Loan && !self.loan_approve
    }

    pub fn is_approved_loan(&self) -> bool {
        self.transaction_type == TransactionType::Loan && self.loan_approve
    }
}

/// A ledger row that has not been written yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub account_id: i64,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub timestamp: DateTime<Utc>,
}

impl NewTransaction {
    pub fn new(account_id: i64, amount: f64, transaction_type: TransactionType) -> Self {
        Self {
            account_id,
            amount,
            transaction_type,
            // Stored with whole-second precision
            timestamp: Utc::now().trunc_subsecs(0),
        }
    }

    /// Signed effect of this entry on the account balance
    pub fn balance_delta(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Deposit => self.amount,
            TransactionType::Withdrawal
            | TransactionType::LoanPaid
            | TransactionType::BorrowBook => -self.amount,
            // A loan request only moves money once approved
            TransactionType::Loan => 0.0,
        }
    }
}

/// Timestamps are stored as RFC 3339 text so SQLite's `date()` can read them
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_balance_delta_follows_transaction_type() {
        let deposit = NewTransaction::new(1, 250.0, TransactionType::Deposit);
        assert_eq!(deposit.balance_delta(), 250.0);

        let withdrawal = NewTransaction::new(1, 600.0, TransactionType::Withdrawal);
        assert_eq!(withdrawal.balance_delta(), -600.0);

        let book = NewTransaction::new(1, 12.5, TransactionType::BorrowBook);
        assert_eq!(book.balance_delta(), -12.5);

        let loan = NewTransaction::new(1, 1000.0, TransactionType::Loan);
        assert_eq!(loan.balance_delta(), 0.0);
    }

    #[test]
    fn test_new_transaction_timestamp_survives_storage_format() {
        let new = NewTransaction::new(1, 100.0, TransactionType::Deposit);
        assert_eq!(new.timestamp.timestamp_subsec_nanos(), 0);
        let stored = format_timestamp(&new.timestamp);
        assert_eq!(parse_timestamp(&stored).unwrap(), new.timestamp);
    }

    #[test]
    fn test_timestamp_text_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-03-09T14:05:00Z");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }
}
