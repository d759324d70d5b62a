use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of ledger entry. The numeric codes are stable: they are stored in the
/// database and exposed in the JSON API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TransactionType {
    /// Money added to the account
    Deposit,
    /// Money taken out of the account
    Withdrawal,
    /// Loan request (credited only once approved)
    Loan,
    /// Loan that has been paid back
    LoanPaid,
    /// Book bought from the library
    BorrowBook,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Loan,
        TransactionType::LoanPaid,
        TransactionType::BorrowBook,
    ];

    pub fn code(self) -> i64 {
        match self {
            TransactionType::Deposit => 1,
            TransactionType::Withdrawal => 2,
            TransactionType::Loan => 3,
            TransactionType::LoanPaid => 4,
            TransactionType::BorrowBook => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Human-readable label used in reports
    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Loan => "Loan",
            TransactionType::LoanPaid => "Loan Paid",
            TransactionType::BorrowBook => "Borrow Book",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<TransactionType> for i64 {
    fn from(value: TransactionType) -> Self {
        value.code()
    }
}

impl TryFrom<i64> for TransactionType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("Unknown transaction type code: {}", code))
    }
}

/// Transaction as exposed over the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_no: i64,
    /// Always positive; the type tells the direction
    pub amount: f64,
    /// Account balance right after this transaction
    pub balance_after_transaction: f64,
    pub transaction_type: TransactionType,
    /// RFC 3339 timestamp in UTC
    pub timestamp: String,
    pub loan_approve: bool,
}

/// Body of the deposit, withdraw and loan request forms.
///
/// The amount is kept as the raw string the user typed so that the domain
/// layer can report parse errors back on the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountForm {
    #[serde(default)]
    pub amount: String,
}

/// Query string of the transaction report. Dates use `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionReportRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReportResponse {
    pub account_no: i64,
    /// Current balance, or the sum of the filtered amounts when a date range is given
    pub balance: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub borrowing_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateBookForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub borrowing_price: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Severity of a one-shot flash message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Error,
}

impl MessageLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageLevel::Info => "info",
            MessageLevel::Success => "success",
            MessageLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "success" => MessageLevel::Success,
            "error" => MessageLevel::Error,
            _ => MessageLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: MessageLevel,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_codes_are_stable() {
        assert_eq!(TransactionType::Deposit.code(), 1);
        assert_eq!(TransactionType::Withdrawal.code(), 2);
        assert_eq!(TransactionType::Loan.code(), 3);
        assert_eq!(TransactionType::LoanPaid.code(), 4);
        assert_eq!(TransactionType::BorrowBook.code(), 5);
        assert_eq!(TransactionType::from_code(9), None);
    }

    #[test]
    fn test_transaction_type_serializes_as_code() {
        let json = serde_json::to_string(&TransactionType::Loan).unwrap();
        assert_eq!(json, "3");

        let parsed: TransactionType = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, TransactionType::LoanPaid);
        assert!(serde_json::from_str::<TransactionType>("42").is_err());
    }

    #[test]
    fn test_message_level_parse_defaults_to_info() {
        assert_eq!(MessageLevel::parse("success"), MessageLevel::Success);
        assert_eq!(MessageLevel::parse("error"), MessageLevel::Error);
        assert_eq!(MessageLevel::parse("whatever"), MessageLevel::Info);
    }
}
