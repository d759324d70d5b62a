use thiserror::Error;

/// Refusals and failures raised by the domain services.
///
/// The messages are shown to the user as-is, so they read like form errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The submitted form could not be parsed
    #[error("{0}")]
    InvalidForm(String),

    #[error("You need to deposit at least {min} $")]
    DepositBelowMinimum { min: f64 },

    #[error("You can withdraw at least {min} $")]
    WithdrawalBelowMinimum { min: f64 },

    #[error("You can withdraw at most {max} $")]
    WithdrawalAboveMaximum { max: f64 },

    #[error("You have {balance:.2} $ in your account. You can not withdraw more than your account balance")]
    InsufficientFunds { balance: f64 },

    #[error("You have crossed the loan limits")]
    LoanLimitReached { limit: i64 },

    #[error("Loan amount is greater than available balance")]
    LoanExceedsBalance { balance: f64 },

    #[error("Loan has not been approved yet")]
    LoanNotApproved,

    #[error("A user with that username already exists.")]
    UsernameTaken,

    #[error("{0}")]
    InvalidRegistration(String),

    #[error("Please enter a correct username and password.")]
    InvalidCredentials,

    /// A report date that is not `YYYY-MM-DD`
    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Errors that should be shown on the submitted form rather than as an error page
    pub fn is_form_error(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidForm(_)
                | DomainError::DepositBelowMinimum { .. }
                | DomainError::WithdrawalBelowMinimum { .. }
                | DomainError::WithdrawalAboveMaximum { .. }
                | DomainError::InsufficientFunds { .. }
                | DomainError::UsernameTaken
                | DomainError::InvalidRegistration(_)
                | DomainError::InvalidCredentials
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_messages_match_form_wording() {
        assert_eq!(
            DomainError::DepositBelowMinimum { min: 100.0 }.to_string(),
            "You need to deposit at least 100 $"
        );
        assert_eq!(
            DomainError::WithdrawalAboveMaximum { max: 20000.0 }.to_string(),
            "You can withdraw at most 20000 $"
        );
        assert_eq!(
            DomainError::InsufficientFunds { balance: 42.5 }.to_string(),
            "You have 42.50 $ in your account. You can not withdraw more than your account balance"
        );
    }

    #[test]
    fn test_form_error_classification() {
        assert!(DomainError::InvalidForm("bad".into()).is_form_error());
        assert!(DomainError::InsufficientFunds { balance: 1.0 }.is_form_error());
        assert!(!DomainError::LoanLimitReached { limit: 3 }.is_form_error());
        assert!(!DomainError::not_found("Book").is_form_error());
        assert!(!DomainError::Storage(anyhow::anyhow!("disk")).is_form_error());
    }
}
