//! Transaction form handling for the library bank.
//!
//! This module owns amount parsing, the deposit/withdraw limits and the
//! user-facing money formatting. Handlers only pass the raw form strings in and
//! render whatever errors come back.

use std::fmt;

use crate::config::TransactionLimits;
use crate::domain::errors::{DomainError, DomainResult};

/// Why an amount typed into a form was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum AmountFormError {
    Empty,
    InvalidFormat(String),
    NotPositive,
    TooManyDecimalPlaces,
}

impl fmt::Display for AmountFormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountFormError::Empty => write!(f, "This field is required."),
            AmountFormError::InvalidFormat(input) => write!(f, "Enter a number. ({:?} is not a valid amount)", input),
            AmountFormError::NotPositive => write!(f, "Amount must be greater than 0"),
            AmountFormError::TooManyDecimalPlaces => {
                write!(f, "Ensure that there are no more than 2 decimal places.")
            }
        }
    }
}

impl From<AmountFormError> for DomainError {
    fn from(error: AmountFormError) -> Self {
        DomainError::InvalidForm(error.to_string())
    }
}

/// Clean and parse an amount typed by the user.
///
/// Currency symbols, thousands separators and spaces are ignored. At most two
/// decimal places are accepted.
pub fn parse_amount(input: &str) -> Result<f64, AmountFormError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    if cleaned.is_empty() {
        return Err(AmountFormError::Empty);
    }

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| AmountFormError::InvalidFormat(input.trim().to_string()))?;

    if !amount.is_finite() {
        return Err(AmountFormError::InvalidFormat(input.trim().to_string()));
    }
    if amount <= 0.0 {
        return Err(AmountFormError::NotPositive);
    }
    if has_too_many_decimal_places(amount) {
        return Err(AmountFormError::TooManyDecimalPlaces);
    }

    Ok(amount)
}

fn has_too_many_decimal_places(amount: f64) -> bool {
    let cents = amount * 100.0;
    (cents - cents.round()).abs() > 1e-6
}

/// Form rules for the three amount forms
#[derive(Debug, Clone)]
pub struct TransactionForms {
    limits: TransactionLimits,
}

impl TransactionForms {
    pub fn new(limits: TransactionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &TransactionLimits {
        &self.limits
    }

    pub fn validate_deposit(&self, amount: f64) -> DomainResult<f64> {
        if amount < self.limits.min_deposit {
            return Err(DomainError::DepositBelowMinimum {
                min: self.limits.min_deposit,
            });
        }
        Ok(amount)
    }

    /// Check the withdrawal limits and the available balance
    pub fn validate_withdraw(&self, amount: f64, balance: f64) -> DomainResult<f64> {
        if amount < self.limits.min_withdraw {
            return Err(DomainError::WithdrawalBelowMinimum {
                min: self.limits.min_withdraw,
            });
        }
        if amount > self.limits.max_withdraw {
            return Err(DomainError::WithdrawalAboveMaximum {
                max: self.limits.max_withdraw,
            });
        }
        if amount > balance {
            return Err(DomainError::InsufficientFunds { balance });
        }
        Ok(amount)
    }
}

/// Format an amount with thousands separators and two decimals: `1,234.50`
pub fn format_amount(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
