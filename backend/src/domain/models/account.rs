//! Domain model for a bank account. Every user owns exactly one.

/// Account numbers are allocated as `ACCOUNT_NO_BASE + user id`
pub const ACCOUNT_NO_BASE: i64 = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub account_no: i64,
    pub balance: f64,
}

impl Account {
    pub fn account_no_for(user_id: i64) -> i64 {
        ACCOUNT_NO_BASE + user_id
    }
}
