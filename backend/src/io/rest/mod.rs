//! # REST Interface Layer
//!
//! HTML form endpoints plus a small JSON API under `/api`.
//!
//! - Successful form posts answer with a 303 redirect and queue a flash message
//! - Form errors re-render the form with HTTP 200
//! - Other refusals are plain-text 400/403/404 responses (see `error`)
//! - Pages that need a user take the `CurrentUser` extractor, which redirects
//!   anonymous visitors to the login page

pub mod account_apis;
pub mod auth;
pub mod book_apis;
pub mod error;
pub mod mappers;
pub mod pages;
pub mod transaction_apis;

#[cfg(test)]
pub mod test_utils;

pub use auth::CurrentUser;
pub use error::AppError;

pub const LOGIN_PATH: &str = "/accounts/login";
pub const LOGOUT_PATH: &str = "/accounts/logout";
pub const REGISTER_PATH: &str = "/accounts/register";
pub const REPORT_PATH: &str = "/transactions/report";
pub const LOANS_PATH: &str = "/transactions/loans";
pub const BOOKS_PATH: &str = "/books";
pub const PROFILE_PATH: &str = "/profile";
