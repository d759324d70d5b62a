//! # IO Module
//!
//! The HTTP interface of the library bank. Handlers translate form posts and
//! query strings into domain calls and render the results as HTML pages,
//! redirects or JSON.

pub mod rest;
