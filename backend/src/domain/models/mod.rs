pub mod account;
pub mod book;
pub mod session;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use book::{Book, Profile};
pub use session::Session;
pub use transaction::{NewTransaction, Transaction, TransactionType};
pub use user::{NewUser, User};
