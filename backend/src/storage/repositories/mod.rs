// Repository modules
pub mod account_repository;
pub mod book_repository;
pub mod message_repository;
pub mod session_repository;
pub mod transaction_repository;
pub mod user_repository;

// Re-export repository types
pub use account_repository::AccountRepository;
pub use book_repository::BookRepository;
pub use message_repository::MessageRepository;
pub use session_repository::SessionRepository;
pub use transaction_repository::{LoanRequestOutcome, PayLoanOutcome, TransactionRepository};
pub use user_repository::UserRepository;
