pub mod book_mapper;
pub mod transaction_mapper;

pub use book_mapper::BookMapper;
pub use transaction_mapper::TransactionMapper;
