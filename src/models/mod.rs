mod account;
mod result;
mod transaction;

pub use account::TransactionsAccount;
pub use result::ScrapingResult;
pub use transaction::{
    Installments, Transaction, TransactionId, TransactionStatus, TransactionType,
};
