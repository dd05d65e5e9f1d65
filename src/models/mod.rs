//! plain data types shared by the transaction builder and its collaborators.
pub mod address;
pub mod amount;
pub mod chain;
pub mod encryption_key;
pub mod fee_strategy;
pub mod gas;
pub mod proved_transaction;
pub mod swap;
pub mod transaction_type;
