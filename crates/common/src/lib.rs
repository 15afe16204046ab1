//! Common types for the ledger workspace
//!
//! This crate defines:
//! - Transaction IDs (UUID-backed, totally ordered by bytes)
//! - Collision-free transaction ID generation from a replica seed
//! - The read/write classification shared by contract operations

mod operation;
mod transaction_id;

pub use operation::Operation;
pub use operation::OperationType;
pub use transaction_id::TransactionId;
pub use transaction_id::TransactionIdGenerator;
