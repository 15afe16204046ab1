//! Contract operation traits

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Type of operation - read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Read operation - does not modify ledger state
    Read,
    /// Write operation - stages writes that must be committed
    Write,
}

/// Trait for operations that are executed inside a single transaction context
pub trait Operation:
    serde::de::DeserializeOwned + serde::Serialize + Send + Sync + Debug + Clone + PartialEq + Eq
{
    /// Get the type of this operation (read or write)
    fn operation_type(&self) -> OperationType;

    /// Stable operation name as seen by the dispatch layer
    fn name(&self) -> &'static str;

    /// Convert this operation to a JSON value for logging
    fn as_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
