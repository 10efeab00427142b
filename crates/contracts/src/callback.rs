//! OutputCallback trait - host application output interface
//!
//! Defines the abstract interface for per-kind output handlers.

use crate::{ContractError, OutputRecord};

/// Host-side output handler
///
/// A session holds at most one callback per output kind.
pub trait OutputCallback {
    /// Callback name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Receive one record
    ///
    /// The record borrows from the dispatch call; copy whatever must outlive it.
    ///
    /// # Errors
    /// Returns write error (should include context). The router logs it and moves on.
    fn deliver(&mut self, record: &OutputRecord<'_>) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
