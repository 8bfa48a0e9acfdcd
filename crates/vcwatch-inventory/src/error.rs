//! Error types for vcwatch-inventory

use thiserror::Error;

use vcwatch_client::{ClientError, EntityKind};

/// Errors that can occur during a collection cycle
#[derive(Error, Debug)]
pub enum InventoryError {
    /// A remote client call failed
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Datacenter discovery failed; nothing downstream can run
    #[error("datacenter discovery failed: {0}")]
    Discovery(String),

    /// A per-kind collection task ended abnormally
    #[error("collection task for {kind} failed: {message}")]
    Task {
        /// Entity kind the task was collecting
        kind: EntityKind,
        /// Failure description
        message: String,
    },

    /// A spawned task panicked or was cancelled before completing
    #[error("collection task join failed: {0}")]
    Join(String),
}
