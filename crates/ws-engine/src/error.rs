//! Error types for publishing measurements

use thiserror::Error;

/// Errors that can occur while handing a record to the storage endpoint
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Request did not complete (connect failure, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with something other than 200
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// Receiving side of a channel publisher is gone
    #[error("publish channel closed")]
    Closed,
}
