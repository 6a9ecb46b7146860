//! Error types for device detection and exchange

use thiserror::Error;
use ws_protocol::{Command, ParseError};

/// Why a single command/response attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    /// The serial line could not be opened
    #[error("open failed: {0}")]
    Open(String),

    /// Read or write on the open line failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Nothing arrived before the read timeout
    #[error("no reply")]
    NoReply,

    /// A reply arrived but did not have the expected shape
    #[error("malformed reply {0:?}")]
    Malformed(String),
}

/// Errors that can occur during detection and device exchange
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// Serial device could not be opened
    #[error("port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// Retries exhausted without a valid reply
    #[error("no valid {command} reply from {port} after {attempts} attempt(s): {last}")]
    ProtocolTimeout {
        port: String,
        command: Command,
        attempts: u32,
        last: AttemptFailure,
    },

    /// A reply arrived but could not be parsed
    #[error("malformed reply from {port}: {source}")]
    MalformedResponse {
        port: String,
        #[source]
        source: ParseError,
    },

    /// I/O error on an open line
    #[error("I/O error on {port}: {reason}")]
    Io { port: String, reason: String },

    /// Discovery finished without identifying a scale
    #[error("no scale found among {0} probed port(s)")]
    NoScaleFound(usize),
}
