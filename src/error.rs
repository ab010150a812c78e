//! Error types for influxdb3-flight.

use arrow_flight::error::FlightError;
use arrow_schema::ArrowError;
use thiserror::Error;

/// Error type for influxdb3-flight operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Local environment or client configuration is unusable
    /// (e.g. the system trust store cannot be loaded, empty host).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Protocol client construction against the endpoint failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what could not be constructed.
        message: String,
    },

    /// Caller-supplied options are invalid for this call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server rejected a prepare, execute, fetch or close request.
    #[error("Flight {operation} failed: {message}")]
    Remote {
        /// Which step of the query failed.
        operation: &'static str,
        /// Detail reported by the server or transport.
        message: String,
    },

    /// The result stream could not be decoded into record batches.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failed to serialize a query ticket to JSON.
    #[error("Failed to serialize ticket: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an error returned by the Flight SQL client for `operation`.
    pub(crate) fn remote(operation: &'static str, err: ArrowError) -> Self {
        Error::Remote {
            operation,
            message: err.to_string(),
        }
    }

    /// Classify an error coming out of a Flight data stream.
    ///
    /// gRPC status failures are remote; framing and IPC failures are decode errors.
    pub(crate) fn from_flight(operation: &'static str, err: FlightError) -> Self {
        match err {
            FlightError::Tonic(status) => Error::Remote {
                operation,
                message: format!("{:?}: {}", status.code(), status.message()),
            },
            FlightError::DecodeError(message) | FlightError::ProtocolError(message) => {
                Error::Decode(message)
            }
            FlightError::Arrow(e) => Error::Decode(e.to_string()),
            other => Error::Remote {
                operation,
                message: other.to_string(),
            },
        }
    }

    /// Returns true if this error was raised before any remote call was made.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Validation(_) | Error::Serialization(_)
        )
    }
}

/// Result type alias for influxdb3-flight operations.
pub type Result<T> = std::result::Result<T, Error>;
