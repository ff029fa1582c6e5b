// Error handling module
// Defines benchmark error types and echo server response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::CallStatus;

/// Errors that end a benchmark run before or during the call loop
#[derive(Error, Debug)]
pub enum BenchError {
    /// Echo service never became reachable
    #[error("Echo service is not available: timed out after {attempts} attempts")]
    Unavailable { attempts: u32 },

    /// A remote call returned a non-success status
    #[error("Call failed after {completed} completed calls: {status}")]
    CallFailed { status: CallStatus, completed: u64 },

    /// Send type not implemented by the driver
    #[error("Benchmark type={0} not implemented")]
    UnknownSendType(String),

    /// Configuration rejected before any call
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Client construction failed
    #[error("Client error: {0}")]
    Client(#[from] anyhow::Error),
}

/// Errors returned by the echo server handlers
#[derive(Error, Debug)]
pub enum EchoServerError {
    /// Failure injected by the configured error rate
    #[error("Simulated failure")]
    Simulated,
}

impl IntoResponse for EchoServerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match self {
            EchoServerError::Simulated => (StatusCode::INTERNAL_SERVER_ERROR, "simulated_error"),
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;
