//! Echo service client abstraction.
//!
//! The benchmark driver only talks to the service through [`EchoClient`].
//! Blocking calls return their outcome directly; async calls return at once
//! and invoke their callback exactly once on one of the client's dispatch
//! threads, never inline on the calling thread.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{TestData, TestDataArray};

pub mod loopback;

pub use loopback::{LoopbackEchoClient, LoopbackOptions};

/// Outcome of a single remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    NotAvailable,
    Failure(String),
}

impl CallStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CallStatus::Success)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Success => write!(f, "success"),
            CallStatus::NotAvailable => write!(f, "not available"),
            CallStatus::Failure(reason) => write!(f, "failure ({})", reason),
        }
    }
}

/// Continuation for calls without a reply payload
pub type EmptyCallback = Box<dyn FnOnce(CallStatus) + Send + 'static>;

/// Continuation receiving the call status and the echoed payload.
/// On failure the payload is the type's default value.
pub type ReplyCallback<T> = Box<dyn FnOnce(CallStatus, T) + Send + 'static>;

/// Remote echo service operations
pub trait EchoClient: Send + Sync {
    /// Liveness probe, safe to poll repeatedly
    fn is_available(&self) -> bool;

    fn get_empty_response(&self) -> CallStatus;

    fn get_empty_response_async(&self, callback: EmptyCallback);

    fn get_test_data_copy(&self, data: &TestData) -> (CallStatus, TestData);

    fn get_test_data_copy_async(&self, data: TestData, callback: ReplyCallback<TestData>);

    fn get_test_data_array_copy(&self, data: &TestDataArray) -> (CallStatus, TestDataArray);

    fn get_test_data_array_copy_async(
        &self,
        data: TestDataArray,
        callback: ReplyCallback<TestDataArray>,
    );
}

/// Builds the client handle a benchmark run owns
pub trait ClientFactory: Send + Sync {
    fn build_client(&self) -> Result<Arc<dyn EchoClient>>;
}
