//! Call shapes.
//!
//! Each send type differs only in its payload and in which client operation
//! it invokes. [`CallShape`] captures exactly that, so the blocking loop and
//! the async chain are written once and instantiated per shape.

use super::config::{BenchmarkConfig, SendType};
use crate::client::{CallStatus, EchoClient, ReplyCallback};
use crate::models::{canonical_array, TestData, TestDataArray};

pub trait CallShape: Send + 'static {
    type Payload: Send + 'static;

    const SEND_TYPE: SendType;

    /// Whether the payload is built and copied, i.e. has a construction phase
    const HAS_PAYLOAD: bool;

    /// Build the initial payload for a run
    fn build(config: &BenchmarkConfig) -> Self::Payload;

    /// Copy a reply into the payload for the next call
    fn copy_reply(reply: &Self::Payload) -> Self::Payload;

    /// Issue one blocking call
    fn call(client: &dyn EchoClient, payload: &Self::Payload) -> (CallStatus, Self::Payload);

    /// Issue one async call; `callback` runs on the client's dispatch thread
    fn call_async(
        client: &dyn EchoClient,
        payload: Self::Payload,
        callback: ReplyCallback<Self::Payload>,
    );
}

/// No payload, empty reply
pub struct EmptyCall;

/// Single record echoed back
pub struct CopyCall;

/// Array of records echoed back
pub struct CopiesCall;

impl CallShape for EmptyCall {
    type Payload = ();

    const SEND_TYPE: SendType = SendType::Empty;
    const HAS_PAYLOAD: bool = false;

    fn build(_config: &BenchmarkConfig) -> Self::Payload {}

    fn copy_reply(_reply: &Self::Payload) -> Self::Payload {}

    fn call(client: &dyn EchoClient, _payload: &Self::Payload) -> (CallStatus, Self::Payload) {
        (client.get_empty_response(), ())
    }

    fn call_async(
        client: &dyn EchoClient,
        _payload: Self::Payload,
        callback: ReplyCallback<Self::Payload>,
    ) {
        client.get_empty_response_async(Box::new(move |status| callback(status, ())));
    }
}

impl CallShape for CopyCall {
    type Payload = TestData;

    const SEND_TYPE: SendType = SendType::Copy;
    const HAS_PAYLOAD: bool = true;

    fn build(config: &BenchmarkConfig) -> Self::Payload {
        if config.verbose {
            tracing::info!("Creating TestData struct...");
        }
        TestData::canonical()
    }

    fn copy_reply(reply: &Self::Payload) -> Self::Payload {
        reply.clone()
    }

    fn call(client: &dyn EchoClient, payload: &Self::Payload) -> (CallStatus, Self::Payload) {
        client.get_test_data_copy(payload)
    }

    fn call_async(
        client: &dyn EchoClient,
        payload: Self::Payload,
        callback: ReplyCallback<Self::Payload>,
    ) {
        client.get_test_data_copy_async(payload, callback);
    }
}

impl CallShape for CopiesCall {
    type Payload = TestDataArray;

    const SEND_TYPE: SendType = SendType::Copies;
    const HAS_PAYLOAD: bool = true;

    fn build(config: &BenchmarkConfig) -> Self::Payload {
        if config.verbose {
            tracing::info!("Creating TestDataArray of size={}...", config.array_size);
        }
        canonical_array(config.array_size)
    }

    fn copy_reply(reply: &Self::Payload) -> Self::Payload {
        reply.clone()
    }

    fn call(client: &dyn EchoClient, payload: &Self::Payload) -> (CallStatus, Self::Payload) {
        client.get_test_data_array_copy(payload)
    }

    fn call_async(
        client: &dyn EchoClient,
        payload: Self::Payload,
        callback: ReplyCallback<Self::Payload>,
    ) {
        client.get_test_data_array_copy_async(payload, callback);
    }
}
