//! In-process echo client.
//!
//! Echoes payloads without leaving the process. Async replies are delivered
//! from tasks spawned on a tokio runtime, so continuations run on the
//! runtime's worker threads the same way they do for the HTTP client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::{CallStatus, ClientFactory, EchoClient, EmptyCallback, ReplyCallback};
use crate::error::Result;
use crate::models::{TestData, TestDataArray};

/// Behaviour of a loopback client
#[derive(Debug, Clone)]
pub struct LoopbackOptions {
    /// Simulated round-trip latency per call
    pub latency: Duration,
    /// Number of failed probes before the service reports available (None = never)
    pub available_after: Option<u64>,
    /// 1-based index of the call that returns `failure`
    pub fail_at: Option<u64>,
    /// Status returned by the failing call
    pub failure: CallStatus,
}

impl Default for LoopbackOptions {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            available_after: Some(0),
            fail_at: None,
            failure: CallStatus::Failure("injected failure".to_string()),
        }
    }
}

struct Inner {
    dispatcher: Handle,
    options: LoopbackOptions,
    probes: AtomicU64,
    calls: AtomicU64,
}

impl Inner {
    fn next_status(&self) -> CallStatus {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.options.fail_at == Some(call) {
            tracing::debug!("Injecting {} at call {}", self.options.failure, call);
            self.options.failure.clone()
        } else {
            CallStatus::Success
        }
    }

    fn echo<T: Clone + Default>(&self, payload: &T) -> (CallStatus, T) {
        let status = self.next_status();
        if status.is_success() {
            (status, payload.clone())
        } else {
            (status, T::default())
        }
    }
}

/// Echo client answering from the current process
#[derive(Clone)]
pub struct LoopbackEchoClient {
    inner: Arc<Inner>,
}

impl LoopbackEchoClient {
    /// Create a client dispatching async replies on `dispatcher`
    pub fn new(dispatcher: Handle, options: LoopbackOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                options,
                probes: AtomicU64::new(0),
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Number of calls issued so far, including failed ones
    pub fn calls_made(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Number of availability probes so far
    pub fn probes_made(&self) -> u64 {
        self.inner.probes.load(Ordering::SeqCst)
    }

    fn blocking_echo<T: Clone + Default>(&self, payload: &T) -> (CallStatus, T) {
        if !self.inner.options.latency.is_zero() {
            std::thread::sleep(self.inner.options.latency);
        }
        self.inner.echo(payload)
    }

    fn dispatch<T>(&self, payload: T, callback: ReplyCallback<T>)
    where
        T: Clone + Default + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.inner.dispatcher.spawn(async move {
            if !inner.options.latency.is_zero() {
                tokio::time::sleep(inner.options.latency).await;
            }
            let (status, reply) = inner.echo(&payload);
            callback(status, reply);
        });
    }
}

impl EchoClient for LoopbackEchoClient {
    fn is_available(&self) -> bool {
        let probe = self.inner.probes.fetch_add(1, Ordering::SeqCst);
        match self.inner.options.available_after {
            Some(threshold) => probe >= threshold,
            None => false,
        }
    }

    fn get_empty_response(&self) -> CallStatus {
        self.blocking_echo(&()).0
    }

    fn get_empty_response_async(&self, callback: EmptyCallback) {
        self.dispatch((), Box::new(move |status, ()| callback(status)));
    }

    fn get_test_data_copy(&self, data: &TestData) -> (CallStatus, TestData) {
        self.blocking_echo(data)
    }

    fn get_test_data_copy_async(&self, data: TestData, callback: ReplyCallback<TestData>) {
        self.dispatch(data, callback);
    }

    fn get_test_data_array_copy(&self, data: &TestDataArray) -> (CallStatus, TestDataArray) {
        self.blocking_echo(data)
    }

    fn get_test_data_array_copy_async(
        &self,
        data: TestDataArray,
        callback: ReplyCallback<TestDataArray>,
    ) {
        self.dispatch(data, callback);
    }
}

impl ClientFactory for LoopbackEchoClient {
    fn build_client(&self) -> Result<Arc<dyn EchoClient>> {
        Ok(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn test_available_after_probes() {
        let rt = runtime();
        let client = LoopbackEchoClient::new(
            rt.handle().clone(),
            LoopbackOptions {
                available_after: Some(2),
                ..Default::default()
            },
        );

        assert!(!client.is_available());
        assert!(!client.is_available());
        assert!(client.is_available());
        assert_eq!(client.probes_made(), 3);
    }

    #[test]
    fn test_never_available() {
        let rt = runtime();
        let client = LoopbackEchoClient::new(
            rt.handle().clone(),
            LoopbackOptions {
                available_after: None,
                ..Default::default()
            },
        );

        assert!((0..20).all(|_| !client.is_available()));
    }

    #[test]
    fn test_blocking_echo_and_failure_injection() {
        let rt = runtime();
        let client = LoopbackEchoClient::new(
            rt.handle().clone(),
            LoopbackOptions {
                fail_at: Some(2),
                ..Default::default()
            },
        );

        let data = TestData::canonical();
        let (status, reply) = client.get_test_data_copy(&data);
        assert_eq!(status, CallStatus::Success);
        assert_eq!(reply, data);

        let (status, reply) = client.get_test_data_copy(&data);
        assert_eq!(status, CallStatus::Failure("injected failure".to_string()));
        assert_eq!(reply, TestData::default());

        assert_eq!(client.get_empty_response(), CallStatus::Success);
        assert_eq!(client.calls_made(), 3);
    }

    #[test]
    fn test_async_reply_on_dispatch_thread() {
        let rt = runtime();
        let client = LoopbackEchoClient::new(rt.handle().clone(), LoopbackOptions::default());
        let (tx, rx) = oneshot::channel();
        let caller = std::thread::current().id();

        client.get_test_data_array_copy_async(
            crate::models::canonical_array(3),
            Box::new(move |status, reply| {
                let _ = tx.send((status, reply.len(), std::thread::current().id()));
            }),
        );

        let (status, len, thread) = rx.blocking_recv().unwrap();
        assert_eq!(status, CallStatus::Success);
        assert_eq!(len, 3);
        assert_ne!(thread, caller);
    }
}
