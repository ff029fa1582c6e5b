use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::bench::echo_server::{EMPTY_PATH, HEALTH_PATH, TEST_DATA_ARRAY_PATH, TEST_DATA_PATH};
use crate::client::{CallStatus, ClientFactory, EchoClient, EmptyCallback, ReplyCallback};
use crate::error::BenchError;
use crate::models::{TestData, TestDataArray};

/// Timeout for a single availability probe
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// HTTP client for the echo service
///
/// Blocking calls are driven with `Handle::block_on` and must not be made
/// from inside the runtime. Async calls are spawned on the runtime and their
/// callbacks run on its worker threads.
#[derive(Clone)]
pub struct HttpEchoClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Base URL of the echo service
    base_url: String,

    /// Runtime driving requests and callbacks
    handle: Handle,
}

impl HttpEchoClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: impl Into<String>,
        handle: Handle,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(1)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            handle,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn spawn<F, T>(&self, call: F, callback: ReplyCallback<T>)
    where
        F: Future<Output = (CallStatus, T)> + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn(async move {
            let (status, reply) = call.await;
            callback(status, reply);
        });
    }
}

/// Send a prepared JSON request and decode the echoed reply
async fn echo_json<T>(request: RequestBuilder) -> (CallStatus, T)
where
    T: DeserializeOwned + Default,
{
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return (transport_status(&e), T::default()),
    };

    if !response.status().is_success() {
        return (http_failure(response.status()), T::default());
    }

    match response.json::<T>().await {
        Ok(reply) => (CallStatus::Success, reply),
        Err(e) => (
            CallStatus::Failure(format!("invalid reply: {}", e)),
            T::default(),
        ),
    }
}

/// POST without a body and expect an empty success reply
async fn echo_empty(client: Client, url: String) -> CallStatus {
    match client.post(&url).send().await {
        Ok(response) if response.status().is_success() => CallStatus::Success,
        Ok(response) => http_failure(response.status()),
        Err(e) => transport_status(&e),
    }
}

/// Map a reqwest error to a call status
fn transport_status(err: &reqwest::Error) -> CallStatus {
    if err.is_connect() || err.is_timeout() {
        CallStatus::NotAvailable
    } else {
        CallStatus::Failure(err.to_string())
    }
}

fn http_failure(status: reqwest::StatusCode) -> CallStatus {
    CallStatus::Failure(format!("HTTP {}", status.as_u16()))
}

impl EchoClient for HttpEchoClient {
    fn is_available(&self) -> bool {
        let request = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(HEALTH_PROBE_TIMEOUT);

        // send() arms its timer immediately, so it has to run inside the runtime
        match self.handle.block_on(async move { request.send().await }) {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Availability probe failed: {}", e);
                false
            }
        }
    }

    fn get_empty_response(&self) -> CallStatus {
        self.handle
            .block_on(echo_empty(self.client.clone(), self.url(EMPTY_PATH)))
    }

    fn get_empty_response_async(&self, callback: EmptyCallback) {
        let call = echo_empty(self.client.clone(), self.url(EMPTY_PATH));
        self.spawn(
            async move { (call.await, ()) },
            Box::new(move |status, ()| callback(status)),
        );
    }

    fn get_test_data_copy(&self, data: &TestData) -> (CallStatus, TestData) {
        let request = self.client.post(self.url(TEST_DATA_PATH)).json(data);
        self.handle.block_on(echo_json(request))
    }

    fn get_test_data_copy_async(&self, data: TestData, callback: ReplyCallback<TestData>) {
        let request = self.client.post(self.url(TEST_DATA_PATH)).json(&data);
        self.spawn(echo_json(request), callback);
    }

    fn get_test_data_array_copy(&self, data: &TestDataArray) -> (CallStatus, TestDataArray) {
        let request = self.client.post(self.url(TEST_DATA_ARRAY_PATH)).json(data);
        self.handle.block_on(echo_json(request))
    }

    fn get_test_data_array_copy_async(
        &self,
        data: TestDataArray,
        callback: ReplyCallback<TestDataArray>,
    ) {
        let request = self.client.post(self.url(TEST_DATA_ARRAY_PATH)).json(&data);
        self.spawn(echo_json(request), callback);
    }
}

/// Builds one HTTP client per benchmark run
pub struct HttpClientFactory {
    pub base_url: String,
    pub handle: Handle,
    pub connect_timeout: u64,
    pub request_timeout: u64,
}

impl ClientFactory for HttpClientFactory {
    fn build_client(&self) -> Result<Arc<dyn EchoClient>, BenchError> {
        let client = HttpEchoClient::new(
            self.base_url.clone(),
            self.handle.clone(),
            self.connect_timeout,
            self.request_timeout,
        )?;
        Ok(Arc::new(client))
    }
}
