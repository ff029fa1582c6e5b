//! Echo server answering the benchmark's HTTP calls.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use super::config::EchoServerConfig;
use crate::error::EchoServerError;
use crate::models::{TestData, TestDataArray};

pub const HEALTH_PATH: &str = "/health";
pub const EMPTY_PATH: &str = "/echo/empty";
pub const TEST_DATA_PATH: &str = "/echo/test-data";
pub const TEST_DATA_ARRAY_PATH: &str = "/echo/test-data-array";

/// HTTP echo service for benchmarking
pub struct EchoServer {
    config: EchoServerConfig,
    shutdown_tx: Option<oneshot::Sender<()>>,
    port: u16,
}

impl EchoServer {
    /// Create a new echo server with the given configuration
    pub fn new(config: EchoServerConfig) -> Self {
        Self {
            config,
            shutdown_tx: None,
            port: 0,
        }
    }

    /// Start the server in the background and return the actual port
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("127.0.0.1:{}", self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        self.port = port;

        let app = router(self.config.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        tracing::info!("Echo server listening on http://127.0.0.1:{}", port);
        Ok(port)
    }

    /// Get the server's port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the server's URL
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the echo routes
pub fn router(config: EchoServerConfig) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handle_health))
        .route(EMPTY_PATH, post(handle_empty))
        .route(TEST_DATA_PATH, post(handle_test_data))
        .route(TEST_DATA_ARRAY_PATH, post(handle_test_data_array))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(config))
}

async fn handle_health() -> StatusCode {
    StatusCode::OK
}

async fn handle_empty(State(config): State<Arc<EchoServerConfig>>) -> Response {
    match simulate(&config).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_test_data(
    State(config): State<Arc<EchoServerConfig>>,
    Json(data): Json<TestData>,
) -> Result<Json<TestData>, EchoServerError> {
    simulate(&config).await?;
    Ok(Json(data))
}

async fn handle_test_data_array(
    State(config): State<Arc<EchoServerConfig>>,
    Json(data): Json<TestDataArray>,
) -> Result<Json<TestDataArray>, EchoServerError> {
    simulate(&config).await?;
    Ok(Json(data))
}

/// Apply configured latency and random failures
async fn simulate(config: &EchoServerConfig) -> Result<(), EchoServerError> {
    if config.latency_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.latency_ms)).await;
    }

    if config.error_rate > 0.0 {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < config.error_rate {
            tracing::debug!("Simulating echo failure");
            return Err(EchoServerError::Simulated);
        }
    }

    Ok(())
}
