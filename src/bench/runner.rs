//! Benchmark driver.
//!
//! A run waits for the echo service, then drives `send_count` round trips
//! either in a blocking loop on the calling thread or as a chain of async
//! continuations on the client's dispatch threads. In chained mode the
//! aggregator travels with the chain and comes back through a one-shot
//! completion signal, which is the only thing [`BenchmarkRunner::run`]
//! blocks on.

use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::config::{BenchmarkConfig, SendType};
use super::metrics::{StatsSnapshot, TimingAggregator};
use super::shape::{CallShape, CopiesCall, CopyCall, EmptyCall};
use crate::client::{CallStatus, ClientFactory, EchoClient};
use crate::error::{BenchError, Result};

/// Benchmark runner that drives calls against the echo service
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    factory: Box<dyn ClientFactory>,
    stats: TimingAggregator,
}

impl BenchmarkRunner {
    /// Create a new benchmark runner
    pub fn new(config: BenchmarkConfig, factory: impl ClientFactory + 'static) -> Self {
        let stats = fresh_stats(&config);
        Self {
            config,
            factory: Box::new(factory),
            stats,
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Statistics of the last run
    pub fn stats(&self) -> &TimingAggregator {
        &self.stats
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run the benchmark; true when every call succeeded.
    ///
    /// Blocks the calling thread until the run is over, so it must not be
    /// called from inside an async task.
    pub fn run(&mut self) -> bool {
        match self.try_run() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Benchmark failed: {}", e);
                false
            }
        }
    }

    /// Run the benchmark, reporting why it failed
    pub fn try_run(&mut self) -> Result<()> {
        self.config.validate()?;

        let client = self.factory.build_client()?;
        self.wait_for_service(client.as_ref())?;

        self.log_boundary("begin");
        self.stats.reset();

        let status = match (self.config.send_type, self.config.async_mode) {
            (SendType::Empty, false) => self.run_blocking::<EmptyCall>(client.as_ref()),
            (SendType::Empty, true) => self.run_chained::<EmptyCall>(&client),
            (SendType::Copy, false) => self.run_blocking::<CopyCall>(client.as_ref()),
            (SendType::Copy, true) => self.run_chained::<CopyCall>(&client),
            (SendType::Copies, false) => self.run_blocking::<CopiesCall>(client.as_ref()),
            (SendType::Copies, true) => self.run_chained::<CopiesCall>(&client),
        };

        self.log_boundary("end");
        self.stats.stop();
        drop(client);

        if status.is_success() {
            Ok(())
        } else {
            Err(BenchError::CallFailed {
                status,
                completed: self.stats.completed_count(),
            })
        }
    }

    /// Poll the service until it answers or the attempts run out
    fn wait_for_service(&self, client: &dyn EchoClient) -> Result<()> {
        let attempts = self.config.availability_attempts;
        tracing::info!("Waiting for echo service ({} attempts)...", attempts);

        for _ in 0..attempts {
            if client.is_available() {
                return Ok(());
            }
            std::thread::sleep(self.config.availability_interval);
        }

        if client.is_available() {
            return Ok(());
        }

        tracing::error!("Echo service is not available: timed out waiting!");
        Err(BenchError::Unavailable { attempts })
    }

    fn log_boundary(&self, edge: &str) {
        if self.config.verbose {
            tracing::info!(
                "Benchmark {}: type={}, mode={}, count={}",
                edge,
                self.config.send_type,
                self.config.mode(),
                self.config.send_count
            );
        } else {
            tracing::debug!("Benchmark {}: type={}", edge, self.config.send_type);
        }
    }

    fn build_payload<S: CallShape>(&mut self) -> S::Payload {
        if !S::HAS_PAYLOAD {
            return S::build(&self.config);
        }
        self.stats.start_construction();
        let payload = S::build(&self.config);
        self.stats.stop_construction();
        payload
    }

    fn run_blocking<S: CallShape>(&mut self, client: &dyn EchoClient) -> CallStatus {
        tracing::debug!("Driving {} calls in a blocking loop", S::SEND_TYPE);
        let mut payload = self.build_payload::<S>();
        let mut status = CallStatus::NotAvailable;

        for _ in 0..self.config.send_count {
            self.stats.start_transport();
            let (outcome, reply) = S::call(client, &payload);
            status = outcome;

            if !status.is_success() {
                self.stats.cancel_transport();
                tracing::warn!(
                    "Call {} returned {}",
                    self.stats.completed_count() + 1,
                    status
                );
                break;
            }
            self.stats.stop_transport();

            if S::HAS_PAYLOAD {
                self.stats.start_construction();
                payload = S::copy_reply(&reply);
                self.stats.stop_construction();
            }

            self.stats.add_completed_call();
        }

        status
    }

    fn run_chained<S: CallShape>(&mut self, client: &Arc<dyn EchoClient>) -> CallStatus {
        tracing::debug!("Driving {} calls as an async chain", S::SEND_TYPE);
        let payload = self.build_payload::<S>();
        let (done_tx, done_rx) = oneshot::channel();

        let stats = std::mem::take(&mut self.stats);
        Chain::<S>::new(Arc::clone(client), self.config.send_count, stats, done_tx).issue(payload);

        match done_rx.blocking_recv() {
            Ok(done) => {
                self.stats = done.stats;
                done.status
            }
            Err(_) => {
                // Chain resolves from Drop, so only a torn-down runtime gets here
                self.stats = fresh_stats(&self.config);
                CallStatus::Failure("run completion signal dropped".to_string())
            }
        }
    }
}

fn fresh_stats(config: &BenchmarkConfig) -> TimingAggregator {
    TimingAggregator::new(config.name.clone(), config.send_count, config.verbose)
}

/// Value delivered by the completion signal
struct ChainDone {
    status: CallStatus,
    stats: TimingAggregator,
}

/// State of an async call chain, moved into every continuation it registers.
///
/// The completion sender is consumed by the first resolution. A chain
/// dropped before resolving (the client discarded its callback) resolves
/// from `Drop`, so the waiting run never hangs on a lost continuation.
struct Chain<S: CallShape> {
    client: Arc<dyn EchoClient>,
    target: u64,
    stats: TimingAggregator,
    done: Option<oneshot::Sender<ChainDone>>,
    _shape: PhantomData<S>,
}

impl<S: CallShape> Chain<S> {
    fn new(
        client: Arc<dyn EchoClient>,
        target: u64,
        stats: TimingAggregator,
        done: oneshot::Sender<ChainDone>,
    ) -> Self {
        Self {
            client,
            target,
            stats,
            done: Some(done),
            _shape: PhantomData,
        }
    }

    /// Start transport and hand the chain to the next call's continuation
    fn issue(mut self, payload: S::Payload) {
        self.stats.start_transport();
        let client = Arc::clone(&self.client);
        S::call_async(
            client.as_ref(),
            payload,
            Box::new(move |status, reply| self.on_reply(status, reply)),
        );
    }

    fn on_reply(mut self, status: CallStatus, reply: S::Payload) {
        if !status.is_success() {
            self.stats.cancel_transport();
            tracing::warn!(
                "Call {} returned {}",
                self.stats.completed_count() + 1,
                status
            );
            self.resolve(status);
            return;
        }

        self.stats.stop_transport();
        self.stats.add_completed_call();

        let next = if S::HAS_PAYLOAD {
            self.stats.start_construction();
            let next = S::copy_reply(&reply);
            self.stats.stop_construction();
            next
        } else {
            S::copy_reply(&reply)
        };
        drop(reply);

        if self.stats.completed_count() < self.target {
            self.issue(next);
        } else {
            self.resolve(status);
        }
    }

    fn resolve(&mut self, status: CallStatus) {
        if let Some(done) = self.done.take() {
            let stats = std::mem::take(&mut self.stats);
            let _ = done.send(ChainDone { status, stats });
        }
    }
}

impl<S: CallShape> Drop for Chain<S> {
    fn drop(&mut self) {
        if self.done.is_some() {
            tracing::warn!("Async call chain dropped before its reply arrived");
            self.stats.stop();
            self.resolve(CallStatus::Failure(
                "continuation dropped before completion".to_string(),
            ));
        }
    }
}
