//! Benchmark module for echo service performance testing.
//!
//! This module provides:
//! - Timing aggregation separating payload construction from transport
//! - Benchmark driver with blocking and chained async call loops
//! - HTTP echo server for standalone runs
//! - Report generation

pub mod config;
pub mod echo_server;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod shape;

pub use config::{BenchmarkConfig, EchoServerConfig, SendType};
pub use echo_server::EchoServer;
pub use metrics::{StatsSnapshot, TimingAggregator};
pub use report::BenchmarkReport;
pub use runner::BenchmarkRunner;
