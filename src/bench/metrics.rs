//! Timing aggregation for benchmark runs.
//!
//! A run is split into two disjoint phases per call: construction (building
//! or copying the payload) and transport (waiting for the round trip). Each
//! phase is bracketed by a start/stop pair; the two never overlap and a phase
//! must be stopped before it is started again. Breaking that discipline is a
//! bug in the caller and panics instead of corrupting the totals.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Upper bound for recorded transport latencies (10 minutes, in microseconds)
const MAX_TRACKED_LATENCY_US: u64 = 600_000_000;

/// Accumulates construction and transport time across a run
pub struct TimingAggregator {
    name: String,
    target_calls: u64,
    verbose: bool,
    run_start: Option<Instant>,
    run_end: Option<Instant>,
    construction_total: Duration,
    transport_total: Duration,
    completed: u64,
    construction_started: Option<Instant>,
    transport_started: Option<Instant>,
    /// Per-call transport latency (microseconds)
    transport_histogram: Histogram<u64>,
}

impl TimingAggregator {
    /// Create an aggregator for a run of `target_calls` round trips
    pub fn new(name: impl Into<String>, target_calls: u64, verbose: bool) -> Self {
        Self {
            name: name.into(),
            target_calls,
            verbose,
            run_start: None,
            run_end: None,
            construction_total: Duration::ZERO,
            transport_total: Duration::ZERO,
            completed: 0,
            construction_started: None,
            transport_started: None,
            // 3 significant figures, same bounds for every run
            transport_histogram: Histogram::new_with_bounds(1, MAX_TRACKED_LATENCY_US, 3)
                .expect("static histogram bounds are valid"),
        }
    }

    /// Clear all accumulators and mark the start of a run
    pub fn reset(&mut self) {
        self.construction_total = Duration::ZERO;
        self.transport_total = Duration::ZERO;
        self.completed = 0;
        self.construction_started = None;
        self.transport_started = None;
        self.transport_histogram.reset();
        self.run_end = None;
        self.run_start = Some(Instant::now());
    }

    pub fn start_construction(&mut self) {
        assert!(
            self.construction_started.is_none(),
            "start_construction called while construction is already open"
        );
        assert!(
            self.transport_started.is_none(),
            "start_construction called while transport is open"
        );
        self.construction_started = Some(Instant::now());
    }

    pub fn stop_construction(&mut self) {
        let Some(started) = self.construction_started.take() else {
            panic!("stop_construction called without a matching start_construction");
        };
        self.construction_total += started.elapsed();
    }

    pub fn start_transport(&mut self) {
        assert!(
            self.transport_started.is_none(),
            "start_transport called while transport is already open"
        );
        assert!(
            self.construction_started.is_none(),
            "start_transport called while construction is open"
        );
        self.transport_started = Some(Instant::now());
    }

    pub fn stop_transport(&mut self) {
        let Some(started) = self.transport_started.take() else {
            panic!("stop_transport called without a matching start_transport");
        };
        let delta = started.elapsed();
        self.transport_total += delta;
        let _ = self
            .transport_histogram
            .record((delta.as_micros() as u64).max(1));
    }

    /// Close the open transport phase of a failed call without accounting it
    pub fn cancel_transport(&mut self) {
        if self.transport_started.take().is_none() {
            panic!("cancel_transport called without a matching start_transport");
        }
    }

    /// Count one successful round trip
    pub fn add_completed_call(&mut self) {
        self.completed += 1;

        let step = self.target_calls / 10;
        if self.verbose && step > 0 && self.completed % step == 0 {
            tracing::info!(
                "{}: {}/{} calls completed",
                self.name,
                self.completed,
                self.target_calls
            );
        }
    }

    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Mark the end of the run; open phases are discarded
    pub fn stop(&mut self) {
        self.construction_started = None;
        self.transport_started = None;
        self.run_end = Some(Instant::now());
    }

    /// Wall time of the run
    pub fn elapsed(&self) -> Duration {
        match (self.run_start, self.run_end) {
            (Some(s), Some(e)) => e.duration_since(s),
            (Some(s), None) => s.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn construction_time(&self) -> Duration {
        self.construction_total
    }

    pub fn transport_time(&self) -> Duration {
        self.transport_total
    }

    /// Completed calls per second of wall time
    pub fn calls_per_second(&self) -> f64 {
        rate(self.completed, self.elapsed())
    }

    /// Completed calls per second of transport time only
    pub fn transport_calls_per_second(&self) -> f64 {
        rate(self.completed, self.transport_total)
    }

    /// Get transport latency percentile in milliseconds
    pub fn transport_percentile(&self, percentile: f64) -> f64 {
        self.transport_histogram.value_at_percentile(percentile) as f64 / 1000.0
    }

    /// Create a snapshot of current statistics
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            name: self.name.clone(),
            target_calls: self.target_calls,
            completed_calls: self.completed,
            elapsed_secs: self.elapsed().as_secs_f64(),
            construction_ms: self.construction_total.as_secs_f64() * 1000.0,
            transport_ms: self.transport_total.as_secs_f64() * 1000.0,
            calls_per_second: self.calls_per_second(),
            transport_calls_per_second: self.transport_calls_per_second(),
            transport_mean_ms: self.transport_histogram.mean() / 1000.0,
            transport_p50_ms: self.transport_percentile(50.0),
            transport_p95_ms: self.transport_percentile(95.0),
            transport_p99_ms: self.transport_percentile(99.0),
        }
    }
}

impl Default for TimingAggregator {
    fn default() -> Self {
        Self::new("ECHO", 0, false)
    }
}

fn rate(count: u64, over: Duration) -> f64 {
    let secs = over.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    count as f64 / secs
}

/// Statistics of a run at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub name: String,
    pub target_calls: u64,
    pub completed_calls: u64,
    pub elapsed_secs: f64,
    pub construction_ms: f64,
    pub transport_ms: f64,
    pub calls_per_second: f64,
    pub transport_calls_per_second: f64,
    pub transport_mean_ms: f64,
    pub transport_p50_ms: f64,
    pub transport_p95_ms: f64,
    pub transport_p99_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn one_call(stats: &mut TimingAggregator) {
        stats.start_transport();
        std::thread::sleep(Duration::from_millis(1));
        stats.stop_transport();
        stats.start_construction();
        stats.stop_construction();
        stats.add_completed_call();
    }

    #[test]
    fn test_timing_aggregator() {
        let mut stats = TimingAggregator::new("TEST", 3, false);
        stats.reset();

        for _ in 0..3 {
            one_call(&mut stats);
        }
        stats.stop();

        assert_eq!(stats.completed_count(), 3);
        assert!(stats.transport_time() >= Duration::from_millis(3));
        assert!(stats.elapsed() >= stats.transport_time());
        assert!(stats.transport_percentile(50.0) >= 1.0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.name, "TEST");
        assert_eq!(snapshot.completed_calls, 3);
        assert!(snapshot.calls_per_second > 0.0);
        assert!(snapshot.transport_calls_per_second >= snapshot.calls_per_second);
    }

    #[test]
    fn test_reset_twice_matches_reset_once() {
        let mut once = TimingAggregator::new("TEST", 5, false);
        one_call(&mut once);
        once.reset();

        let mut twice = TimingAggregator::new("TEST", 5, false);
        one_call(&mut twice);
        twice.reset();
        twice.reset();

        assert_eq!(once.completed_count(), twice.completed_count());
        assert_eq!(once.construction_time(), twice.construction_time());
        assert_eq!(once.transport_time(), twice.transport_time());
        assert_eq!(twice.completed_count(), 0);
        assert_eq!(twice.transport_time(), Duration::ZERO);
        assert_eq!(twice.transport_percentile(99.0), 0.0);
    }

    #[test]
    fn test_failed_call_is_not_accounted() {
        let mut stats = TimingAggregator::new("TEST", 1, false);
        stats.reset();
        stats.start_transport();
        stats.cancel_transport();
        stats.stop();

        assert_eq!(stats.completed_count(), 0);
        assert_eq!(stats.transport_time(), Duration::ZERO);
        assert_eq!(stats.transport_calls_per_second(), 0.0);
    }

    #[test]
    fn test_stop_discards_open_phase() {
        let mut stats = TimingAggregator::new("TEST", 1, false);
        stats.reset();
        stats.start_transport();
        stats.stop();

        assert_eq!(stats.transport_time(), Duration::ZERO);
        // A new run can start transport again
        stats.reset();
        stats.start_transport();
        stats.stop_transport();
    }

    #[test]
    fn test_elapsed_is_stable_after_stop() {
        let mut stats = TimingAggregator::default();
        assert_eq!(stats.elapsed(), Duration::ZERO);
        stats.reset();
        stats.stop();
        let first = stats.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(stats.elapsed(), first);
    }

    #[test]
    #[should_panic(expected = "without a matching start_transport")]
    fn test_unbalanced_stop_transport_panics() {
        let mut stats = TimingAggregator::default();
        stats.reset();
        stats.stop_transport();
    }

    #[test]
    #[should_panic(expected = "without a matching start_construction")]
    fn test_unbalanced_stop_construction_panics() {
        let mut stats = TimingAggregator::default();
        stats.stop_construction();
    }

    #[test]
    #[should_panic(expected = "already open")]
    fn test_double_start_panics() {
        let mut stats = TimingAggregator::default();
        stats.start_construction();
        stats.start_construction();
    }

    #[test]
    #[should_panic(expected = "while construction is open")]
    fn test_overlapping_phases_panic() {
        let mut stats = TimingAggregator::default();
        stats.start_construction();
        stats.start_transport();
    }

    proptest! {
        #[test]
        fn prop_completed_count_matches_balanced_calls(calls in 0u64..200, copies in any::<bool>()) {
            let mut stats = TimingAggregator::new("PROP", calls, false);
            stats.reset();
            for _ in 0..calls {
                stats.start_transport();
                stats.stop_transport();
                if copies {
                    stats.start_construction();
                    stats.stop_construction();
                }
                stats.add_completed_call();
            }
            stats.stop();

            prop_assert_eq!(stats.completed_count(), calls);
            prop_assert!(stats.construction_time() + stats.transport_time() <= stats.elapsed());
            if !copies {
                prop_assert_eq!(stats.construction_time(), Duration::ZERO);
            }
        }
    }
}
