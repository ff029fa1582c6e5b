//! Report generation for benchmark results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::{BenchmarkConfig, SendType};
use super::metrics::StatsSnapshot;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub host: String,
    pub send_type: SendType,
    pub mode: String,
    pub array_size: usize,
    pub success: bool,
    pub stats: StatsSnapshot,
}

impl BenchmarkReport {
    /// Create a report from a finished run
    pub fn new(config: &BenchmarkConfig, success: bool, stats: StatsSnapshot) -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            host,
            send_type: config.send_type,
            mode: config.mode().to_string(),
            array_size: config.array_size,
            success,
            stats,
        }
    }

    /// Mean construction time per completed call in microseconds
    pub fn construction_per_call_us(&self) -> f64 {
        per_call_us(self.stats.construction_ms, self.stats.completed_calls)
    }

    /// Mean transport time per completed call in microseconds
    pub fn transport_per_call_us(&self) -> f64 {
        per_call_us(self.stats.transport_ms, self.stats.completed_calls)
    }

    /// Print the report as an ASCII table
    pub fn print_table(&self) {
        let s = &self.stats;
        println!();
        println!("╔══════════════════════════════════════════════════════════════════╗");
        println!("║ {:<64} ║", format!("{} BENCHMARK RESULTS", s.name));
        println!("╚══════════════════════════════════════════════════════════════════╝");
        println!();
        println!("  Run:           {}", self.run_id);
        println!("  Host:          {}", self.host);
        println!(
            "  Type:          {} ({}), array size {}",
            self.send_type, self.mode, self.array_size
        );
        println!(
            "  Calls:         {}/{} completed",
            s.completed_calls, s.target_calls
        );
        println!("  Result:        {}", if self.success { "OK" } else { "FAILED" });
        println!();
        println!("┌──────────────┬──────────────┬──────────────┬──────────────┐");
        println!("│ Phase        │   Total(ms)  │ Per call(us) │  Calls/sec   │");
        println!("├──────────────┼──────────────┼──────────────┼──────────────┤");
        println!(
            "│ Construction │ {:>12.3} │ {:>12.2} │ {:>12} │",
            s.construction_ms,
            self.construction_per_call_us(),
            "-"
        );
        println!(
            "│ Transport    │ {:>12.3} │ {:>12.2} │ {:>12.1} │",
            s.transport_ms,
            self.transport_per_call_us(),
            s.transport_calls_per_second
        );
        println!(
            "│ Wall time    │ {:>12.3} │ {:>12} │ {:>12.1} │",
            s.elapsed_secs * 1000.0,
            "-",
            s.calls_per_second
        );
        println!("└──────────────┴──────────────┴──────────────┴──────────────┘");
        println!();
        println!(
            "Transport latency: mean {:.3}ms, p50 {:.3}ms, p95 {:.3}ms, p99 {:.3}ms",
            s.transport_mean_ms, s.transport_p50_ms, s.transport_p95_ms, s.transport_p99_ms
        );
        println!();
    }

    /// Export the report as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Print a compact summary
    pub fn print_summary(&self) {
        println!("\n=== Benchmark Summary ===");
        println!(
            "{} {}: {} of {} calls, {:.1} calls/sec ({})",
            self.send_type,
            self.mode,
            self.stats.completed_calls,
            self.stats.target_calls,
            self.stats.calls_per_second,
            if self.success { "ok" } else { "failed" }
        );
    }
}

fn per_call_us(total_ms: f64, calls: u64) -> f64 {
    if calls == 0 {
        return 0.0;
    }
    total_ms * 1000.0 / calls as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            name: "ECHO".to_string(),
            target_calls: 100,
            completed_calls: 100,
            elapsed_secs: 0.5,
            construction_ms: 2.0,
            transport_ms: 400.0,
            calls_per_second: 200.0,
            transport_calls_per_second: 250.0,
            transport_mean_ms: 4.0,
            transport_p50_ms: 3.9,
            transport_p95_ms: 5.1,
            transport_p99_ms: 6.3,
        }
    }

    #[test]
    fn test_report_generation() {
        let config = BenchmarkConfig {
            send_type: SendType::Copies,
            async_mode: true,
            array_size: 10,
            ..Default::default()
        };

        let report = BenchmarkReport::new(&config, true, snapshot());

        assert_eq!(report.mode, "async");
        assert_eq!(report.send_type, SendType::Copies);
        assert!((report.transport_per_call_us() - 4000.0).abs() < 0.01);
        assert!((report.construction_per_call_us() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_report_json() {
        let report = BenchmarkReport::new(&BenchmarkConfig::default(), false, snapshot());
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["send_type"], "empty");
        assert_eq!(json["stats"]["completed_calls"], 100);
    }

    #[test]
    fn test_per_call_without_calls() {
        let mut stats = snapshot();
        stats.completed_calls = 0;
        let report = BenchmarkReport::new(&BenchmarkConfig::default(), false, stats);
        assert_eq!(report.transport_per_call_us(), 0.0);
    }
}
