//! Configuration structs for benchmarking.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

use crate::error::BenchError;

/// Probes of the echo service before a run gives up
pub const DEFAULT_AVAILABILITY_ATTEMPTS: u32 = 10;

/// Delay between two availability probes
pub const DEFAULT_AVAILABILITY_INTERVAL: Duration = Duration::from_millis(500);

/// Payload pattern exercised by a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendType {
    /// No payload, empty reply
    #[default]
    Empty,
    /// A single record echoed back
    Copy,
    /// An array of records echoed back
    Copies,
}

impl std::fmt::Display for SendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendType::Empty => write!(f, "empty"),
            SendType::Copy => write!(f, "copy"),
            SendType::Copies => write!(f, "copies"),
        }
    }
}

impl TryFrom<u8> for SendType {
    type Error = BenchError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SendType::Empty),
            1 => Ok(SendType::Copy),
            2 => Ok(SendType::Copies),
            other => Err(BenchError::UnknownSendType(other.to_string())),
        }
    }
}

impl std::str::FromStr for SendType {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(SendType::Empty),
            "copy" | "single" => Ok(SendType::Copy),
            "copies" | "array" => Ok(SendType::Copies),
            other => match other.parse::<u8>() {
                Ok(code) => SendType::try_from(code),
                Err(_) => Err(BenchError::UnknownSendType(s.to_string())),
            },
        }
    }
}

/// Configuration for the echo server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoServerConfig {
    /// Port to listen on (0 for random)
    pub port: u16,
    /// Simulated latency per request in milliseconds
    pub latency_ms: u64,
    /// Error rate (0.0 to 1.0)
    pub error_rate: f64,
}

impl Default for EchoServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            latency_ms: 0,
            error_rate: 0.0,
        }
    }
}

/// Configuration for a benchmark run
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Name reported with the statistics
    pub name: String,
    /// Payload pattern
    pub send_type: SendType,
    /// Drive calls through chained async continuations instead of a blocking loop
    pub async_mode: bool,
    /// Number of round trips to complete
    pub send_count: u64,
    /// Records per payload for the copies benchmark
    pub array_size: usize,
    /// Log run boundaries and progress
    pub verbose: bool,
    /// Availability probes before giving up
    pub availability_attempts: u32,
    /// Delay between availability probes
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub availability_interval: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            name: "ECHO".to_string(),
            send_type: SendType::Empty,
            async_mode: false,
            send_count: 1000,
            array_size: 100,
            verbose: false,
            availability_attempts: DEFAULT_AVAILABILITY_ATTEMPTS,
            availability_interval: DEFAULT_AVAILABILITY_INTERVAL,
        }
    }
}

impl BenchmarkConfig {
    /// Reject configurations no run can start with
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.send_count == 0 {
            return Err(BenchError::InvalidConfig(
                "send count must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Human-readable mode label
    pub fn mode(&self) -> &'static str {
        if self.async_mode {
            "async"
        } else {
            "blocking"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_type_from_str() {
        assert_eq!("empty".parse::<SendType>().unwrap(), SendType::Empty);
        assert_eq!("COPY".parse::<SendType>().unwrap(), SendType::Copy);
        assert_eq!("array".parse::<SendType>().unwrap(), SendType::Copies);
        assert_eq!("2".parse::<SendType>().unwrap(), SendType::Copies);
    }

    #[test]
    fn test_unknown_send_type_is_error() {
        let err = "bogus".parse::<SendType>().unwrap_err();
        assert!(matches!(err, BenchError::UnknownSendType(ref s) if s == "bogus"));

        let err = SendType::try_from(7).unwrap_err();
        assert_eq!(err.to_string(), "Benchmark type=7 not implemented");
    }

    #[test]
    fn test_send_type_codes() {
        assert_eq!(SendType::try_from(0).unwrap(), SendType::Empty);
        assert_eq!(SendType::try_from(1).unwrap(), SendType::Copy);
        assert_eq!("1".parse::<SendType>().unwrap(), SendType::Copy);
    }

    #[test]
    fn test_validate_rejects_zero_count() {
        let config = BenchmarkConfig {
            send_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BenchError::InvalidConfig(_))
        ));
        assert!(BenchmarkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_serializes_interval_as_millis() {
        let json = serde_json::to_value(BenchmarkConfig::default()).unwrap();
        assert_eq!(json["availability_interval"], 500);
        assert_eq!(json["send_type"], "empty");
    }

    #[test]
    fn test_config_reads_interval_from_millis() {
        let mut json = serde_json::to_value(BenchmarkConfig::default()).unwrap();
        json["availability_interval"] = serde_json::json!(1250);

        let config: BenchmarkConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.availability_interval, Duration::from_millis(1250));
    }
}
