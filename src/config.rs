use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::bench::config::{
    BenchmarkConfig, EchoServerConfig, SendType, DEFAULT_AVAILABILITY_ATTEMPTS,
    DEFAULT_AVAILABILITY_INTERVAL,
};
use crate::error::BenchError;

/// Echo Bench - latency and throughput benchmark for echo services
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a benchmark against an existing echo service
    Run {
        /// Echo service URL
        #[arg(
            short = 'u',
            long,
            env = "ECHO_SERVICE_URL",
            default_value = "http://127.0.0.1:8000"
        )]
        url: String,

        #[command(flatten)]
        bench: BenchArgs,

        #[command(flatten)]
        http: HttpArgs,
    },

    /// Start an in-process echo service and benchmark it
    Standalone {
        /// Echo in-process without HTTP
        #[arg(long)]
        loopback: bool,

        #[command(flatten)]
        server: ServerArgs,

        #[command(flatten)]
        bench: BenchArgs,

        #[command(flatten)]
        http: HttpArgs,
    },

    /// Serve the echo service until interrupted
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "ECHO_SERVER_PORT", default_value = "8000")]
        port: u16,

        #[command(flatten)]
        server: ServerArgs,
    },
}

/// Benchmark run settings
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Send type (empty, copy, copies, or code 0-2)
    #[arg(short = 't', long, env = "ECHO_SEND_TYPE", default_value = "empty")]
    pub send_type: String,

    /// Number of calls to complete
    #[arg(short = 'c', long, env = "ECHO_SEND_COUNT", default_value = "1000")]
    pub count: u64,

    /// Records per payload for the copies benchmark
    #[arg(short = 'a', long, env = "ECHO_ARRAY_SIZE", default_value = "100")]
    pub array_size: usize,

    /// Chain async calls instead of blocking per call
    #[arg(long = "async")]
    pub async_mode: bool,

    /// Log run boundaries and progress
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Availability probes before giving up
    #[arg(long, env = "ECHO_AVAILABILITY_ATTEMPTS", default_value_t = DEFAULT_AVAILABILITY_ATTEMPTS)]
    pub availability_attempts: u32,

    /// Delay between availability probes in milliseconds
    #[arg(long, default_value_t = DEFAULT_AVAILABILITY_INTERVAL.as_millis() as u64)]
    pub availability_interval_ms: u64,
}

impl BenchArgs {
    /// Build a validated benchmark configuration
    pub fn to_config(&self) -> Result<BenchmarkConfig, BenchError> {
        let send_type: SendType = self.send_type.parse()?;

        let config = BenchmarkConfig {
            send_type,
            async_mode: self.async_mode,
            send_count: self.count,
            array_size: self.array_size,
            verbose: self.verbose,
            availability_attempts: self.availability_attempts,
            availability_interval: Duration::from_millis(self.availability_interval_ms),
            ..Default::default()
        };
        config.validate()?;

        Ok(config)
    }
}

/// HTTP client settings
#[derive(Args, Debug, Clone)]
pub struct HttpArgs {
    /// Connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "5")]
    pub connect_timeout: u64,

    /// Request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,
}

/// Echo server behaviour
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Simulated latency per request in milliseconds
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,

    /// Simulated error rate (0.0 to 1.0)
    #[arg(long, default_value = "0.0")]
    pub error_rate: f64,
}

impl ServerArgs {
    pub fn to_config(&self, port: u16) -> Result<EchoServerConfig, BenchError> {
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(BenchError::InvalidConfig(format!(
                "error rate must be between 0.0 and 1.0, got {}",
                self.error_rate
            )));
        }

        Ok(EchoServerConfig {
            port,
            latency_ms: self.latency_ms,
            error_rate: self.error_rate,
        })
    }
}

impl Cli {
    /// Load arguments with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["echo-bench", "run"]);
        assert_eq!(cli.log_level, "info");

        let Commands::Run { url, bench, http } = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(url, "http://127.0.0.1:8000");
        assert_eq!(http.connect_timeout, 5);

        let config = bench.to_config().unwrap();
        assert_eq!(config.send_type, SendType::Empty);
        assert_eq!(config.send_count, 1000);
        assert!(!config.async_mode);
        assert_eq!(config.availability_attempts, 10);
        assert_eq!(config.availability_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_standalone_flags() {
        let cli = parse(&[
            "echo-bench",
            "standalone",
            "--loopback",
            "-t",
            "copies",
            "-c",
            "50",
            "-a",
            "0",
            "--async",
            "--verbose",
            "--error-rate",
            "0.25",
        ]);

        let Commands::Standalone {
            loopback,
            server,
            bench,
            ..
        } = cli.command
        else {
            panic!("expected standalone command");
        };
        assert!(loopback);

        let config = bench.to_config().unwrap();
        assert_eq!(config.send_type, SendType::Copies);
        assert_eq!(config.send_count, 50);
        assert_eq!(config.array_size, 0);
        assert!(config.async_mode);
        assert!(config.verbose);

        let server = server.to_config(0).unwrap();
        assert!((server.error_rate - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_send_type_is_reported() {
        let cli = parse(&["echo-bench", "run", "--send-type", "stream"]);
        let Commands::Run { bench, .. } = cli.command else {
            panic!("expected run command");
        };
        assert!(matches!(
            bench.to_config(),
            Err(BenchError::UnknownSendType(ref s)) if s == "stream"
        ));
    }

    #[test]
    fn test_zero_count_is_rejected() {
        let cli = parse(&["echo-bench", "run", "--count", "0"]);
        let Commands::Run { bench, .. } = cli.command else {
            panic!("expected run command");
        };
        assert!(matches!(
            bench.to_config(),
            Err(BenchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_error_rate_out_of_range() {
        let args = ServerArgs {
            latency_ms: 0,
            error_rate: 1.5,
        };
        assert!(args.to_config(8000).is_err());
    }

    #[test]
    fn test_serve_port() {
        let cli = parse(&["echo-bench", "serve", "--port", "9100", "--latency-ms", "3"]);
        let Commands::Serve { port, server } = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(port, 9100);
        assert_eq!(server.to_config(port).unwrap().latency_ms, 3);
    }
}
