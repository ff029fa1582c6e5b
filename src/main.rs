use anyhow::{Context, Result};

use echo_bench::bench::{BenchmarkConfig, BenchmarkReport, BenchmarkRunner, EchoServer};
use echo_bench::client::{ClientFactory, LoopbackEchoClient, LoopbackOptions};
use echo_bench::config::{BenchArgs, Cli, Commands, HttpArgs};
use echo_bench::http_client::HttpClientFactory;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::load();

    // Initialize logging with the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let success = match cli.command {
        Commands::Run { url, bench, http } => {
            let factory = http_factory(url, &http);
            run_benchmark(&bench, factory).await?
        }
        Commands::Standalone {
            loopback,
            server,
            bench,
            http,
        } => {
            if loopback {
                let options = LoopbackOptions {
                    latency: std::time::Duration::from_millis(server.latency_ms),
                    ..Default::default()
                };
                let client = LoopbackEchoClient::new(tokio::runtime::Handle::current(), options);
                run_benchmark(&bench, client).await?
            } else {
                let mut echo_server = EchoServer::new(server.to_config(0)?);
                echo_server.start().await?;
                let factory = http_factory(echo_server.url(), &http);
                let success = run_benchmark(&bench, factory).await?;
                echo_server.stop();
                success
            }
        }
        Commands::Serve { port, server } => {
            let mut echo_server = EchoServer::new(server.to_config(port)?);
            echo_server.start().await?;
            print_startup_banner(&echo_server);

            tokio::signal::ctrl_c()
                .await
                .context("Failed to install Ctrl+C handler")?;
            tracing::info!("Received Ctrl+C signal, shutting down...");
            echo_server.stop();
            true
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}

fn http_factory(url: String, http: &HttpArgs) -> HttpClientFactory {
    HttpClientFactory {
        base_url: url,
        handle: tokio::runtime::Handle::current(),
        connect_timeout: http.connect_timeout,
        request_timeout: http.request_timeout,
    }
}

/// Run one benchmark on a blocking thread and print its report
async fn run_benchmark(
    args: &BenchArgs,
    factory: impl ClientFactory + 'static,
) -> Result<bool> {
    let config: BenchmarkConfig = args.to_config()?;
    tracing::info!(
        "Benchmark configured: type={}, mode={}, count={}, array size={}",
        config.send_type,
        config.mode(),
        config.send_count,
        config.array_size
    );

    let mut runner = BenchmarkRunner::new(config, factory);
    let (runner, success) = tokio::task::spawn_blocking(move || {
        let success = runner.run();
        (runner, success)
    })
    .await
    .context("Benchmark thread panicked")?;

    let report = BenchmarkReport::new(runner.config(), success, runner.snapshot());
    if args.json {
        println!("{}", report.to_json());
    } else {
        report.print_table();
        report.print_summary();
    }

    Ok(success)
}

/// Print startup banner
fn print_startup_banner(server: &EchoServer) {
    let banner = r#"
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║                    Echo Bench - Server                    ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner);
    println!("  Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("  Server:      {}", server.url());
    println!("  Port:        {}", server.port());
    println!();
}
