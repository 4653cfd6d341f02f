use anyhow::{Context, Result};
use clap::Parser;

mod bench;
mod cmd;
mod consts;
mod counters;
mod error;
mod executor;
mod latency;
mod model;

use executor::HttpExecutor;
use tracing_subscriber::EnvFilter;

/// RUST_LOG directives when set and valid, info otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    // 解析命令行参数
    let params = cmd::Cli::parse();
    let config = params.to_config()?;
    tracing::info!(
        "benchmark parameters: {}",
        serde_json::to_string(&config).context("failed to serialize parameters")?
    );

    println!("Starting load test on {}", config.url);
    println!("Number of requests per user: {}", config.requests_per_user);
    println!("Number of concurrent users: {}", config.users);
    println!("Test duration: {} seconds", config.duration_secs);

    let executor = HttpExecutor::new(config.request_timeout())?;
    let report = bench::run_load_test(&config, executor).context("load test aborted")?;

    println!();
    print!("{}", report);
    if params.json {
        println!(
            "{}",
            serde_json::to_string(&report).context("failed to serialize report")?
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_honors_rust_log() {
        assert_eq!(
            log_filter(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("http_load_test=loud")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
