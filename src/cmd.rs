use clap::Parser;

use crate::consts::{
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_THINK_TIME_MS, MAX_REQUEST_TIMEOUT_SECS,
};
use crate::error::{BenchError, Result};
use crate::model::Config;

#[derive(Parser, serde::Serialize, Clone, Debug)]
#[command(name = "http-load-test")]
#[command(version = "0.1.0")]
#[command(about = "concurrent http load testing tool", long_about = None)]
pub struct Cli {
    /// Target URL to test
    #[arg(long)]
    pub url: String,
    /// Number of requests each simulated user makes
    #[arg(long, default_value_t = 1000)]
    pub requests: u64,
    /// Number of concurrent users
    #[arg(long, default_value_t = 10)]
    pub users: usize,
    /// Test duration in seconds
    #[arg(long, default_value_t = 300)]
    pub duration: u64,
    /// Pause between two requests of the same user, in milliseconds
    #[arg(long, default_value_t = DEFAULT_THINK_TIME_MS)]
    pub think_time_ms: u64,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,
    /// Request rate cap for each user, 0 means unlimited
    #[arg(long, default_value_t = 0)]
    pub qps_per_user: u64,
    /// Also print the final report as json
    #[arg(long)]
    pub json: bool,
    /// Do not print the live progress line
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Validate the arguments and freeze them into a run configuration.
    pub fn to_config(&self) -> Result<Config> {
        let url = reqwest::Url::parse(&self.url)
            .map_err(|e| BenchError::Config(format!("invalid url {:?}: {}", self.url, e)))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(BenchError::Config(format!(
                    "unsupported url scheme {:?}, expected http or https",
                    other
                )))
            }
        }
        if self.users == 0 {
            return Err(BenchError::Config("--users must be at least 1".to_string()));
        }
        if self.timeout == 0 || self.timeout > MAX_REQUEST_TIMEOUT_SECS {
            return Err(BenchError::Config(format!(
                "--timeout must be between 1 and {} seconds",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        Ok(Config {
            url: url.to_string(),
            requests_per_user: self.requests,
            users: self.users,
            duration_secs: self.duration,
            think_time_ms: self.think_time_ms,
            request_timeout_secs: self.timeout,
            qps_per_user: self.qps_per_user,
            show_progress: !self.quiet,
        })
    }
}
