use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::counters::CounterSnapshot;
use crate::latency::LatencySummary;

/// Validated run parameters, read-only once the run starts.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub url: String,
    // 每个用户的请求上限
    pub requests_per_user: u64,
    // 并发用户数
    pub users: usize,
    // 压测时长(秒)
    pub duration_secs: u64,
    pub think_time_ms: u64,
    pub request_timeout_secs: u64,
    // 0 表示不限速
    pub qps_per_user: u64,
    #[serde(skip_serializing)]
    pub show_progress: bool,
}

impl Config {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn think_time(&self) -> Duration {
        Duration::from_millis(self.think_time_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// total number of requests the whole run may issue
    pub fn request_target(&self) -> u64 {
        self.requests_per_user.saturating_mul(self.users as u64)
    }
}

/// Final statistics of one run.
///
/// When no request was issued the success rate and throughput are reported
/// as 0; a zero elapsed time also yields a throughput of 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub url: String,
    pub users: usize,
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    // 百分比
    pub success_rate: f64,
    pub elapsed_secs: f64,
    pub throughput: f64,
    pub latency: LatencySummary,
    // status code or failure class -> count
    pub status_counts: BTreeMap<String, u64>,
}

impl Report {
    pub fn build(
        config: &Config,
        snapshot: CounterSnapshot,
        elapsed: Duration,
        latency: LatencySummary,
        status_counts: BTreeMap<String, u64>,
    ) -> Report {
        let CounterSnapshot { total, successes } = snapshot;
        let elapsed_secs = elapsed.as_secs_f64();

        let success_rate = if total == 0 {
            0.0
        } else {
            successes as f64 / total as f64 * 100.0
        };
        let throughput = if total == 0 || elapsed_secs <= 0.0 {
            0.0
        } else {
            total as f64 / elapsed_secs
        };

        Report {
            url: config.url.clone(),
            users: config.users,
            total_requests: total,
            successes,
            failures: total - successes,
            success_rate,
            elapsed_secs,
            throughput,
            latency,
            status_counts,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test completed!")?;
        writeln!(f, "Total requests: {}", self.total_requests)?;
        writeln!(f, "Successful requests: {}", self.successes)?;
        writeln!(f, "Failed requests: {}", self.failures)?;
        writeln!(f, "Success rate: {:.2}%", self.success_rate)?;
        writeln!(f, "Total time: {:.2} seconds", self.elapsed_secs)?;
        writeln!(f, "Requests per second: {:.2}", self.throughput)?;

        if self.latency.count > 0 {
            writeln!(f)?;
            writeln!(f, "Latency (ms):")?;
            writeln!(
                f,
                "  min: {}, mean: {:.2}, max: {}",
                self.latency.min_ms, self.latency.mean_ms, self.latency.max_ms
            )?;
            for (name, ms) in self.latency.quantiles.iter() {
                writeln!(f, "  {}: {}", name, ms)?;
            }
        }

        if !self.status_counts.is_empty() {
            writeln!(f)?;
            writeln!(f, "Status breakdown:")?;
            for (status, cnt) in self.status_counts.iter() {
                writeln!(f, "  {}: {}", status, cnt)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::RequestLatency;

    fn config() -> Config {
        Config {
            url: "http://example.test/ok".to_string(),
            requests_per_user: 5,
            users: 2,
            duration_secs: 60,
            think_time_ms: 100,
            request_timeout_secs: 10,
            qps_per_user: 0,
            show_progress: false,
        }
    }

    #[test]
    fn test_report_rates() {
        let report = Report::build(
            &config(),
            CounterSnapshot {
                total: 8,
                successes: 6,
            },
            Duration::from_secs(2),
            RequestLatency::new().summary(),
            BTreeMap::new(),
        );
        assert_eq!(report.failures, 2);
        assert_eq!(report.success_rate, 75.0);
        assert_eq!(report.throughput, 4.0);
        assert_eq!(report.failures, report.total_requests - report.successes);
    }

    #[test]
    fn test_zero_requests_policy() {
        let report = Report::build(
            &config(),
            CounterSnapshot::default(),
            Duration::from_secs(3),
            RequestLatency::new().summary(),
            BTreeMap::new(),
        );
        assert_eq!(report.total_requests, 0);
        assert_eq!(report.failures, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.throughput, 0.0);
        assert!(report.to_string().contains("Success rate: 0.00%"));
        assert!(report.to_string().contains("Requests per second: 0.00"));
    }

    #[test]
    fn test_zero_elapsed_throughput() {
        let report = Report::build(
            &config(),
            CounterSnapshot {
                total: 3,
                successes: 3,
            },
            Duration::ZERO,
            RequestLatency::new().summary(),
            BTreeMap::new(),
        );
        assert_eq!(report.success_rate, 100.0);
        assert_eq!(report.throughput, 0.0);
    }

    #[test]
    fn test_build_is_idempotent() {
        let snapshot = CounterSnapshot {
            total: 7,
            successes: 3,
        };
        let mut latency = RequestLatency::new();
        latency.insert(12);
        let mut statuses = BTreeMap::new();
        statuses.insert("200".to_string(), 3);
        statuses.insert("503".to_string(), 4);

        let elapsed = Duration::from_millis(1500);
        let first = Report::build(&config(), snapshot, elapsed, latency.summary(), statuses.clone());
        let second = Report::build(&config(), snapshot, elapsed, latency.summary(), statuses);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_display() {
        let mut statuses = BTreeMap::new();
        statuses.insert("200".to_string(), 1);
        statuses.insert("500".to_string(), 1);
        let report = Report::build(
            &config(),
            CounterSnapshot {
                total: 2,
                successes: 1,
            },
            Duration::from_secs(1),
            RequestLatency::new().summary(),
            statuses,
        );
        let text = report.to_string();
        assert!(text.contains("Total requests: 2"));
        assert!(text.contains("Failed requests: 1"));
        assert!(text.contains("Success rate: 50.00%"));
        assert!(text.contains("  500: 1"));
    }

    #[test]
    fn test_request_target() {
        assert_eq!(config().request_target(), 10);
    }
}
