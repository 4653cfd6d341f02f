use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

const QUANTILES: [(&str, f64); 5] = [
    ("p50", 0.50),
    ("p90", 0.90),
    ("p95", 0.95),
    ("p99", 0.99),
    ("p999", 0.999),
];

/// Millisecond-bucket latency histogram kept by every user session.
#[derive(Debug, Clone, Default)]
pub struct RequestLatency {
    request_cnt: u64,
    total_millis: u64,
    // latency(ms) -> count
    bucket: HashMap<u32, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ms: u32,
    pub mean_ms: f64,
    pub max_ms: u32,
    pub quantiles: BTreeMap<String, u32>,
}

impl RequestLatency {
    pub fn new() -> RequestLatency {
        RequestLatency::default()
    }

    pub fn insert(&mut self, millis: u32) {
        *self.bucket.entry(millis).or_insert(0) += 1;
        self.request_cnt += 1;
        self.total_millis += millis as u64;
    }

    pub fn count(&self) -> u64 {
        self.request_cnt
    }

    /// merge another session's histogram into this one
    pub fn add(&mut self, another: &RequestLatency) {
        for (t, cnt) in another.bucket.iter() {
            *self.bucket.entry(*t).or_insert(0) += cnt;
        }
        self.request_cnt += another.request_cnt;
        self.total_millis += another.total_millis;
    }

    pub fn summary(&self) -> LatencySummary {
        let mut keys: Vec<&u32> = self.bucket.keys().collect();
        keys.sort();

        let mut quantiles = BTreeMap::new();
        if self.request_cnt > 0 {
            // 累计计数,找到第一个覆盖目标分位的桶
            let mut cumulative = 0u64;
            let mut pending = QUANTILES.iter().peekable();
            for key in keys.iter() {
                cumulative += self.bucket.get(*key).copied().unwrap_or(0);
                let percent = cumulative as f64 / self.request_cnt as f64;
                while let Some((name, q)) = pending.peek() {
                    if percent + f64::EPSILON < *q {
                        break;
                    }
                    quantiles.insert(name.to_string(), **key);
                    pending.next();
                }
            }
        }

        LatencySummary {
            count: self.request_cnt,
            min_ms: keys.first().map(|k| **k).unwrap_or(0),
            mean_ms: if self.request_cnt == 0 {
                0.0
            } else {
                self.total_millis as f64 / self.request_cnt as f64
            },
            max_ms: keys.last().map(|k| **k).unwrap_or(0),
            quantiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = RequestLatency::new().summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.min_ms, 0);
        assert_eq!(summary.max_ms, 0);
        assert_eq!(summary.mean_ms, 0.0);
        assert!(summary.quantiles.is_empty());
    }

    #[test]
    fn test_quantiles() {
        let mut latency = RequestLatency::new();
        for ms in 1..=100 {
            latency.insert(ms);
        }
        let summary = latency.summary();
        assert_eq!(summary.count, 100);
        assert_eq!(summary.min_ms, 1);
        assert_eq!(summary.max_ms, 100);
        assert_eq!(summary.mean_ms, 50.5);
        assert_eq!(summary.quantiles["p50"], 50);
        assert_eq!(summary.quantiles["p90"], 90);
        assert_eq!(summary.quantiles["p95"], 95);
        assert_eq!(summary.quantiles["p99"], 99);
        assert_eq!(summary.quantiles["p999"], 100);
    }

    #[test]
    fn test_add_merges_buckets() {
        let mut a = RequestLatency::new();
        a.insert(10);
        a.insert(20);
        let mut b = RequestLatency::new();
        b.insert(20);
        b.insert(40);

        a.add(&b);
        let summary = a.summary();
        assert_eq!(a.count(), 4);
        assert_eq!(summary.min_ms, 10);
        assert_eq!(summary.max_ms, 40);
        assert_eq!(summary.mean_ms, 22.5);
        assert_eq!(summary.quantiles["p50"], 20);
    }
}
