use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every user session, the progress reporter and the
/// aggregator.
///
/// `total` is always bumped before `successes`, and snapshots read
/// `successes` before `total`, so a reader can never see more successes
/// than issued requests.
#[derive(Debug, Default)]
pub struct RunCounters {
    total: AtomicU64,
    successes: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub total: u64,
    pub successes: u64,
}

impl RunCounters {
    pub fn new() -> RunCounters {
        RunCounters::default()
    }

    pub fn record(&self, success: bool) {
        self.total.fetch_add(1, Ordering::SeqCst);
        if success {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let successes = self.successes.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        CounterSnapshot { total, successes }
    }
}
