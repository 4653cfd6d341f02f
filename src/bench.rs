use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::consts::PROGRESS_INTERVAL;
use crate::counters::RunCounters;
use crate::error::{BenchError, Result};
use crate::executor::{Executor, RequestOutcome};
use crate::latency::RequestLatency;
use crate::model::{Config, Report};

/// State shared by all user sessions of one run.
struct RunState<E> {
    config: Config,
    executor: E,
    counters: RunCounters,
    start: Instant,
    // set when the run has to be torn down early
    abort: AtomicBool,
}

impl<E: Executor> RunState<E> {
    fn should_stop(&self, issued: u64) -> bool {
        self.abort.load(Ordering::Relaxed)
            || self.start.elapsed() >= self.config.duration()
            || issued >= self.config.requests_per_user
    }
}

/// What a single session reports back once it stops.
#[derive(Debug, Default)]
struct SessionResult {
    issued: u64,
    latency: RequestLatency,
    status_counts: BTreeMap<String, u64>,
}

impl SessionResult {
    fn record(&mut self, outcome: RequestOutcome, millis: u32) {
        self.issued += 1;
        self.latency.insert(millis);
        *self.status_counts.entry(outcome.to_string()).or_insert(0) += 1;
    }
}

// 单个用户的压测循环
fn user_session<E: Executor>(state: &RunState<E>) -> SessionResult {
    let config = &state.config;
    let mut res = SessionResult::default();

    // qps limiter
    let mut limiter: Option<ratelimit::Ratelimiter> = None;
    if config.qps_per_user > 0 {
        limiter = Some(ratelimit::Ratelimiter::new(1, 1, config.qps_per_user));
    }

    loop {
        if let Some(ref l) = limiter {
            l.wait();
        }
        if state.should_stop(res.issued) {
            break;
        }

        let start = Instant::now();
        let outcome = state.executor.execute(&config.url);
        let millis = start.elapsed().as_millis().min(u32::MAX as u128) as u32;
        state.counters.record(outcome.is_success());
        tracing::trace!(status = outcome.status_code(), millis, "request done");
        res.record(outcome, millis);

        if state.should_stop(res.issued) {
            break;
        }
        // 思考时间,不睡过截止时间
        let remaining = config.duration().saturating_sub(state.start.elapsed());
        thread::sleep(config.think_time().min(remaining));
    }
    tracing::debug!(issued = res.issued, "user session finished");
    res
}

/// Prints the live status line until the run deadline, the request target,
/// or a stop signal from the scheduler, whichever comes first.
pub struct ProgressReporter {
    pub interval: Duration,
    pub duration: Duration,
    pub target: u64,
}

impl ProgressReporter {
    pub fn new(config: &Config) -> ProgressReporter {
        ProgressReporter {
            interval: PROGRESS_INTERVAL,
            duration: config.duration(),
            target: config.request_target(),
        }
    }

    /// Returns the number of status lines written.
    pub fn run<W: Write>(
        &self,
        counters: &RunCounters,
        start: Instant,
        stop: &mpsc::Receiver<()>,
        out: &mut W,
    ) -> io::Result<u64> {
        let mut ticks = 0;
        loop {
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                // sender dropped or explicit stop
                _ => break,
            }
            let snap = counters.snapshot();
            let elapsed = start.elapsed();
            write!(
                out,
                "\rRequests: {}, Successful: {}, Time elapsed: {}s",
                snap.total,
                snap.successes,
                elapsed.as_secs()
            )?;
            out.flush()?;
            ticks += 1;
            if elapsed >= self.duration || snap.total >= self.target {
                break;
            }
        }
        if ticks > 0 {
            writeln!(out)?;
        }
        Ok(ticks)
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

fn spawn_named(name: String, task: Task) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(task)
}

/// Run the whole load test: spawn one thread per user, wait for all of
/// them and build the final report.
pub fn run_load_test<E: Executor + 'static>(config: &Config, executor: E) -> Result<Report> {
    run_with_spawner(config, executor, spawn_named)
}

fn run_with_spawner<E, S>(config: &Config, executor: E, mut spawn: S) -> Result<Report>
where
    E: Executor + 'static,
    S: FnMut(String, Task) -> io::Result<JoinHandle<()>>,
{
    let state = Arc::new(RunState {
        config: config.clone(),
        executor,
        counters: RunCounters::new(),
        start: Instant::now(),
        abort: AtomicBool::new(false),
    });

    let (tx, rx): (mpsc::Sender<SessionResult>, mpsc::Receiver<SessionResult>) = mpsc::channel();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let reporter = if config.show_progress {
        let reporter_state = state.clone();
        let progress = ProgressReporter::new(config);
        let handle = spawn(
            "progress".to_string(),
            Box::new(move || {
                let mut stdout = io::stdout();
                if let Err(e) = progress.run(
                    &reporter_state.counters,
                    reporter_state.start,
                    &stop_rx,
                    &mut stdout,
                ) {
                    tracing::warn!(error = %e, "progress output failed");
                }
            }),
        )
        .map_err(|source| BenchError::Spawn {
            name: "progress".to_string(),
            source,
        })?;
        Some(handle)
    } else {
        None
    };

    tracing::info!(users = config.users, "starting user sessions");
    let mut handles = vec![];
    for i in 0..config.users {
        let thread_sender = tx.clone();
        let session_state = state.clone();
        let name = format!("user-{:0>4}", i);

        let spawned = spawn(
            name.clone(),
            Box::new(move || {
                let res = user_session(&session_state);
                _ = thread_sender.send(res);
            }),
        );
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                // 已经启动的用户先停下来再退出
                state.abort.store(true, Ordering::Relaxed);
                for handle in handles {
                    _ = handle.join();
                }
                drop(stop_tx);
                if let Some(handle) = reporter {
                    _ = handle.join();
                }
                return Err(BenchError::Spawn { name, source });
            }
        }
    }
    drop(tx);

    let mut panicked = None;
    for handle in handles {
        let name = handle.thread().name().unwrap_or("user").to_string();
        if handle.join().is_err() {
            panicked.get_or_insert(name);
        }
    }
    // 所有用户结束后的实际时长
    let elapsed = state.start.elapsed();

    drop(stop_tx);
    if let Some(handle) = reporter {
        _ = handle.join();
    }
    if let Some(name) = panicked {
        return Err(BenchError::SessionPanicked(name));
    }

    // 汇总结果
    let mut latency = RequestLatency::new();
    let mut status_counts: BTreeMap<String, u64> = BTreeMap::new();
    for session_res in rx.iter() {
        latency.add(&session_res.latency);
        for (status, cnt) in session_res.status_counts {
            *status_counts.entry(status).or_insert(0) += cnt;
        }
    }

    let snapshot = state.counters.snapshot();
    debug_assert_eq!(latency.count(), snapshot.total);
    tracing::info!(
        total = snapshot.total,
        successes = snapshot.successes,
        elapsed_ms = elapsed.as_millis() as u64,
        "load test finished"
    );
    Ok(Report::build(
        config,
        snapshot,
        elapsed,
        latency.summary(),
        status_counts,
    ))
}
