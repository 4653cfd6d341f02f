use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::consts::{CONNECT_TIMEOUT, FAILURE_STATUS, SUCCESS_STATUS};
use crate::error::Result;

/// Why a request produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Status(u16),
    Failed(FailureKind),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Status(SUCCESS_STATUS))
    }

    /// Network failures are reported with the generic server error code.
    pub fn status_code(&self) -> u16 {
        match self {
            RequestOutcome::Status(code) => *code,
            RequestOutcome::Failed(_) => FAILURE_STATUS,
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOutcome::Status(code) => write!(f, "{}", code),
            RequestOutcome::Failed(FailureKind::Timeout) => write!(f, "timeout"),
            RequestOutcome::Failed(FailureKind::Connect) => write!(f, "connect"),
            RequestOutcome::Failed(FailureKind::Request) => write!(f, "request"),
        }
    }
}

/// Issues a single request. Implementations must absorb every transport
/// error into a [`RequestOutcome`] and never retry.
pub trait Executor: Send + Sync {
    fn execute(&self, url: &str) -> RequestOutcome;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, url: &str) -> RequestOutcome {
        (**self).execute(url)
    }
}

pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(timeout: Duration) -> Result<HttpExecutor> {
        // 直连目标,不走系统代理
        let client = Client::builder()
            .no_proxy()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;
        Ok(HttpExecutor { client })
    }
}

impl Executor for HttpExecutor {
    fn execute(&self, url: &str) -> RequestOutcome {
        match self.client.get(url).send() {
            Ok(resp) => RequestOutcome::Status(resp.status().as_u16()),
            Err(e) => {
                let kind = if e.is_timeout() {
                    FailureKind::Timeout
                } else if e.is_connect() {
                    FailureKind::Connect
                } else {
                    FailureKind::Request
                };
                tracing::debug!(url, error = %e, "request failed");
                RequestOutcome::Failed(kind)
            }
        }
    }
}
