use std::time::Duration;

// 每次请求之间的默认思考时间
pub const DEFAULT_THINK_TIME_MS: u64 = 100;

// 进度输出间隔
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const SUCCESS_STATUS: u16 = 200;

/// status code recorded for requests that never got a response.
pub const FAILURE_STATUS: u16 = 500;
