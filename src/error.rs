use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    /// invalid parameters, reported before any request is sent
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} panicked")]
    SessionPanicked(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;
