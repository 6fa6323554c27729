use thiserror::Error;

/// Error taxonomy shared by every component of the ingestion worker.
///
/// `NotFound` triggers the tombstone path, `TransientTransport` is retried
/// by the worker loop via `release`, `Invalid` is logged and acked,
/// `QueueFull` and `UnknownProvider` are executor-local, `Fatal` aborts
/// startup.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient transport error: {0}")]
    TransientTransport(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("LLM executor admission queue is full")]
    QueueFull,

    #[error("no provider registered for {0:?}")]
    UnknownProvider(String),

    #[error("fatal startup error: {0}")]
    Fatal(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AppError {
    /// Whether the worker loop should `release` the item for a later retry
    /// (as opposed to acking it, which happens for `NotFound` and `Invalid`).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AppError::NotFound(_) | AppError::Invalid(_))
    }
}
