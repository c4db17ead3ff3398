//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration is missing or invalid. Exit code 2, never retried.
    Config(String),
    /// Transport failure or HTTP 5xx that survived retry exhaustion;
    /// carries the last underlying cause.
    Transient(String),
    /// The feed endpoint answered with a non-success status.
    FeedFetch(String),
    /// The feed body could not be decoded as a GTFS-Realtime message.
    FeedDecode(String),
    /// The Taskade API returned an unexpected status or response shape.
    Upsert(String),
    /// Catch-all for failures outside the known taxonomy.
    Unexpected(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transient(msg) => write!(f, "transient: {msg}"),
            Self::FeedFetch(msg) => write!(f, "feed fetch: {msg}"),
            Self::FeedDecode(msg) => write!(f, "feed decode: {msg}"),
            Self::Upsert(msg) => write!(f, "upsert: {msg}"),
            Self::Unexpected(msg) => write!(f, "unexpected: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<prost::DecodeError> for AppError {
    fn from(err: prost::DecodeError) -> Self {
        Self::FeedDecode(err.to_string())
    }
}

impl AppError {
    /// Process exit code for this error category: 2 for configuration
    /// problems, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}
