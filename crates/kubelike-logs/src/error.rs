use std::io;

use thiserror::Error;
use tokio::task::JoinError;

/// Errors surfaced while filtering and merging log streams
#[derive(Debug, Error)]
pub enum LikeError {
    /// The line pattern failed to compile
    #[error("invalid pattern")]
    Pattern(#[from] regex::Error),

    /// More streams were asked to be followed than the concurrency limit allows
    #[error(
        "you are attempting to follow {requested} log streams, but maximum allowed concurrency is {limit}, use --max-log-requests to increase the limit"
    )]
    ConcurrencyLimit { requested: usize, limit: usize },

    /// A log stream could not be opened or failed while being read
    #[error(transparent)]
    Source(io::Error),

    /// The output could not be written
    #[error("failed to write logs")]
    Destination(#[source] io::Error),

    /// A stream worker panicked or was cancelled
    #[error("log stream worker failed")]
    Worker(#[from] JoinError),
}

impl LikeError {
    /// Whether this error came from the output rather than from a log source
    pub fn is_destination(&self) -> bool {
        matches!(self, Self::Destination(_))
    }
}
