//! Log filtering and stream multiplexing for kubelike
//!
//! This crate turns a set of opened pod log streams into one filtered output:
//! every line is matched against a pattern, optionally tagged with the
//! container it came from, and followed streams are merged concurrently.

mod error;
mod filter;
mod multiplexer;
mod pipe;
mod policy;
mod prefix;
mod source;

#[cfg(test)]
mod testing;

pub use error::LikeError;
pub use filter::{ConsumeRequest, LineFilter, filter_lines};
pub use multiplexer::{LikeOptions, LogMultiplexer, stream_matching_logs};
pub use pipe::{PipeReader, PipeWriter, merge_pipe};
pub use policy::FailurePolicy;
pub use prefix::{PrefixWriter, Prefixer, Tagger};
pub use source::{LogSource, LogSources, LogStream};

// Re-export types used in our public API
pub use kubelike_types::SourceRef;
