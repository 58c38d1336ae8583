use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;

use futures::AsyncBufRead;
use futures::future::BoxFuture;

use kubelike_types::SourceRef;

/// A byte stream of log output, closed when dropped
pub type LogStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// Sources keyed by identity; iteration order is the sequential read order
pub type LogSources = BTreeMap<SourceRef, Box<dyn LogSource>>;

/// Handle that opens a log stream on demand
pub trait LogSource: Send + Sync {
    fn open(&self) -> BoxFuture<'_, io::Result<LogStream>>;
}
