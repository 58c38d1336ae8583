//! In-memory sources and sinks shared by the unit tests

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::io::{AsyncRead, AsyncReadExt, BufReader, Cursor};
use tokio::io::AsyncWrite;

use kubelike_types::{ContainerSection, SourceRef};

use crate::error::LikeError;
use crate::filter::ConsumeRequest;
use crate::source::{LogSource, LogSources, LogStream};

pub fn source_ref(pod: &str, container: &str) -> SourceRef {
    SourceRef::for_container("default", pod, ContainerSection::Regular, container)
}

pub fn sources(entries: Vec<(SourceRef, Box<dyn LogSource>)>) -> LogSources {
    entries.into_iter().collect()
}

pub fn static_stream(content: &str) -> LogStream {
    Box::pin(Cursor::new(content.as_bytes().to_vec()))
}

/// Stream that yields `content` and then fails with `message`
pub fn failing_stream(content: &str, message: &str) -> LogStream {
    let reader = Cursor::new(content.as_bytes().to_vec()).chain(FailingReader(message.to_string()));
    Box::pin(BufReader::new(reader))
}

struct FailingReader(String);

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::other(self.0.clone())))
    }
}

/// Source backed by a fixed string
pub struct StaticSource(String);

impl StaticSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn boxed(content: impl Into<String>) -> Box<dyn LogSource> {
        Box::new(Self::new(content))
    }
}

impl LogSource for StaticSource {
    fn open(&self) -> BoxFuture<'_, io::Result<LogStream>> {
        Box::pin(async move { Ok(static_stream(&self.0)) })
    }
}

/// Source that emits some content and then breaks mid-stream
pub struct BrokenSource {
    content: String,
    message: String,
}

impl BrokenSource {
    pub fn boxed(content: &str, message: &str) -> Box<dyn LogSource> {
        Box::new(Self {
            content: content.to_string(),
            message: message.to_string(),
        })
    }
}

impl LogSource for BrokenSource {
    fn open(&self) -> BoxFuture<'_, io::Result<LogStream>> {
        Box::pin(async move { Ok(failing_stream(&self.content, &self.message)) })
    }
}

/// Source whose stream can never be opened
pub struct UnopenableSource(pub &'static str);

impl LogSource for UnopenableSource {
    fn open(&self) -> BoxFuture<'_, io::Result<LogStream>> {
        Box::pin(async move { Err(io::Error::other(self.0)) })
    }
}

/// Consumer that only counts how often it was asked to run
#[derive(Clone, Default)]
pub struct CountingConsumer {
    calls: Arc<AtomicUsize>,
}

impl CountingConsumer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConsumeRequest for CountingConsumer {
    fn consume<'a>(
        &'a self,
        _source: &'a dyn LogSource,
        _out: &'a mut (dyn AsyncWrite + Send + Unpin),
    ) -> BoxFuture<'a, Result<(), LikeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Sink that rejects every write
pub struct FailingWriter;

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Sink that records every underlying write call separately
#[derive(Default)]
pub struct RecordingWriter {
    pub writes: Vec<Vec<u8>>,
    /// Accept at most this many bytes per call
    pub limit: Option<usize>,
}

impl RecordingWriter {
    /// Every recorded write joined back together
    pub fn output(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let n = this.limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        this.writes.push(buf[..n].to_vec());
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
