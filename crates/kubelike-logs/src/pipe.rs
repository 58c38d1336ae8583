use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

use crate::error::LikeError;

type Chunk = Result<Vec<u8>, LikeError>;

/// Create a bounded merge point for concurrent log writers.
///
/// Every write on a [`PipeWriter`] becomes one message, so writes from
/// different writers never interleave inside each other. Writers wait while
/// `capacity` messages are pending, which keeps fast streams from running
/// ahead of the reader. The pipe closes once every writer is dropped.
pub fn merge_pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        PipeWriter {
            sender: PollSender::new(tx.clone()),
            tx,
        },
        PipeReader { rx },
    )
}

/// Write half of a [`merge_pipe`]
pub struct PipeWriter {
    tx: mpsc::Sender<Chunk>,
    sender: PollSender<Chunk>,
}

impl PipeWriter {
    /// Hand `err` to the reader after anything already written.
    ///
    /// The reader stops at the error, so writes still pending from other
    /// writers fail with a broken pipe.
    pub async fn close_with_error(&self, err: LikeError) {
        // A closed reader already has its result
        let _ = self.tx.send(Err(err)).await;
    }
}

impl Clone for PipeWriter {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            sender: PollSender::new(self.tx.clone()),
        }
    }
}

fn broken_pipe<T>(_: T) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "log reader has gone away")
}

impl AsyncWrite for PipeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let this = self.get_mut();
        ready!(this.sender.poll_reserve(cx)).map_err(broken_pipe)?;
        this.sender.send_item(Ok(buf.to_vec())).map_err(broken_pipe)?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().sender.close();
        Poll::Ready(Ok(()))
    }
}

/// Read half of a [`merge_pipe`]
pub struct PipeReader {
    rx: mpsc::Receiver<Chunk>,
}

impl PipeReader {
    /// Drain the pipe into `out` until every writer is gone.
    ///
    /// Fails with the error a writer closed the pipe with, once everything
    /// written before it has been copied.
    pub async fn copy_to<W>(mut self, out: &mut W) -> Result<(), LikeError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        while let Some(chunk) = self.rx.recv().await {
            let bytes = chunk?;
            out.write_all(&bytes).await.map_err(LikeError::Destination)?;
        }
        out.flush().await.map_err(LikeError::Destination)
    }
}
