use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use tokio::io::AsyncWrite;

use kubelike_types::SourceRef;

/// Maps a source to the tag its lines are prefixed with
pub type Tagger = Arc<dyn Fn(&SourceRef) -> Option<String> + Send + Sync>;

/// Decides which writers get a source prefix
#[derive(Clone)]
pub struct Prefixer {
    enabled: bool,
    tagger: Tagger,
}

impl Prefixer {
    /// Prefix with `pod/<name>/<container>` when enabled
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            tagger: Arc::new(SourceRef::container_tag),
        }
    }

    pub fn with_tagger(mut self, tagger: Tagger) -> Self {
        self.tagger = tagger;
        self
    }

    /// Wrap `inner` for writing lines from `source`.
    ///
    /// The result passes writes straight through when prefixing is disabled
    /// or the source has no tag.
    pub fn wrap<W>(&self, source: &SourceRef, inner: W) -> PrefixWriter<W> {
        let prefix = if self.enabled {
            (self.tagger)(source).map(|tag| format!("[{}] ", tag).into_bytes())
        } else {
            None
        };
        PrefixWriter {
            prefix,
            pending: Vec::new(),
            inner,
        }
    }
}

impl std::fmt::Debug for Prefixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefixer")
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Writer that puts a fixed prefix in front of every write.
///
/// The prefix and the payload go out in a single call to the inner writer,
/// so a writer shared with other sources never sees them split apart. When
/// the inner writer takes only part of a prefixed line, the rest is held
/// back and finished before the next write or on flush, so callers must
/// flush before dropping the writer.
pub struct PrefixWriter<W> {
    prefix: Option<Vec<u8>>,
    /// Tail of a prefixed line the inner writer has not taken yet
    pending: Vec<u8>,
    inner: W,
}

impl<W> PrefixWriter<W> {
    #[cfg(test)]
    fn prefix(&self) -> Option<&[u8]> {
        self.prefix.as_deref()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> PrefixWriter<W> {
    /// Hand any held back bytes to the inner writer
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.pending.is_empty() {
            let written = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending))?;
            if written == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.pending.drain(..written);
        }
        Poll::Ready(Ok(()))
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for PrefixWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;

        let Some(prefix) = &this.prefix else {
            return Pin::new(&mut this.inner).poll_write(cx, buf);
        };

        let mut line = Vec::with_capacity(prefix.len() + buf.len());
        line.extend_from_slice(prefix);
        line.extend_from_slice(buf);

        let written = ready!(Pin::new(&mut this.inner).poll_write(cx, &line))?;
        if written == 0 {
            return Poll::Ready(Ok(0));
        }
        if written < line.len() {
            line.drain(..written);
            this.pending = line;
        }

        // The whole payload is now either written or held in `pending`
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
