use futures::future::BoxFuture;
use futures::{AsyncBufRead, AsyncBufReadExt};
use regex::bytes::Regex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::LikeError;
use crate::source::LogSource;

/// Strategy for turning one log source into output bytes.
///
/// [`LineFilter`] is the implementation used by the binary; tests swap in
/// stubs to observe how the multiplexer drives its sources.
pub trait ConsumeRequest: Send + Sync {
    fn consume<'a>(
        &'a self,
        source: &'a dyn LogSource,
        out: &'a mut (dyn AsyncWrite + Send + Unpin),
    ) -> BoxFuture<'a, Result<(), LikeError>>;
}

/// Compiled line pattern applied to every log line
pub struct LineFilter {
    /// Compiled pattern, shared by every stream this filter consumes
    regex: Regex,

    /// Original pattern string
    pattern: String,
}

impl LineFilter {
    /// Compile a filter from a pattern string. An empty pattern matches every line.
    pub fn new(pattern: &str) -> Result<Self, LikeError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            pattern: pattern.to_string(),
        })
    }
}

impl std::fmt::Debug for LineFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineFilter")
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl ConsumeRequest for LineFilter {
    fn consume<'a>(
        &'a self,
        source: &'a dyn LogSource,
        out: &'a mut (dyn AsyncWrite + Send + Unpin),
    ) -> BoxFuture<'a, Result<(), LikeError>> {
        Box::pin(async move {
            let stream = source.open().await.map_err(LikeError::Source)?;
            filter_lines(stream, &self.regex, out).await
        })
    }
}

/// Copy the lines of `stream` that match `pattern` into `out`.
///
/// Each chunk read is tested before end of stream is checked, so a final
/// line without a trailing newline is still forwarded, and the empty read
/// that signals end of stream is tested too.
pub async fn filter_lines<R, W>(
    mut stream: R,
    pattern: &Regex,
    out: &mut W,
) -> Result<(), LikeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        stream
            .read_until(b'\n', &mut line)
            .await
            .map_err(LikeError::Source)?;

        // No terminator means the reader hit end of stream
        let at_end = line.last() != Some(&b'\n');

        if pattern.is_match(&line) {
            out.write_all(&line).await.map_err(LikeError::Destination)?;
        }

        if at_end {
            return Ok(());
        }
    }
}
