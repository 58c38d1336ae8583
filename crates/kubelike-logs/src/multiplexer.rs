use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tracing::debug;

use kubelike_types::DEFAULT_MAX_FOLLOW_CONCURRENCY;

use crate::error::LikeError;
use crate::filter::{ConsumeRequest, LineFilter};
use crate::pipe::merge_pipe;
use crate::policy::FailurePolicy;
use crate::prefix::{Prefixer, Tagger};
use crate::source::LogSources;

/// Pending writes allowed in the merge pipe before followers wait
const MERGE_PIPE_CAPACITY: usize = 1;

/// Options for one filtering run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LikeOptions {
    /// Regex every forwarded line must match
    pub pattern: String,
    /// Whether the streams are being followed
    pub follow: bool,
    /// Keep going when a single source fails
    pub ignore_errors: bool,
    /// Maximum number of streams followed at once
    pub max_follow_concurrency: usize,
    /// Prefix each line with its pod and container
    pub prefix: bool,
}

impl Default for LikeOptions {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            follow: false,
            ignore_errors: false,
            max_follow_concurrency: DEFAULT_MAX_FOLLOW_CONCURRENCY,
            prefix: false,
        }
    }
}

/// Compile the pattern in `options` and stream every matching line from
/// `sources` into `out`.
pub async fn stream_matching_logs<W>(
    sources: LogSources,
    out: &mut W,
    options: &LikeOptions,
) -> Result<(), LikeError>
where
    W: AsyncWrite + Send + Unpin,
{
    let filter = LineFilter::new(&options.pattern)?;
    LogMultiplexer::new(Arc::new(filter), options)
        .run(sources, out)
        .await
}

/// Runs a consume strategy over many sources and joins their output
pub struct LogMultiplexer {
    consumer: Arc<dyn ConsumeRequest>,
    prefixer: Prefixer,
    policy: FailurePolicy,
    follow: bool,
    max_follow_concurrency: usize,
}

impl LogMultiplexer {
    pub fn new(consumer: Arc<dyn ConsumeRequest>, options: &LikeOptions) -> Self {
        Self {
            consumer,
            prefixer: Prefixer::new(options.prefix),
            policy: FailurePolicy::from_ignore_errors(options.ignore_errors),
            follow: options.follow,
            max_follow_concurrency: options.max_follow_concurrency,
        }
    }

    /// Replace how sources are turned into line prefixes
    pub fn with_tagger(mut self, tagger: Tagger) -> Self {
        self.prefixer = self.prefixer.with_tagger(tagger);
        self
    }

    /// Consume every source into `out`.
    ///
    /// Followed streams from more than one source are read concurrently;
    /// anything else is read one source at a time in key order.
    pub async fn run<W>(&self, sources: LogSources, out: &mut W) -> Result<(), LikeError>
    where
        W: AsyncWrite + Send + Unpin,
    {
        if self.follow && sources.len() > 1 {
            if sources.len() > self.max_follow_concurrency {
                return Err(LikeError::ConcurrencyLimit {
                    requested: sources.len(),
                    limit: self.max_follow_concurrency,
                });
            }
            return self.parallel(sources, out).await;
        }

        self.sequential(sources, out).await
    }

    async fn sequential<W>(&self, sources: LogSources, out: &mut W) -> Result<(), LikeError>
    where
        W: AsyncWrite + Send + Unpin,
    {
        debug!(sources = sources.len(), "reading log streams sequentially");

        for (source_ref, source) in &sources {
            let result = {
                let mut writer = self.prefixer.wrap(source_ref, &mut *out);
                let consumed = self.consumer.consume(source.as_ref(), &mut writer).await;
                // Finish any line the destination only partly took
                let flushed = writer.flush().await.map_err(LikeError::Destination);
                flushed.and(consumed)
            };

            if let Err(err) = result {
                let marker = self.policy.resolve(err)?;
                out.write_all(&marker)
                    .await
                    .map_err(LikeError::Destination)?;
            }
            debug!(source = %source_ref, "log stream finished");
        }

        out.flush().await.map_err(LikeError::Destination)
    }

    async fn parallel<W>(&self, sources: LogSources, out: &mut W) -> Result<(), LikeError>
    where
        W: AsyncWrite + Send + Unpin,
    {
        debug!(sources = sources.len(), "following log streams in parallel");

        let (writer, reader) = merge_pipe(MERGE_PIPE_CAPACITY);
        let mut workers = JoinSet::new();

        for (source_ref, source) in sources {
            let consumer = Arc::clone(&self.consumer);
            let policy = self.policy;
            let mut prefixed = self.prefixer.wrap(&source_ref, writer.clone());
            let mut pipe = writer.clone();

            workers.spawn(async move {
                let consumed = consumer.consume(source.as_ref(), &mut prefixed).await;
                let flushed = prefixed.flush().await.map_err(LikeError::Destination);
                drop(prefixed);
                let result = flushed.and(consumed);

                let Err(err) = result else {
                    debug!(source = %source_ref, "log stream finished");
                    return;
                };

                match policy.resolve(err) {
                    Ok(marker) => {
                        // Fails only when the reader has already stopped
                        let _ = pipe.write_all(&marker).await;
                    }
                    Err(LikeError::Destination(_)) => {}
                    Err(err) => pipe.close_with_error(err).await,
                }
            });
        }

        // The pipe closes once the last worker drops its writers
        drop(writer);

        // Returning early drops `workers`, aborting anything still running
        reader.copy_to(out).await?;

        while let Some(joined) = workers.join_next().await {
            joined?;
        }
        Ok(())
    }
}
