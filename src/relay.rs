//! The generation relay: one request in, one buffered or streamed result out.

use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::observer::{NoopObserver, RelayObserver};
use crate::provider::GenerationClient;
use crate::sink::ChunkSink;
use crate::{Error, ErrorKind, GenerationRequest, GenerationResult, StreamEvent};

/// Where a single relay run currently is.
///
/// `Validating` leads to `Rejected` or `Calling`. A buffered run ends in
/// `Completed` or `Failed`; a streamed run passes through `StreamingChunk` once
/// per forwarded chunk and ends in `StreamEnded`, `StreamFailed` or
/// `StreamCancelled`. Nothing re-enters `Calling`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Validating,
    Rejected {
        reason: String,
    },
    Calling,
    StreamingChunk {
        index: usize,
    },
    Completed,
    Failed {
        kind: ErrorKind,
        reason: String,
    },
    StreamEnded {
        forwarded: usize,
    },
    StreamFailed {
        kind: ErrorKind,
        reason: String,
        forwarded: usize,
    },
    StreamCancelled {
        forwarded: usize,
    },
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RelayState::Rejected { .. }
                | RelayState::Completed
                | RelayState::Failed { .. }
                | RelayState::StreamEnded { .. }
                | RelayState::StreamFailed { .. }
                | RelayState::StreamCancelled { .. }
        )
    }
}

/// Tuning knobs for the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOptions {
    /// Bounds the buffered call, the stream start and each chunk wait.
    /// `None` waits as long as the provider does.
    pub timeout: Option<Duration>,
}

impl RelayOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How a streamed run ended.
#[derive(Debug)]
pub enum StreamOutcome {
    /// Nothing was sent to the provider or the sink.
    Rejected(Error),
    /// Every chunk was forwarded and the sink was closed.
    Ended { chunks: usize },
    /// The provider failed; the marker was written and the sink closed.
    Failed { chunks: usize, error: Error },
    /// The consumer went away; the provider stream was dropped.
    Cancelled { chunks: usize },
}

impl StreamOutcome {
    /// Chunks forwarded before the terminal event.
    pub fn chunks(&self) -> usize {
        match self {
            StreamOutcome::Rejected(_) => 0,
            StreamOutcome::Ended { chunks }
            | StreamOutcome::Failed { chunks, .. }
            | StreamOutcome::Cancelled { chunks } => *chunks,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, StreamOutcome::Ended { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            StreamOutcome::Rejected(error) | StreamOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Runs generation requests against a client. Holds no per-request state and
/// can be cloned freely across tasks.
#[derive(Clone)]
pub struct GenerationRelay {
    client: Arc<dyn GenerationClient>,
    observer: Arc<dyn RelayObserver>,
    options: RelayOptions,
}

impl GenerationRelay {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            observer: Arc::new(NoopObserver),
            options: RelayOptions::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: RelayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> RelayOptions {
        self.options
    }

    /// Generate the full text in one call.
    ///
    /// Empty input is rejected without touching the client; otherwise the
    /// client is called exactly once.
    pub async fn run_buffered(&self, request: &GenerationRequest) -> GenerationResult {
        self.transition(RelayState::Validating);
        let prompt = match request.prompt() {
            Ok(prompt) => prompt,
            Err(error) => {
                self.transition(RelayState::Rejected {
                    reason: error.to_string(),
                });
                return GenerationResult::Failed(error);
            }
        };

        self.transition(RelayState::Calling);
        match self.bounded(self.client.generate(&prompt)).await {
            Ok(text) => {
                self.transition(RelayState::Completed);
                GenerationResult::Complete(text)
            }
            Err(error) => {
                self.transition(RelayState::Failed {
                    kind: error.kind(),
                    reason: error.to_string(),
                });
                GenerationResult::Failed(error)
            }
        }
    }

    /// Forward the generation to `sink` chunk by chunk.
    ///
    /// Each chunk is written before the next one is pulled from the provider,
    /// so a slow sink slows the provider read. A consumer that goes away while
    /// a read is pending cancels the run and drops the provider stream. On
    /// rejection the sink is left untouched; every other outcome closes it.
    pub async fn run_streaming<S>(&self, request: &GenerationRequest, sink: &mut S) -> StreamOutcome
    where
        S: ChunkSink + ?Sized,
    {
        self.transition(RelayState::Validating);
        let prompt = match request.prompt() {
            Ok(prompt) => prompt,
            Err(error) => {
                self.transition(RelayState::Rejected {
                    reason: error.to_string(),
                });
                return StreamOutcome::Rejected(error);
            }
        };

        self.transition(RelayState::Calling);
        let mut stream = match self.bounded(self.client.generate_stream(&prompt)).await {
            Ok(response) => response.stream(),
            Err(error) => return self.fail_stream(sink, error, 0).await,
        };

        let mut forwarded = 0;
        loop {
            if sink.is_closed() {
                return self.cancel_stream(forwarded);
            }

            // A consumer that leaves while the provider is silent releases the stream.
            let pulled = tokio::select! {
                biased;
                () = sink.closed() => None,
                pulled = self.bounded(async { Ok(stream.next().await) }) => Some(pulled),
            };

            let next = match pulled {
                None => return self.cancel_stream(forwarded),
                Some(Ok(next)) => next,
                Some(Err(error)) => Some(Err(error)),
            };

            match next {
                Some(Ok(StreamEvent::ContentDelta { delta })) => {
                    if sink.send_chunk(delta).await.is_err() {
                        return self.cancel_stream(forwarded);
                    }
                    self.transition(RelayState::StreamingChunk { index: forwarded });
                    forwarded += 1;
                }
                Some(Ok(StreamEvent::Done { .. })) => {
                    sink.finish().await;
                    self.transition(RelayState::StreamEnded { forwarded });
                    return StreamOutcome::Ended { chunks: forwarded };
                }
                Some(Ok(StreamEvent::Error { error })) => {
                    return self
                        .fail_stream(sink, Error::streaming(error), forwarded)
                        .await;
                }
                Some(Err(error)) => return self.fail_stream(sink, error, forwarded).await,
                None => {
                    let error = Error::streaming("provider stream ended before its completion marker");
                    return self.fail_stream(sink, error, forwarded).await;
                }
            }
        }
    }

    async fn fail_stream<S>(&self, sink: &mut S, error: Error, forwarded: usize) -> StreamOutcome
    where
        S: ChunkSink + ?Sized,
    {
        // The consumer may already be gone; the outcome is the same.
        let _ = sink.send_error(&error.to_string()).await;
        sink.finish().await;

        self.transition(RelayState::StreamFailed {
            kind: error.kind(),
            reason: error.to_string(),
            forwarded,
        });
        StreamOutcome::Failed {
            chunks: forwarded,
            error,
        }
    }

    fn cancel_stream(&self, forwarded: usize) -> StreamOutcome {
        self.transition(RelayState::StreamCancelled { forwarded });
        StreamOutcome::Cancelled { chunks: forwarded }
    }

    /// Apply the configured timeout, if any.
    async fn bounded<T, F>(&self, future: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => future.await,
        }
    }

    fn transition(&self, state: RelayState) {
        self.observer.on_transition(&state);
    }
}

impl std::fmt::Debug for GenerationRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRelay")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
