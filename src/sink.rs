//! Destinations for streamed generation text.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Prefix of the in-band marker written when a stream fails after it started.
pub const ERROR_MARKER_PREFIX: &str = "\n[error] ";

/// The in-band marker for a failed stream.
pub fn error_marker(reason: &str) -> String {
    format!("{ERROR_MARKER_PREFIX}{reason}")
}

/// The downstream consumer went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("downstream consumer disconnected")]
pub struct SinkClosed;

/// Where the relay writes chunks, in order, as they arrive.
#[async_trait::async_trait]
pub trait ChunkSink: Send {
    /// Write one chunk. Suspends until the consumer has room for it.
    async fn send_chunk(&mut self, chunk: String) -> Result<(), SinkClosed>;

    /// Write the in-band error marker.
    async fn send_error(&mut self, reason: &str) -> Result<(), SinkClosed> {
        self.send_chunk(error_marker(reason)).await
    }

    /// Signal end of stream. Idempotent.
    async fn finish(&mut self);

    /// Whether the consumer has gone away.
    fn is_closed(&self) -> bool;

    /// Resolves once the consumer has gone away, so a pending provider read
    /// can be abandoned. The default only sees a closure `is_closed` already
    /// reports and otherwise never resolves.
    async fn closed(&mut self) {
        if !self.is_closed() {
            std::future::pending::<()>().await;
        }
    }
}

/// A sink backed by a bounded channel, e.g. feeding an HTTP response body.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink with room for a single chunk, so the producer runs at most one
    /// chunk ahead of the consumer.
    pub fn channel() -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(1);
        (Self::new(tx), rx)
    }
}

#[async_trait::async_trait]
impl ChunkSink for ChannelSink {
    async fn send_chunk(&mut self, chunk: String) -> Result<(), SinkClosed> {
        let tx = self.tx.as_ref().ok_or(SinkClosed)?;
        // An empty body frame carries nothing; accept it without a write.
        if chunk.is_empty() {
            return if tx.is_closed() { Err(SinkClosed) } else { Ok(()) };
        }
        tx.send(Bytes::from(chunk)).await.map_err(|_| SinkClosed)
    }

    async fn finish(&mut self) {
        // Dropping the last sender ends the receiver's stream.
        self.tx.take();
    }

    fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }

    async fn closed(&mut self) {
        if let Some(tx) = &self.tx {
            tx.closed().await;
        }
    }
}
