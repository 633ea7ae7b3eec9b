//! Response handling for generations.

use crate::{Error, FinishReason, StreamEvent, Usage};
use futures_util::stream::Stream;
use std::pin::Pin;

/// Boxed event stream handed out by providers.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>;

/// A complete, buffered generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteResponse {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Response from a streaming generation call that can be streamed or buffered.
pub struct Response {
    stream: EventStream,
}

impl Response {
    /// Create a new response from a stream of events.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<StreamEvent, Error>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Buffer the entire response by consuming the stream.
    pub async fn buffer(self) -> Result<CompleteResponse, Error> {
        Self::buffer_stream(self.stream).await
    }

    /// Get just the text content (convenience method).
    pub async fn text(self) -> Result<String, Error> {
        let complete = self.buffer().await?;
        Ok(complete.text)
    }

    /// Stream the response events.
    pub fn stream(self) -> EventStream {
        self.stream
    }

    /// Buffer a streaming response, stopping at the end-of-stream marker.
    async fn buffer_stream(mut stream: EventStream) -> Result<CompleteResponse, Error> {
        use futures_util::StreamExt;

        let mut accumulator = crate::accumulator::ResponseAccumulator::new();

        while let Some(event_result) = stream.next().await {
            accumulator.process_event(event_result?)?;
            if accumulator.is_finished() {
                break;
            }
        }

        accumulator.finalize()
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_response_buffering() {
        let events = vec![
            Ok(StreamEvent::ContentDelta {
                delta: "Test ".to_string(),
            }),
            Ok(StreamEvent::ContentDelta {
                delta: "response".to_string(),
            }),
            Ok(StreamEvent::Done {
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            }),
        ];

        let response = Response::from_stream(futures_util::stream::iter(events));
        let text = response.text().await.unwrap();
        assert_eq!(text, "Test response");
    }

    #[tokio::test]
    async fn test_buffering_stops_at_done() {
        let events = vec![
            Ok(StreamEvent::ContentDelta {
                delta: "kept".to_string(),
            }),
            Ok(StreamEvent::Done {
                finish_reason: FinishReason::Length,
                usage: Usage::default(),
            }),
            Ok(StreamEvent::ContentDelta {
                delta: " ignored".to_string(),
            }),
        ];

        let complete = Response::from_stream(futures_util::stream::iter(events))
            .buffer()
            .await
            .unwrap();
        assert_eq!(complete.text, "kept");
        assert_eq!(complete.finish_reason, FinishReason::Length);
    }

    #[tokio::test]
    async fn test_buffering_surfaces_mid_stream_error() {
        let events = vec![
            Ok(StreamEvent::ContentDelta {
                delta: "Partial".to_string(),
            }),
            Err(Error::provider("Gemini", "connection reset")),
        ];

        let result = Response::from_stream(futures_util::stream::iter(events))
            .text()
            .await;
        assert!(matches!(result, Err(Error::Provider { .. })));
    }
}
