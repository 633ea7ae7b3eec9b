//! Types for streaming responses.

use serde::{Deserialize, Serialize};

use crate::types::Usage;

/// Events that can be emitted during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of generated text was received.
    ContentDelta { delta: String },
    /// The provider signalled the end of the stream.
    Done {
        finish_reason: FinishReason,
        usage: Usage,
    },
    /// The provider reported a failure inside the stream.
    Error { error: String },
}

impl StreamEvent {
    /// Whether this event ends the stream, successfully or not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::ContentDelta { .. })
    }
}

/// Reason why generation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model finished its answer.
    Stop,
    /// The output token limit was reached.
    Length,
}
