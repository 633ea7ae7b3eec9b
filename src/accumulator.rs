//! Delta accumulation logic for streaming responses.

use crate::types::{FinishReason, StreamEvent, Usage};
use crate::CompleteResponse;
use crate::Error;

/// Accumulates streaming deltas into a complete response.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    /// Text received so far, in arrival order.
    content: String,
    /// Final finish reason (if received).
    finish_reason: Option<FinishReason>,
    /// Final usage statistics (if received).
    usage: Option<Usage>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event and update the accumulation.
    pub fn process_event(&mut self, event: StreamEvent) -> Result<(), Error> {
        match event {
            StreamEvent::ContentDelta { delta } => {
                self.content.push_str(&delta);
            }
            StreamEvent::Done {
                finish_reason,
                usage,
            } => {
                self.finish_reason = Some(finish_reason);
                self.usage = Some(usage);
            }
            StreamEvent::Error { error } => {
                return Err(Error::streaming(error));
            }
        }

        Ok(())
    }

    /// Whether the end-of-stream marker has been seen.
    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Get the current accumulated content.
    pub fn current_content(&self) -> &str {
        &self.content
    }

    /// Finalize and return the complete response.
    ///
    /// Fails if the stream never delivered its end-of-stream marker.
    pub fn finalize(self) -> Result<CompleteResponse, Error> {
        let finish_reason = self.finish_reason.ok_or_else(|| {
            Error::streaming("provider stream ended before its completion marker")
        })?;

        Ok(CompleteResponse {
            text: self.content,
            finish_reason,
            usage: self.usage.unwrap_or_default(),
        })
    }
}
