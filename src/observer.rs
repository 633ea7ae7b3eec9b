//! Hooks for watching the relay's state machine from outside.

use crate::relay::RelayState;

/// Receives every relay state transition, in order.
///
/// Implementations must be cheap; they run inline on the request task.
pub trait RelayObserver: Send + Sync {
    fn on_transition(&self, state: &RelayState);
}

/// Ignores every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RelayObserver for NoopObserver {
    fn on_transition(&self, _state: &RelayState) {}
}

/// Logs transitions through `tracing`.
///
/// Per-chunk transitions go to `trace`, failures to `warn`, the rest to `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn on_transition(&self, state: &RelayState) {
        match state {
            RelayState::StreamingChunk { index } => {
                tracing::trace!(index, "relay forwarded chunk");
            }
            RelayState::Rejected { reason } => {
                tracing::debug!(%reason, "relay rejected request");
            }
            RelayState::Failed { kind, reason } => {
                tracing::warn!(?kind, %reason, "generation failed");
            }
            RelayState::StreamFailed {
                kind,
                reason,
                forwarded,
            } => {
                tracing::warn!(?kind, %reason, forwarded, "generation stream failed");
            }
            RelayState::StreamCancelled { forwarded } => {
                tracing::info!(forwarded, "generation stream cancelled by client");
            }
            RelayState::StreamEnded { forwarded } => {
                tracing::debug!(forwarded, "generation stream ended");
            }
            other => {
                tracing::debug!(state = ?other, "relay transition");
            }
        }
    }
}
