//! Relay between a patient-intake service and Google Gemini.
//!
//! The crate builds persona prompts, calls Gemini buffered or streaming,
//! forwards streamed text to a back-pressured sink, and stores generated care
//! schedules next to the intake record they were made from.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod factory;
pub mod logging;
pub mod observer;
pub mod provider;
pub mod providers;
pub mod relay;
pub mod response;
pub mod schedule;
pub mod server;
pub mod sink;
pub mod sse_stream;
pub mod store;
pub mod types;

// Re-export core types for easy usage
pub use accumulator::ResponseAccumulator;
pub use config::RelayConfig;
pub use error::{Error, ErrorKind};
pub use factory::{ProviderConfig, ProviderFactory};
pub use observer::{NoopObserver, RelayObserver, TracingObserver};
pub use provider::GenerationClient;
pub use providers::*;
pub use relay::{GenerationRelay, RelayOptions, RelayState, StreamOutcome};
pub use response::*;
pub use schedule::{SchedulePersistence, ScheduleService, SubmitError};
pub use sink::{error_marker, ChannelSink, ChunkSink, SinkClosed, ERROR_MARKER_PREFIX};
pub use sse_stream::SseEvent;
pub use store::{MemoryRecordStore, RecordId, RecordStore, SledRecordStore, StoredRecord};
pub use types::*;
