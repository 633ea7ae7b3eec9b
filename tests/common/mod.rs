#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use care_relay::{
    ChunkSink, Error, FinishReason, GenerationClient, PatientDocument, Prompt, RecordId,
    RecordStore, RelayObserver, RelayState, Response, SinkClosed, StreamEvent,
    StoredRecord, Usage,
};

/// One step of a scripted provider stream.
#[derive(Debug, Clone)]
pub enum Step {
    Chunk(String),
    Done,
    /// The provider reports a failure as an event.
    ErrorEvent(String),
    /// The transport fails.
    Fail(String),
}

impl Step {
    fn into_item(self) -> Result<StreamEvent, Error> {
        match self {
            Step::Chunk(delta) => Ok(StreamEvent::ContentDelta { delta }),
            Step::Done => Ok(StreamEvent::Done {
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            }),
            Step::ErrorEvent(error) => Ok(StreamEvent::Error { error }),
            Step::Fail(message) => Err(Error::provider("Scripted", message)),
        }
    }
}

/// A generation client that replays a fixed script and counts what it was asked.
pub struct ScriptedClient {
    steps: Vec<Step>,
    start_failure: Option<String>,
    calls: AtomicUsize,
    pulled: Arc<AtomicUsize>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            start_failure: None,
            calls: AtomicUsize::new(0),
            pulled: Arc::new(AtomicUsize::new(0)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Streams `chunks` in order, then the end-of-stream marker.
    pub fn chunks(chunks: &[&str]) -> Self {
        let mut steps: Vec<Step> = chunks.iter().map(|c| Step::Chunk(c.to_string())).collect();
        steps.push(Step::Done);
        Self::new(steps)
    }

    pub fn text(text: &str) -> Self {
        Self::chunks(&[text])
    }

    /// Fails before producing any stream.
    pub fn failing(message: &str) -> Self {
        let mut client = Self::new(Vec::new());
        client.start_failure = Some(message.to_string());
        client
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stream items handed to the relay so far.
    pub fn pulled_count(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate_stream(&self, prompt: &Prompt) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if let Some(message) = &self.start_failure {
            return Err(Error::provider("Scripted", message.clone()));
        }

        let pulled = self.pulled.clone();
        let items = futures_util::stream::iter(self.steps.clone()).map(move |step| {
            pulled.fetch_add(1, Ordering::SeqCst);
            step.into_item()
        });
        Ok(Response::from_stream(items))
    }
}

/// Collects chunks; can be told to report the consumer as gone.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub chunks: Vec<String>,
    pub finished: bool,
    /// Report closed once this many chunks were accepted.
    close_after: Option<usize>,
    /// Refuse writes once this many chunks were accepted, without reporting closed.
    refuse_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closing_after(chunks: usize) -> Self {
        Self {
            close_after: Some(chunks),
            ..Self::default()
        }
    }

    pub fn refusing_after(chunks: usize) -> Self {
        Self {
            refuse_after: Some(chunks),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.chunks.concat()
    }
}

#[async_trait]
impl ChunkSink for RecordingSink {
    async fn send_chunk(&mut self, chunk: String) -> Result<(), SinkClosed> {
        let refused = self
            .refuse_after
            .is_some_and(|limit| self.chunks.len() >= limit);
        if self.is_closed() || refused {
            return Err(SinkClosed);
        }
        self.chunks.push(chunk);
        Ok(())
    }

    async fn finish(&mut self) {
        self.finished = true;
    }

    fn is_closed(&self) -> bool {
        self.finished
            || self
                .close_after
                .is_some_and(|limit| self.chunks.len() >= limit)
    }
}

/// Records every transition.
#[derive(Default)]
pub struct RecordingObserver {
    states: Mutex<Vec<RelayState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<RelayState> {
        self.states.lock().clone()
    }

    pub fn terminal(&self) -> Option<RelayState> {
        self.states.lock().last().filter(|s| s.is_terminal()).cloned()
    }
}

impl RelayObserver for RecordingObserver {
    fn on_transition(&self, state: &RelayState) {
        self.states.lock().push(state.clone());
    }
}

/// A store whose writes always fail.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn insert(&self, _document: PatientDocument) -> Result<StoredRecord, Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::store("write refused"))
    }

    async fn get(&self, _id: &RecordId) -> Result<Option<StoredRecord>, Error> {
        Ok(None)
    }
}
