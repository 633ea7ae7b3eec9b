use super::prompt::{Persona, Prompt, CHAT_PERSONA, SCHEDULE_PERSONA};
use super::record::PatientIntake;
use crate::{Error, ErrorKind};

/// Caller-supplied content for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationInput {
    /// Free text, e.g. a chat message.
    Text(String),
    /// A structured intake record, serialized canonically into the prompt.
    Record(PatientIntake),
}

/// One generation request: who the model should be, and what it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub persona: Persona,
    pub input: GenerationInput,
}

impl GenerationRequest {
    pub fn new(persona: Persona, input: GenerationInput) -> Self {
        Self { persona, input }
    }

    /// A chat turn for the care assistant.
    pub fn chat(prompt: impl Into<String>) -> Self {
        Self::new(CHAT_PERSONA, GenerationInput::Text(prompt.into()))
    }

    /// A daily schedule request for a staged intake record.
    pub fn schedule(intake: PatientIntake) -> Self {
        Self::new(SCHEDULE_PERSONA, GenerationInput::Record(intake))
    }

    /// Validate the input and build the prompt. No I/O happens here.
    pub fn prompt(&self) -> Result<Prompt, Error> {
        match &self.input {
            GenerationInput::Text(text) => self.persona.render(text),
            GenerationInput::Record(intake) => {
                self.persona.render(&intake.to_canonical_json()?)
            }
        }
    }

    /// Check the request without keeping the prompt around.
    pub fn validate(&self) -> Result<(), Error> {
        self.prompt().map(|_| ())
    }
}

/// Outcome of a buffered generation.
#[derive(Debug)]
pub enum GenerationResult {
    Complete(String),
    Failed(Error),
}

impl GenerationResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, GenerationResult::Complete(_))
    }

    /// The failure class, if this result failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            GenerationResult::Complete(_) => None,
            GenerationResult::Failed(e) => Some(e.kind()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationResult::Complete(text) => Some(text),
            GenerationResult::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<String, Error> {
        match self {
            GenerationResult::Complete(text) => Ok(text),
            GenerationResult::Failed(e) => Err(e),
        }
    }
}

impl From<Result<String, Error>> for GenerationResult {
    fn from(result: Result<String, Error>) -> Self {
        match result {
            Ok(text) => GenerationResult::Complete(text),
            Err(e) => GenerationResult::Failed(e),
        }
    }
}
