//! Schedule generation for intake records, and persisting the result.

use serde_json::Value;
use std::sync::Arc;

use crate::relay::GenerationRelay;
use crate::store::{RecordId, RecordStore, StoredRecord};
use crate::{Error, ErrorKind, GenerationRequest, PatientDocument, PatientIntake};

/// Attaches a generated schedule to a staged record and inserts it once.
#[derive(Clone)]
pub struct SchedulePersistence {
    store: Arc<dyn RecordStore>,
}

impl SchedulePersistence {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Insert `intake` with `generated_text` as its schedule. There is no
    /// separate update step; a failure here means nothing was stored.
    pub async fn attach_and_store(
        &self,
        intake: PatientIntake,
        generated_text: String,
    ) -> Result<StoredRecord, Error> {
        let document = PatientDocument::staged(intake).with_schedule(generated_text);
        self.store.insert(document).await
    }

    pub async fn fetch(&self, id: &RecordId) -> Result<Option<StoredRecord>, Error> {
        self.store.get(id).await
    }
}

/// Failure of an intake submission.
///
/// When generation succeeded but storing failed, the text is handed back so
/// the caller can still show it; it has no id because nothing was saved.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SubmitError {
    pub error: Error,
    pub unsaved_schedule: Option<String>,
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<Error> for SubmitError {
    fn from(error: Error) -> Self {
        Self {
            error,
            unsaved_schedule: None,
        }
    }
}

/// Intake submission and lookup: validate, generate, persist.
#[derive(Clone)]
pub struct ScheduleService {
    relay: GenerationRelay,
    persistence: SchedulePersistence,
}

impl ScheduleService {
    pub fn new(relay: GenerationRelay, store: Arc<dyn RecordStore>) -> Self {
        Self {
            relay,
            persistence: SchedulePersistence::new(store),
        }
    }

    /// Validate `body`, generate its schedule, and store both together.
    ///
    /// A rejected body or a failed generation stores nothing.
    pub async fn submit_intake(&self, body: &Value) -> Result<StoredRecord, SubmitError> {
        let intake = PatientIntake::from_json(body)?;

        let schedule = self
            .relay
            .run_buffered(&GenerationRequest::schedule(intake.clone()))
            .await
            .into_result()?;

        match self
            .persistence
            .attach_and_store(intake, schedule.clone())
            .await
        {
            Ok(record) => {
                tracing::info!(id = %record.id, "stored patient record with schedule");
                Ok(record)
            }
            Err(error) => {
                tracing::warn!(%error, "schedule generated but record was not stored");
                Err(SubmitError {
                    error,
                    unsaved_schedule: Some(schedule),
                })
            }
        }
    }

    /// The full stored record for `id`.
    pub async fn fetch_record(&self, id: &str) -> Result<StoredRecord, Error> {
        let record_id: RecordId = id.parse()?;
        self.persistence
            .fetch(&record_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no record with id '{id}'")))
    }

    /// The generated schedule stored with record `id`.
    pub async fn fetch_schedule(&self, id: &str) -> Result<String, Error> {
        self.fetch_record(id)
            .await?
            .document
            .generated_schedule
            .ok_or_else(|| Error::not_found(format!("record '{id}' has no schedule")))
    }
}
