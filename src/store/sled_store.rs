use std::path::Path;

use super::{RecordId, RecordStore, StoredRecord};
use crate::{Error, PatientDocument};

/// Embedded on-disk store. Values are the JSON form of `StoredRecord`.
pub struct SledRecordStore {
    db: sled::Db,
}

impl SledRecordStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            Error::store(format!(
                "Failed to open sled database at {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(Self { db })
    }

    /// A record the caller never gets an id for must not stay behind, so an
    /// unflushed insert is removed again.
    fn settle_insert(&self, id: &RecordId, flushed: sled::Result<usize>) -> Result<(), Error> {
        let Err(e) = flushed else {
            return Ok(());
        };
        if let Err(remove_error) = self.db.remove(id.as_bytes()) {
            tracing::error!(%id, error = %remove_error, "failed to roll back unflushed record");
        }
        Err(Error::store(format!("Failed to flush database: {e}")))
    }
}

#[async_trait::async_trait]
impl RecordStore for SledRecordStore {
    async fn insert(&self, document: PatientDocument) -> Result<StoredRecord, Error> {
        let record = StoredRecord {
            id: RecordId::generate(),
            document,
        };
        let value = serde_json::to_vec(&record)
            .map_err(|e| Error::store(format!("Failed to serialize record: {e}")))?;

        self.db
            .insert(record.id.as_bytes(), value)
            .map_err(|e| Error::store(format!("Failed to insert record: {e}")))?;
        let flushed = self.db.flush_async().await;
        self.settle_insert(&record.id, flushed)?;

        Ok(record)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>, Error> {
        let value = self
            .db
            .get(id.as_bytes())
            .map_err(|e| Error::store(format!("Failed to get record: {e}")))?;

        match value {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| Error::store(format!("Failed to deserialize record: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatientIntake;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sled_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("records");

        let intake = PatientIntake::from_json(&json!({
            "personalInfo": { "name": "Ann" },
            "medicalInfo": { "surgeryType": "knee", "medications": ["ibuprofen"] }
        }))
        .unwrap();

        let store = SledRecordStore::open(&path).unwrap();
        let stored = store
            .insert(PatientDocument::staged(intake).with_schedule("| 08:00 | Walk |"))
            .await
            .unwrap();

        let fetched = store.get(&stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(
            fetched.document.generated_schedule.as_deref(),
            Some("| 08:00 | Walk |")
        );
    }

    #[tokio::test]
    async fn test_failed_flush_rolls_back_insert() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledRecordStore::open(temp_dir.path()).unwrap();
        let id = RecordId::generate();
        store.db.insert(id.as_bytes(), b"{}".to_vec()).unwrap();

        let result = store.settle_insert(&id, Err(sled::Error::Unsupported("disk full".to_string())));

        assert!(matches!(result, Err(Error::Store(ref m)) if m.contains("disk full")));
        assert!(store.db.get(id.as_bytes()).unwrap().is_none());
        assert!(store.settle_insert(&id, Ok(0)).is_ok());
    }

    #[tokio::test]
    async fn test_sled_missing_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledRecordStore::open(temp_dir.path()).unwrap();
        assert!(store.get(&RecordId::generate()).await.unwrap().is_none());
    }
}
