use parking_lot::RwLock;
use std::collections::HashMap;

use super::{RecordId, RecordStore, StoredRecord};
use crate::{Error, PatientDocument};

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordId, StoredRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, document: PatientDocument) -> Result<StoredRecord, Error> {
        let record = StoredRecord {
            id: RecordId::generate(),
            document,
        };
        self.records.write().insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>, Error> {
        Ok(self.records.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatientIntake;

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids() {
        let store = MemoryRecordStore::new();
        let first = store
            .insert(PatientDocument::staged(PatientIntake::default()))
            .await
            .unwrap();
        let second = store
            .insert(PatientDocument::staged(PatientIntake::default()))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryRecordStore::new();
        assert!(store.get(&RecordId::generate()).await.unwrap().is_none());
    }
}
