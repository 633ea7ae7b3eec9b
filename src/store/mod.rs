//! Record storage behind an async trait.

mod memory;
mod sled_store;

pub use memory::MemoryRecordStore;
pub use sled_store::SledRecordStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::{Error, PatientDocument};

/// Store-assigned record identifier: 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::not_found(format!("no record with id '{s}'"));
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        Uuid::parse_str(s).map(Self).map_err(|_| invalid())
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A document together with the id the store gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub document: PatientDocument,
}

/// Persists patient documents. Every insert is independent; there is no update.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Insert a document, assigning it a fresh id.
    async fn insert(&self, document: PatientDocument) -> Result<StoredRecord, Error>;

    /// Look a record up by id.
    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>, Error>;
}

/// Open the store selected by configuration: `sled` at `path`, or memory.
pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn RecordStore>, Error> {
    match path {
        Some(path) => Ok(Arc::new(SledRecordStore::open(path)?)),
        None => Ok(Arc::new(MemoryRecordStore::new())),
    }
}
