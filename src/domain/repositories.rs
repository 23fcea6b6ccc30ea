//! Domain repository traits - Abstractions over event data and durable storage

use crate::types::{ManifestEntry, Node};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Source of event node lists
///
/// This trait defines where the nodes of an event come from, without
/// specifying implementation details (file system, HTTP, memory, etc.)
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load the ordered node list of an event
    async fn load_event(&self, event_id: &str) -> Result<Vec<Node>, RepositoryError>;
}

/// Source of the event manifest, read once per session
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    async fn load_manifest(&self) -> Result<Vec<ManifestEntry>, RepositoryError>;
}

/// Durable key-value store for progress and save slots
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value
    async fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError>;

    /// Read the value under `key`, `None` if nothing was ever written
    async fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError>;
}

/// Directory of save slots: slot name to its metadata
pub type SlotDirectory = BTreeMap<String, SlotEntry>;

/// Directory metadata of a single save slot
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlotEntry {
    pub timestamp: String,
}

/// Secondary copy of the slot directory kept outside the local store
#[async_trait]
pub trait SlotDirectoryMirror: Send + Sync {
    /// Publish the full directory
    async fn publish(&self, directory: &SlotDirectory) -> Result<(), PersistenceError>;
}

/// Event data provider errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Event not found: {id}")]
    EventNotFound {
        id: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Repository unavailable: {reason}")]
    Unavailable { reason: String },
}

impl RepositoryError {
    /// Create a not found error with an optional source
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::EventNotFound {
            id: id.into(),
            source: Some(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Event not found",
            ))),
        }
    }
}

/// Persistence store errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error on '{key}': {message}")]
    Io { key: String, message: String },

    #[error("Serialization error on '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Network error: {message}")]
    Network { message: String },
}
