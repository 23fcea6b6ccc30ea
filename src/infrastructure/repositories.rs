//! Infrastructure implementations of the repository and store traits

use crate::domain::repositories::{
    EventRepository, ManifestRepository, PersistenceError, PersistenceStore, RepositoryError,
};
use crate::types::{ManifestEntry, Node};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Reads event node lists from JSON files under a data directory
///
/// The event id is the file path relative to the directory, e.g.
/// `chapter1/intro.json`.
pub struct FileSystemEventRepository {
    base_path: PathBuf,
}

impl FileSystemEventRepository {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn event_path(&self, event_id: &str) -> Result<PathBuf, RepositoryError> {
        let relative = Path::new(event_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if event_id.is_empty() || escapes {
            return Err(RepositoryError::InvalidFormat {
                message: format!("event id '{event_id}' is not a relative data path"),
            });
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl EventRepository for FileSystemEventRepository {
    async fn load_event(&self, event_id: &str) -> Result<Vec<Node>, RepositoryError> {
        let path = self.event_path(event_id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::EventNotFound {
                    id: event_id.to_string(),
                    source: Some(Box::new(e)),
                });
            }
            Err(e) => {
                return Err(RepositoryError::Io {
                    message: format!("Failed to read event file {}: {}", path.display(), e),
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| RepositoryError::InvalidFormat {
            message: format!("Failed to parse event {event_id}: {e}"),
        })
    }
}

/// Reads the manifest from a JSON file
pub struct FileSystemManifestRepository {
    path: PathBuf,
}

impl FileSystemManifestRepository {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ManifestRepository for FileSystemManifestRepository {
    async fn load_manifest(&self) -> Result<Vec<ManifestEntry>, RepositoryError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| RepositoryError::Io {
                    message: format!("Failed to read manifest {}: {}", self.path.display(), e),
                })?;

        serde_json::from_str(&content).map_err(|e| RepositoryError::InvalidFormat {
            message: format!("Failed to parse manifest: {e}"),
        })
    }
}

/// In-memory event repository for testing and embedding
#[derive(Default)]
pub struct InMemoryEventRepository {
    events: HashMap<String, Vec<Node>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event_id: impl Into<String>, nodes: Vec<Node>) {
        self.events.insert(event_id.into(), nodes);
    }

    pub fn with_event(mut self, event_id: impl Into<String>, nodes: Vec<Node>) -> Self {
        self.add_event(event_id, nodes);
        self
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_event(&self, event_id: &str) -> Result<Vec<Node>, RepositoryError> {
        self.events
            .get(event_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(event_id))
    }
}

/// In-memory manifest
#[derive(Default)]
pub struct InMemoryManifestRepository {
    entries: Vec<ManifestEntry>,
}

impl InMemoryManifestRepository {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl ManifestRepository for InMemoryManifestRepository {
    async fn load_manifest(&self) -> Result<Vec<ManifestEntry>, RepositoryError> {
        Ok(self.entries.clone())
    }
}

/// Stores each key as a pretty-printed JSON file in a directory
pub struct JsonFilePersistenceStore {
    base_path: PathBuf,
}

impl JsonFilePersistenceStore {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// File backing `key`; characters outside `[A-Za-z0-9_.-]` become `_`
    fn key_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl PersistenceStore for JsonFilePersistenceStore {
    async fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let path = self.key_path(key);

        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| PersistenceError::Io {
                key: key.to_string(),
                message: format!("Failed to create save directory: {e}"),
            })?;

        let json =
            serde_json::to_string_pretty(value).map_err(|source| PersistenceError::Serialization {
                key: key.to_string(),
                source,
            })?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|e| PersistenceError::Io {
                key: key.to_string(),
                message: format!("Failed to write {}: {}", path.display(), e),
            })
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let path = self.key_path(key);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Io {
                    key: key.to_string(),
                    message: format!("Failed to read {}: {}", path.display(), e),
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| PersistenceError::Serialization {
                key: key.to_string(),
                source,
            })
    }
}

/// In-memory persistence store
#[derive(Default)]
pub struct InMemoryPersistenceStore {
    values: Mutex<HashMap<String, Value>>,
}

impl InMemoryPersistenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .values
            .lock()
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl PersistenceStore for InMemoryPersistenceStore {
    async fn save(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let mut values = self.values.lock().map_err(|_| PersistenceError::Io {
            key: key.to_string(),
            message: "store lock poisoned".to_string(),
        })?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let values = self.values.lock().map_err(|_| PersistenceError::Io {
            key: key.to_string(),
            message: "store lock poisoned".to_string(),
        })?;
        Ok(values.get(key).cloned())
    }
}
