//! Storage module for the autosave record and named save slots
//!
//! Everything is written through an injected [`PersistenceStore`] as JSON:
//!
//! - `vn_game_state`: the autosave, rewritten whenever the current event changes
//! - `vn_save_<name>`: one record per named slot
//! - `vn_slot_directory`: `{name -> {timestamp}}` for every slot
//!
//! Deleting a slot only removes it from the directory. The slot record itself
//! stays in the store because the store has no delete operation.

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::errors::PlaybackError;
use crate::domain::repositories::{
    PersistenceError, PersistenceStore, SlotDirectory, SlotDirectoryMirror, SlotEntry,
};
use crate::types::NarrativeState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const AUTOSAVE_KEY: &str = "vn_game_state";
pub const SLOT_DIRECTORY_KEY: &str = "vn_slot_directory";
pub const SLOT_KEY_PREFIX: &str = "vn_save_";

/// Store key of a named slot
pub fn slot_key(name: &str) -> String {
    format!("{SLOT_KEY_PREFIX}{name}")
}

/// A named snapshot of the narrative state
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSlot {
    pub name: String,
    pub snapshot: NarrativeState,
    pub timestamp: String,
}

/// Persisted layout of a slot: the state fields plus a timestamp
#[derive(Debug, Serialize, Deserialize)]
struct SlotRecord {
    #[serde(flatten)]
    snapshot: NarrativeState,
    timestamp: String,
}

/// Autosave and save-slot access on top of a persistence store
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn PersistenceStore>,
    mirror: Option<Arc<dyn SlotDirectoryMirror>>,
    clock: Arc<dyn Clock>,
}

impl Storage {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            store,
            mirror: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn SlotDirectoryMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Write the live state as the autosave record
    pub async fn autosave(&self, state: &NarrativeState) -> Result<(), PersistenceError> {
        let value = encode(AUTOSAVE_KEY, state)?;
        self.store.save(AUTOSAVE_KEY, &value).await?;
        log::debug!(
            target: "shiori::storage",
            "autosaved at {:?}#{}",
            state.current_event,
            state.current_node_index
        );
        Ok(())
    }

    /// Read the autosave record, if any
    pub async fn restore(&self) -> Result<Option<NarrativeState>, PersistenceError> {
        match self.store.load(AUTOSAVE_KEY).await? {
            Some(value) => decode(AUTOSAVE_KEY, value).map(Some),
            None => Ok(None),
        }
    }

    /// Read the slot directory; an absent directory is empty
    pub async fn slot_directory(&self) -> Result<SlotDirectory, PersistenceError> {
        match self.store.load(SLOT_DIRECTORY_KEY).await? {
            Some(value) => decode(SLOT_DIRECTORY_KEY, value),
            None => Ok(SlotDirectory::new()),
        }
    }

    /// Save `state` under `name`, overwriting any slot of the same name
    pub async fn save_slot(
        &self,
        name: &str,
        state: &NarrativeState,
    ) -> Result<SaveSlot, PlaybackError> {
        let name = normalize_name(name)?;
        let key = slot_key(name);
        let timestamp = self.clock.timestamp();

        let record = SlotRecord {
            snapshot: state.clone(),
            timestamp: timestamp.clone(),
        };
        self.store.save(&key, &encode(&key, &record)?).await?;

        let mut directory = self.slot_directory().await?;
        directory.insert(
            name.to_string(),
            SlotEntry {
                timestamp: timestamp.clone(),
            },
        );
        self.write_directory(&directory).await?;

        log::info!(target: "shiori::storage", "saved slot '{name}' at {timestamp}");
        Ok(SaveSlot {
            name: name.to_string(),
            snapshot: state.clone(),
            timestamp,
        })
    }

    /// Read the slot saved under `name`
    pub async fn load_slot(&self, name: &str) -> Result<SaveSlot, PlaybackError> {
        let name = normalize_name(name)?;
        let key = slot_key(name);

        let value = self
            .store
            .load(&key)
            .await?
            .ok_or_else(|| PlaybackError::SlotNotFound {
                name: name.to_string(),
            })?;
        let record: SlotRecord = decode(&key, value)?;

        Ok(SaveSlot {
            name: name.to_string(),
            snapshot: record.snapshot,
            timestamp: record.timestamp,
        })
    }

    /// Remove `name` from the directory; returns whether it was listed
    pub async fn delete_slot(&self, name: &str) -> Result<bool, PlaybackError> {
        let name = normalize_name(name)?;
        let mut directory = self.slot_directory().await?;

        if directory.remove(name).is_none() {
            return Ok(false);
        }
        self.write_directory(&directory).await?;

        log::debug!(
            target: "shiori::storage",
            "slot '{name}' delisted; record {} left in store",
            slot_key(name)
        );
        Ok(true)
    }

    async fn write_directory(&self, directory: &SlotDirectory) -> Result<(), PersistenceError> {
        let value = encode(SLOT_DIRECTORY_KEY, directory)?;
        self.store.save(SLOT_DIRECTORY_KEY, &value).await?;

        if let Some(mirror) = &self.mirror
            && let Err(err) = mirror.publish(directory).await
        {
            log::warn!(target: "shiori::storage", "slot directory mirror failed: {err}");
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> Result<&str, PlaybackError> {
    let name = name.trim();
    if name.is_empty() {
        Err(PlaybackError::InvalidSlotName)
    } else {
        Ok(name)
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, PersistenceError> {
    serde_json::to_value(value).map_err(|source| PersistenceError::Serialization {
        key: key.to_string(),
        source,
    })
}

fn decode<T: for<'de> Deserialize<'de>>(key: &str, value: Value) -> Result<T, PersistenceError> {
    serde_json::from_value(value).map_err(|source| PersistenceError::Serialization {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::infrastructure::InMemoryPersistenceStore;
    use crate::types::EventStatus;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;

    fn storage() -> (Storage, Arc<InMemoryPersistenceStore>) {
        let store = Arc::new(InMemoryPersistenceStore::new());
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
        (
            Storage::new(store.clone()).with_clock(Arc::new(clock)),
            store,
        )
    }

    fn sample_state() -> NarrativeState {
        let mut state = NarrativeState::new();
        state.current_event = Some("chapter2.json".to_string());
        state.current_node_index = 4;
        state.set_choice("user_choice", json!("Yes"));
        state.set_choice("score", json!(7));
        state.mark("chapter1.json", EventStatus::Completed);
        state.mark("bad_end.json", EventStatus::Skipped);
        state.mark("chapter2.json", EventStatus::Pending);
        state
    }

    #[tokio::test]
    async fn save_then_load_slot_restores_state() {
        let (storage, _) = storage();
        let state = sample_state();

        let saved = storage.save_slot("before boss", &state).await.unwrap();
        assert_eq!(saved.timestamp, "2024-05-01T09:30:00.000Z");

        let loaded = storage.load_slot("before boss").await.unwrap();
        assert_eq!(loaded.snapshot, state);
        assert_eq!(loaded.timestamp, saved.timestamp);
    }

    #[tokio::test]
    async fn slot_record_uses_persisted_layout() {
        let (storage, store) = storage();
        storage.save_slot("one", &sample_state()).await.unwrap();

        let raw = store.load("vn_save_one").await.unwrap().unwrap();
        assert_eq!(raw["currentEvent"], json!("chapter2.json"));
        assert_eq!(raw["currentNodeIndex"], json!(4));
        assert_eq!(raw["timestamp"], json!("2024-05-01T09:30:00.000Z"));

        let directory = store.load(SLOT_DIRECTORY_KEY).await.unwrap().unwrap();
        assert_eq!(
            directory,
            json!({ "one": { "timestamp": "2024-05-01T09:30:00.000Z" } })
        );
    }

    #[tokio::test]
    async fn slot_names_are_trimmed_and_blank_rejected() {
        let (storage, _) = storage();

        let saved = storage.save_slot("  quick  ", &sample_state()).await.unwrap();
        assert_eq!(saved.name, "quick");
        assert!(storage.slot_directory().await.unwrap().contains_key("quick"));

        let err = storage.save_slot("   ", &sample_state()).await.unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidSlotName));
    }

    #[tokio::test]
    async fn overwrite_by_name_keeps_one_entry() {
        let (storage, _) = storage();
        let mut state = sample_state();
        storage.save_slot("a", &state).await.unwrap();

        state.current_node_index = 9;
        storage.save_slot("a", &state).await.unwrap();

        assert_eq!(storage.slot_directory().await.unwrap().len(), 1);
        assert_eq!(
            storage.load_slot("a").await.unwrap().snapshot.current_node_index,
            9
        );
    }

    #[tokio::test]
    async fn delete_only_delists_the_slot() {
        let (storage, store) = storage();
        storage.save_slot("gone", &sample_state()).await.unwrap();

        assert!(storage.delete_slot("gone").await.unwrap());
        assert!(!storage.delete_slot("gone").await.unwrap());
        assert!(storage.slot_directory().await.unwrap().is_empty());
        assert!(store.load("vn_save_gone").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_slot_is_reported() {
        let (storage, _) = storage();
        let err = storage.load_slot("nothing").await.unwrap_err();
        assert!(matches!(err, PlaybackError::SlotNotFound { name } if name == "nothing"));
    }

    #[tokio::test]
    async fn autosave_round_trip() {
        let (storage, _) = storage();
        assert_eq!(storage.restore().await.unwrap(), None);

        storage.autosave(&sample_state()).await.unwrap();
        assert_eq!(storage.restore().await.unwrap(), Some(sample_state()));
    }

    #[tokio::test]
    async fn corrupt_autosave_is_a_serialization_error() {
        let (storage, store) = storage();
        store
            .save(AUTOSAVE_KEY, &json!({ "currentNodeIndex": "three" }))
            .await
            .unwrap();

        let err = storage.restore().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization { .. }));
    }

    struct RecordingMirror {
        published: Mutex<Vec<SlotDirectory>>,
        fail: bool,
    }

    #[async_trait]
    impl SlotDirectoryMirror for RecordingMirror {
        async fn publish(&self, directory: &SlotDirectory) -> Result<(), PersistenceError> {
            self.published.lock().unwrap().push(directory.clone());
            if self.fail {
                Err(PersistenceError::Network {
                    message: "offline".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn directory_is_mirrored_on_save_and_delete() {
        let mirror = Arc::new(RecordingMirror {
            published: Mutex::new(Vec::new()),
            fail: false,
        });
        let (storage, _) = storage();
        let storage = storage.with_mirror(mirror.clone());

        storage.save_slot("a", &sample_state()).await.unwrap();
        storage.delete_slot("a").await.unwrap();

        let published = mirror.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert!(published[0].contains_key("a"));
        assert!(published[1].is_empty());
    }

    #[tokio::test]
    async fn mirror_failure_does_not_fail_the_save() {
        let mirror = Arc::new(RecordingMirror {
            published: Mutex::new(Vec::new()),
            fail: true,
        });
        let (storage, _) = storage();
        let storage = storage.with_mirror(mirror);

        assert!(storage.save_slot("a", &sample_state()).await.is_ok());
        assert!(storage.load_slot("a").await.is_ok());
    }
}
