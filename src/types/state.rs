//! Narrative state: where the reader is and what they have decided

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Progress marker of a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Completed,
    Skipped,
}

impl EventStatus {
    /// Glyph used by the event log
    pub fn glyph(self) -> char {
        match self {
            EventStatus::Completed => '✓',
            EventStatus::Skipped => '✗',
            EventStatus::Pending => '⋯',
        }
    }
}

/// Glyph for an event that has never been reached
pub const UNSEEN_GLYPH: char = '○';

/// Runtime state of a narrative session
///
/// Serialized field names match the persisted autosave layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NarrativeState {
    /// Event currently loaded
    pub current_event: Option<String>,
    /// Position within the current event's node list
    pub current_node_index: usize,
    /// Recorded choices and node-driven assignments
    pub choices: HashMap<String, Value>,
    /// Status of every event reached or skipped so far
    pub event_status: HashMap<String, EventStatus>,
}

impl NarrativeState {
    /// Create a fresh, empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value in the choice mapping
    pub fn set_choice(&mut self, key: impl Into<String>, value: Value) {
        self.choices.insert(key.into(), value);
    }

    pub fn choice(&self, key: &str) -> Option<&Value> {
        self.choices.get(key)
    }

    pub fn mark(&mut self, event: impl Into<String>, status: EventStatus) {
        self.event_status.insert(event.into(), status);
    }

    pub fn status(&self, event: &str) -> Option<EventStatus> {
        self.event_status.get(event).copied()
    }
}
