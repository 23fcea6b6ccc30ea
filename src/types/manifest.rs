//! Event manifest: the ordered list that decides which event follows which

use serde::{Deserialize, Serialize};

/// One entry of the event manifest
///
/// Entries are scanned in order; the first eligible entry after the current
/// event wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Event id, also the resource path of its node list
    #[serde(default)]
    pub event: String,
    /// Branch condition gating this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ManifestEntry {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            condition: None,
        }
    }

    pub fn when(event: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            condition: Some(condition.into()),
        }
    }

    /// Whether the entry names an event at all
    pub fn has_event(&self) -> bool {
        !self.event.trim().is_empty()
    }

    /// The condition, treating an empty string as absent
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.trim().is_empty())
    }
}
