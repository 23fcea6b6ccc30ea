//! Event log: every manifest event with its progress marker

use crate::ordering;
use crate::types::{EventStatus, ManifestEntry, NarrativeState, UNSEEN_GLYPH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    pub event: String,
    /// `None` when the event was never reached or skipped
    pub status: Option<EventStatus>,
}

impl EventLogEntry {
    pub fn glyph(&self) -> char {
        self.status.map_or(UNSEEN_GLYPH, EventStatus::glyph)
    }

    /// Only completed events can be replayed
    pub fn can_replay(&self) -> bool {
        self.status == Some(EventStatus::Completed)
    }
}

/// Build the log in manifest order, one line per distinct event
pub fn event_log(manifest: &[ManifestEntry], state: &NarrativeState) -> Vec<EventLogEntry> {
    ordering::event_ids(manifest)
        .into_iter()
        .map(|event| EventLogEntry {
            event: event.to_string(),
            status: state.status(event),
        })
        .collect()
}
