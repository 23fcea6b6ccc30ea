//! Domain errors - Failures surfaced by the playback controller

use crate::domain::repositories::{PersistenceError, RepositoryError};
use thiserror::Error;

/// Errors surfaced by playback operations
///
/// None of these are fatal: the controller stays on its last stable state
/// and keeps accepting input after reporting them.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to load event '{event}'")]
    EventLoad {
        event: String,
        #[source]
        source: RepositoryError,
    },

    #[error("failed to load the event manifest")]
    ManifestLoad(#[source] RepositoryError),

    #[error("load of '{event}' (request {request}) was superseded by a newer load")]
    StaleRequestDiscarded { event: String, request: u64 },

    #[error("persistence failure")]
    Persistence(#[from] PersistenceError),

    #[error("save slot name must not be blank")]
    InvalidSlotName,

    #[error("save slot '{name}' not found")]
    SlotNotFound { name: String },

    #[error("no choice {index} on the current node")]
    NoSuchChoice { index: usize },
}

impl PlaybackError {
    pub fn event_load(event: impl Into<String>, source: RepositoryError) -> Self {
        Self::EventLoad {
            event: event.into(),
            source,
        }
    }

    /// Whether the error only means a newer request won
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleRequestDiscarded { .. })
    }
}
