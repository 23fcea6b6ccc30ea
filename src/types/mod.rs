//! Core data types for the shiori library
//!
//! - Node: one step of an event (dialogue, choice, jump)
//! - ManifestEntry: ordering of events, gated by conditions
//! - NarrativeState: current position, recorded choices and event statuses

pub mod manifest;
pub mod node;
pub mod state;

pub use manifest::ManifestEntry;
pub use node::{ChoiceOption, MusicCue, Node, NodeEffect, NodeKind, SfxCue};
pub use state::{EventStatus, NarrativeState, UNSEEN_GLYPH};
