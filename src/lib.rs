//! # shiori
//!
//! A playback core for branching visual novels. A story is a set of events,
//! each an ordered list of nodes (dialogue, choice, jump), plus a manifest
//! that decides which event follows which through simple conditions over
//! the choices the reader has made.
//!
//! Event data, the manifest, durable storage and presentation are all
//! injected, so the same [`Player`] runs against files, memory or anything
//! else implementing the domain traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use shiori::infrastructure::{InMemoryEventRepository, InMemoryPersistenceStore};
//! use shiori::playback::{Advance, Player};
//! use shiori::presentation::RecordingSink;
//! use shiori::storage::Storage;
//! use shiori::types::{ManifestEntry, Node};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let events = InMemoryEventRepository::new()
//!     .with_event("prologue", vec![Node::dialogue("Hello, world!", Some("Hero"))])
//!     .with_event("good_end", vec![Node::dialogue("The end.", None)]);
//! let manifest = vec![
//!     ManifestEntry::new("prologue"),
//!     ManifestEntry::when("good_end", "mood == 'happy'"),
//! ];
//! let storage = Storage::new(Arc::new(InMemoryPersistenceStore::new()));
//!
//! let mut player = Player::new(Arc::new(events), manifest, storage, RecordingSink::new());
//! player.start().await?;
//! assert_eq!(player.current_node().map(Node::text), Some("Hello, world!"));
//!
//! // Nobody set `mood`, so good_end is skipped and the story is over
//! assert_eq!(player.advance().await?, Advance::Finished);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`condition`] and [`ordering`]: pure branch evaluation and manifest scans
//! - [`playback`]: the controller that owns the narrative state
//! - [`storage`]: autosave and named save slots over a [`domain::PersistenceStore`]
//! - [`presentation`]: the audio and background requests the controller emits
//! - [`infrastructure`]: file, memory and HTTP adapters for the domain traits

pub mod condition;
pub mod config;
pub mod controls;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod ordering;
pub mod playback;
pub mod presentation;
pub mod storage;
pub mod types;

pub mod cli;

pub use condition::evaluate;
pub use config::PlayerConfig;
pub use domain::{PlaybackError, PersistenceError, RepositoryError};
pub use ordering::find_next;
pub use playback::{Advance, Phase, Player};
pub use storage::Storage;
pub use types::{EventStatus, ManifestEntry, NarrativeState, Node, NodeKind};
