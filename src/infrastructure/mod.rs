//! Infrastructure layer - External dependencies and adapters
//!
//! File-system and in-memory implementations of the event, manifest and
//! persistence traits, and the HTTP mirror for the save-slot directory.

pub mod mirror;
pub mod repositories;

pub use mirror::*;
pub use repositories::*;
