//! Event ordering: which event follows the one just finished
//!
//! The manifest is scanned forward from the current event; the first entry
//! without a condition, or whose condition holds, is next. Conditional
//! entries passed over on the way are reported as skipped.

use crate::condition;
use crate::types::ManifestEntry;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Outcome of a manifest scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Next event to load; `None` means the story is over
    pub next: Option<String>,
    /// Events whose condition failed during the scan, in manifest order
    pub skipped: Vec<String>,
}

/// Find the next eligible event after `current`
///
/// An unknown or absent `current` yields the first manifest event. Entries
/// with an empty `event` are never returned and never reported.
pub fn find_next(
    manifest: &[ManifestEntry],
    current: Option<&str>,
    choices: &HashMap<String, Value>,
) -> Resolution {
    let position = current.and_then(|id| {
        manifest
            .iter()
            .position(|entry| entry.has_event() && entry.event == id)
    });

    let Some(position) = position else {
        let next = manifest
            .iter()
            .find(|entry| entry.has_event())
            .map(|entry| entry.event.clone());
        log::debug!(
            target: "shiori::ordering",
            "{:?} not in manifest, starting at {:?}",
            current,
            next
        );
        return Resolution {
            next,
            skipped: Vec::new(),
        };
    };

    let mut resolution = Resolution::default();
    for entry in &manifest[position + 1..] {
        if !entry.has_event() {
            log::warn!(
                target: "shiori::ordering",
                "manifest entry without an event id ignored"
            );
            continue;
        }
        match entry.condition() {
            None => {
                resolution.next = Some(entry.event.clone());
                break;
            }
            Some(cond) if condition::evaluate(cond, choices) => {
                resolution.next = Some(entry.event.clone());
                break;
            }
            Some(cond) => {
                log::debug!(
                    target: "shiori::ordering",
                    "skipping {} ({cond} is false)",
                    entry.event
                );
                resolution.skipped.push(entry.event.clone());
            }
        }
    }

    resolution
}

/// Authoring problems found in a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestReport {
    /// Event ids listed more than once; only the first occurrence is reachable
    pub duplicates: Vec<String>,
    /// Positions of entries without an event id
    pub blank_entries: Vec<usize>,
    /// Conditions that do not parse, with their entry position
    pub bad_conditions: Vec<(usize, condition::ConditionParseError)>,
}

impl ManifestReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.blank_entries.is_empty() && self.bad_conditions.is_empty()
    }
}

/// Check a manifest for authoring mistakes without rejecting it
pub fn check_manifest(manifest: &[ManifestEntry]) -> ManifestReport {
    let mut report = ManifestReport::default();
    let mut seen = HashSet::new();

    for (index, entry) in manifest.iter().enumerate() {
        if !entry.has_event() {
            report.blank_entries.push(index);
        } else if !seen.insert(entry.event.as_str()) && !report.duplicates.contains(&entry.event) {
            report.duplicates.push(entry.event.clone());
        }
        if let Some(cond) = entry.condition()
            && let Err(err) = condition::Condition::parse(cond)
        {
            report.bad_conditions.push((index, err));
        }
    }

    report
}

/// Distinct event ids in manifest order
pub fn event_ids(manifest: &[ManifestEntry]) -> Vec<&str> {
    let mut seen = HashSet::new();
    manifest
        .iter()
        .filter(|entry| entry.has_event())
        .map(|entry| entry.event.as_str())
        .filter(|id| seen.insert(*id))
        .collect()
}
