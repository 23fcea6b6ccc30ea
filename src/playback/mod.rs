//! Playback controller
//!
//! [`Player`] owns the [`NarrativeState`] and is the only thing that mutates
//! it. Every operation runs on `&mut self`, so mutations are serialized by
//! construction. Loads are split into [`Player::begin_load`] and
//! [`Player::commit_load`]: each begin bumps a request id, and a commit whose
//! id is no longer the latest is discarded.

pub mod auto_play;
pub mod event_log;

#[cfg(test)]
mod tests;

use crate::condition;
use crate::controls::PlayerSettings;
use crate::domain::errors::PlaybackError;
use crate::domain::repositories::{
    EventRepository, ManifestRepository, RepositoryError, SlotDirectory,
};
use crate::ordering;
use crate::presentation::{Background, PresentationSink, Transition};
use crate::storage::{SaveSlot, Storage};
use crate::types::{EventStatus, ManifestEntry, MusicCue, NarrativeState, Node, NodeKind};
use auto_play::{AutoPlayTimer, AutoTicket, auto_delay};
use event_log::EventLogEntry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Key under which [`Player::select_option`] records the picked value
pub const USER_CHOICE_KEY: &str = "user_choice";

const DEFAULT_AUTO_BASE_DELAY: Duration = Duration::from_millis(2000);

/// Coarse controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded yet
    Idle,
    /// An event fetch is in flight
    Loading,
    /// A node is current and waiting for input
    Ready,
    /// The manifest ran out of eligible events
    Finished,
}

/// Modal views that block advancing while open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    EventViewer,
    SaveMenu,
}

/// Why an advance did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    OverlayOpen,
    Loading,
    Finished,
    NoCurrentNode,
    /// An auto-play ticket fired after it was superseded
    StaleTimer,
}

/// Result of a successful advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Ignored(Blocked),
    /// Moved to another node of the same event
    Moved { index: usize },
    /// A jump node sent playback to `to`
    Jumped { from: String, to: String },
    /// The event ended and the manifest picked `to`
    NextEvent {
        from: String,
        to: String,
        skipped: Vec<String>,
    },
    Finished,
}

/// How a committed load positions the state
#[derive(Debug, Clone, PartialEq)]
enum LoadMode {
    /// Index 0, event marked pending
    Fresh,
    /// Replace the state with a snapshot and resume at its index
    Restore(Box<NarrativeState>),
}

/// An issued event load; pass it back to [`Player::commit_load`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub id: u64,
    pub event: String,
    mode: LoadMode,
}

/// How [`Player::start`] began the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Resumed { event: String, index: usize },
    Fresh { event: String },
    /// The manifest has no playable event
    Empty,
}

/// The playback controller
pub struct Player<S: PresentationSink> {
    events: Arc<dyn EventRepository>,
    manifest: Vec<ManifestEntry>,
    storage: Storage,
    sink: S,
    state: NarrativeState,
    nodes: Vec<Node>,
    phase: Phase,
    loading: Option<u64>,
    latest_request: u64,
    overlay: Option<Overlay>,
    timer: AutoPlayTimer,
    settings: PlayerSettings,
    auto_base_delay: Duration,
}

impl<S: PresentationSink> Player<S> {
    pub fn new(
        events: Arc<dyn EventRepository>,
        manifest: Vec<ManifestEntry>,
        storage: Storage,
        sink: S,
    ) -> Self {
        Self {
            events,
            manifest,
            storage,
            sink,
            state: NarrativeState::new(),
            nodes: Vec::new(),
            phase: Phase::Idle,
            loading: None,
            latest_request: 0,
            overlay: None,
            timer: AutoPlayTimer::new(),
            settings: PlayerSettings::default(),
            auto_base_delay: DEFAULT_AUTO_BASE_DELAY,
        }
    }

    /// Create a player whose manifest comes from `manifest`
    pub async fn from_repositories(
        events: Arc<dyn EventRepository>,
        manifest: &dyn ManifestRepository,
        storage: Storage,
        sink: S,
    ) -> Result<Self, PlaybackError> {
        let entries = manifest
            .load_manifest()
            .await
            .map_err(PlaybackError::ManifestLoad)?;
        Ok(Self::new(events, entries, storage, sink))
    }

    pub fn with_settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_auto_base_delay(mut self, delay: Duration) -> Self {
        self.auto_base_delay = delay;
        self
    }

    pub fn state(&self) -> &NarrativeState {
        &self.state
    }

    pub fn manifest(&self) -> &[ManifestEntry] {
        &self.manifest
    }

    pub fn phase(&self) -> Phase {
        if self.loading.is_some() {
            Phase::Loading
        } else {
            self.phase
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Node the reader is looking at, if an event is loaded
    pub fn current_node(&self) -> Option<&Node> {
        if self.phase != Phase::Ready {
            return None;
        }
        self.nodes.get(self.state.current_node_index)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut PlayerSettings {
        &mut self.settings
    }

    /// Begin the session: resume the autosave, or start the first event
    pub async fn start(&mut self) -> Result<StartOutcome, PlaybackError> {
        let report = ordering::check_manifest(&self.manifest);
        for id in &report.duplicates {
            log::warn!(
                target: "shiori::playback",
                "event '{id}' is listed more than once; only the first entry is reachable"
            );
        }
        for index in &report.blank_entries {
            log::warn!(target: "shiori::playback", "manifest entry {index} has no event id");
        }
        for (index, err) in &report.bad_conditions {
            log::warn!(target: "shiori::playback", "manifest entry {index}: {err}");
        }

        match self.storage.restore().await {
            Ok(Some(saved)) if saved.current_event.is_some() => {
                match self.restore_snapshot(saved).await {
                    Ok(()) => {
                        return Ok(StartOutcome::Resumed {
                            event: self.state.current_event.clone().unwrap_or_default(),
                            index: self.state.current_node_index,
                        });
                    }
                    Err(err) => log::warn!(
                        target: "shiori::playback",
                        "could not resume autosave, starting over: {err}"
                    ),
                }
            }
            Ok(_) => {}
            Err(err) => log::warn!(
                target: "shiori::playback",
                "autosave unreadable, starting over: {err}"
            ),
        }

        self.state = NarrativeState::new();
        match ordering::find_next(&self.manifest, None, &self.state.choices).next {
            Some(first) => {
                self.load_event(&first).await?;
                Ok(StartOutcome::Fresh { event: first })
            }
            None => {
                log::info!(target: "shiori::playback", "manifest has no events");
                self.finish().await;
                Ok(StartOutcome::Empty)
            }
        }
    }

    /// Flush a final autosave
    pub async fn end_session(&mut self) {
        self.timer.cancel();
        self.persist().await;
        log::info!(target: "shiori::playback", "session ended");
    }

    /// Issue a load of `event`, superseding any load still in flight
    pub fn begin_load(&mut self, event: &str) -> LoadRequest {
        self.issue(event, LoadMode::Fresh)
    }

    fn issue(&mut self, event: &str, mode: LoadMode) -> LoadRequest {
        self.latest_request += 1;
        self.loading = Some(self.latest_request);
        self.timer.cancel();
        log::debug!(
            target: "shiori::playback",
            "load {} issued for '{event}'",
            self.latest_request
        );
        LoadRequest {
            id: self.latest_request,
            event: event.to_string(),
            mode,
        }
    }

    /// Apply the outcome of a fetch issued by [`Player::begin_load`]
    ///
    /// On failure the controller stays on its last stable state.
    pub async fn commit_load(
        &mut self,
        request: LoadRequest,
        fetched: Result<Vec<Node>, RepositoryError>,
    ) -> Result<(), PlaybackError> {
        if request.id != self.latest_request {
            log::debug!(
                target: "shiori::playback",
                "discarding load {} of '{}'; {} is newer",
                request.id,
                request.event,
                self.latest_request
            );
            return Err(PlaybackError::StaleRequestDiscarded {
                event: request.event,
                request: request.id,
            });
        }
        self.loading = None;

        let nodes = match fetched {
            Ok(nodes) if nodes.is_empty() => Err(RepositoryError::InvalidFormat {
                message: format!("event '{}' has no nodes", request.event),
            }),
            other => other,
        };
        let nodes = match nodes {
            Ok(nodes) => nodes,
            Err(source) => {
                log::warn!(
                    target: "shiori::playback",
                    "loading '{}' failed: {source}",
                    request.event
                );
                return Err(PlaybackError::event_load(request.event, source));
            }
        };

        match request.mode {
            LoadMode::Fresh => {
                self.state.current_event = Some(request.event.clone());
                self.state.current_node_index = 0;
                self.state.mark(&request.event, EventStatus::Pending);
            }
            LoadMode::Restore(snapshot) => {
                self.state = *snapshot;
                self.state.current_event = Some(request.event.clone());
                if self.state.current_node_index >= nodes.len() {
                    log::warn!(
                        target: "shiori::playback",
                        "saved index {} is past the end of '{}', resuming at 0",
                        self.state.current_node_index,
                        request.event
                    );
                    self.state.current_node_index = 0;
                }
            }
        }
        self.nodes = nodes;
        self.phase = Phase::Ready;
        log::info!(
            target: "shiori::playback",
            "event '{}' ready at node {}",
            request.event,
            self.state.current_node_index
        );

        self.node_changed();
        self.persist().await;
        Ok(())
    }

    /// Fetch `event` and make it current at node 0
    pub async fn load_event(&mut self, event: &str) -> Result<(), PlaybackError> {
        let request = self.begin_load(event);
        let fetched = self.events.load_event(event).await;
        self.commit_load(request, fetched).await
    }

    /// Replace the live state with `snapshot` and resume where it left off
    ///
    /// The snapshot only takes effect once its event has been fetched.
    pub async fn restore_snapshot(&mut self, snapshot: NarrativeState) -> Result<(), PlaybackError> {
        let Some(event) = snapshot.current_event.clone() else {
            self.state = snapshot;
            self.nodes.clear();
            self.phase = Phase::Idle;
            self.timer.cancel();
            return match ordering::find_next(&self.manifest, None, &self.state.choices).next {
                Some(first) => self.load_event(&first).await,
                None => {
                    self.finish().await;
                    Ok(())
                }
            };
        };
        let request = self.issue(&event, LoadMode::Restore(Box::new(snapshot)));
        let fetched = self.events.load_event(&event).await;
        self.commit_load(request, fetched).await
    }

    /// Move past the current node
    pub async fn advance(&mut self) -> Result<Advance, PlaybackError> {
        if let Some(reason) = self.blocked() {
            log::debug!(target: "shiori::playback", "advance ignored: {reason:?}");
            return Ok(Advance::Ignored(reason));
        }
        let (Some(event), Some(node)) = (
            self.state.current_event.clone(),
            self.nodes.get(self.state.current_node_index).cloned(),
        ) else {
            return Ok(Advance::Ignored(Blocked::NoCurrentNode));
        };

        // Rolled back if the next event fails to load
        let before = self.state.clone();
        self.apply_assignments(&node);

        if let NodeKind::Jump { target } = &node.kind {
            log::debug!(target: "shiori::playback", "jump from '{event}' to '{target}'");
            self.state.mark(&event, EventStatus::Completed);
            self.leave_for(&node, target, before).await?;
            return Ok(Advance::Jumped {
                from: event,
                to: target.clone(),
            });
        }

        let index = self.state.current_node_index + 1;
        if index < self.nodes.len() {
            self.dispatch_audio(&node);
            self.state.current_node_index = index;
            self.node_changed();
            return Ok(Advance::Moved { index });
        }

        self.state.mark(&event, EventStatus::Completed);
        let resolution = ordering::find_next(&self.manifest, Some(&event), &self.state.choices);
        for skipped in &resolution.skipped {
            self.state.mark(skipped, EventStatus::Skipped);
        }

        match resolution.next {
            Some(next) => {
                self.leave_for(&node, &next, before).await?;
                Ok(Advance::NextEvent {
                    from: event,
                    to: next,
                    skipped: resolution.skipped,
                })
            }
            None => {
                self.dispatch_audio(&node);
                self.finish().await;
                Ok(Advance::Finished)
            }
        }
    }

    /// Load `target` as the successor of `node`
    ///
    /// The node's audio is dispatched only once the fetch has produced
    /// nodes. If the load fails the state goes back to `before`, so a retry
    /// applies the node exactly once.
    async fn leave_for(
        &mut self,
        node: &Node,
        target: &str,
        before: NarrativeState,
    ) -> Result<(), PlaybackError> {
        let request = self.begin_load(target);
        let fetched = self.events.load_event(target).await;
        if fetched.as_ref().is_ok_and(|nodes| !nodes.is_empty()) {
            self.dispatch_audio(node);
        }
        let result = self.commit_load(request, fetched).await;
        if result.is_err() {
            self.state = before;
        }
        result
    }

    /// Record `choices[key] = value`, then advance
    pub async fn select_choice(
        &mut self,
        key: &str,
        value: Value,
    ) -> Result<Advance, PlaybackError> {
        log::debug!(target: "shiori::playback", "choice {key} = {value}");
        self.state.set_choice(key, value);
        self.advance().await
    }

    /// Pick option `index` of the current choice node
    pub async fn select_option(&mut self, index: usize) -> Result<Advance, PlaybackError> {
        let value = match self.current_node().map(|node| &node.kind) {
            Some(NodeKind::Choice { choices }) => choices
                .get(index)
                .map(|option| option.value.clone())
                .ok_or(PlaybackError::NoSuchChoice { index })?,
            _ => return Err(PlaybackError::NoSuchChoice { index }),
        };
        self.select_choice(USER_CHOICE_KEY, value).await
    }

    /// Close any overlay and load `event` from its first node
    pub async fn replay(&mut self, event: &str) -> Result<(), PlaybackError> {
        self.overlay = None;
        log::info!(target: "shiori::playback", "replaying '{event}'");
        self.load_event(event).await
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    /// Open `overlay`, or close it if it is already open
    ///
    /// Opening one overlay closes the other.
    pub fn toggle_overlay(&mut self, overlay: Overlay) -> Option<Overlay> {
        self.overlay = if self.overlay == Some(overlay) {
            None
        } else {
            Some(overlay)
        };
        self.overlay
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn event_log(&self) -> Vec<EventLogEntry> {
        event_log::event_log(&self.manifest, &self.state)
    }

    pub fn is_auto(&self) -> bool {
        self.timer.is_enabled()
    }

    /// Turn auto-play on or off; any pending ticket is invalidated
    pub fn set_auto_mode(&mut self, enabled: bool) {
        self.timer.set_enabled(enabled);
        log::debug!(target: "shiori::playback", "auto mode {}", if enabled { "on" } else { "off" });
    }

    pub fn toggle_auto_mode(&mut self) -> bool {
        let enabled = !self.timer.is_enabled();
        self.set_auto_mode(enabled);
        enabled
    }

    /// Schedule an auto-advance for the current node
    ///
    /// Returns `None` while auto mode is off, the node is a choice, or the
    /// player is blocked.
    pub fn auto_ticket(&mut self) -> Option<AutoTicket> {
        if self.blocked().is_some() {
            return None;
        }
        let node = self.current_node()?;
        if node.is_choice() {
            return None;
        }
        let delay = auto_delay(node.text(), self.settings.text_speed(), self.auto_base_delay);
        self.timer.schedule(delay)
    }

    /// Advance on behalf of `ticket`, unless it has been superseded
    pub async fn fire_auto(&mut self, ticket: AutoTicket) -> Result<Advance, PlaybackError> {
        if !self.timer.is_live(&ticket) {
            log::debug!(
                target: "shiori::playback",
                "auto ticket {} expired",
                ticket.generation
            );
            return Ok(Advance::Ignored(Blocked::StaleTimer));
        }
        self.advance().await
    }

    pub async fn save_slot(&self, name: &str) -> Result<SaveSlot, PlaybackError> {
        self.storage.save_slot(name, &self.state).await
    }

    /// Replace the live state with slot `name` and close the overlay
    pub async fn load_slot(&mut self, name: &str) -> Result<SaveSlot, PlaybackError> {
        let slot = self.storage.load_slot(name).await?;
        self.restore_snapshot(slot.snapshot.clone()).await?;
        self.overlay = None;
        Ok(slot)
    }

    pub async fn delete_slot(&self, name: &str) -> Result<bool, PlaybackError> {
        self.storage.delete_slot(name).await
    }

    pub async fn slot_directory(&self) -> Result<SlotDirectory, PlaybackError> {
        Ok(self.storage.slot_directory().await?)
    }

    /// Whether a condition would hold against the current choices
    pub fn check_condition(&self, source: &str) -> bool {
        condition::evaluate(source, &self.state.choices)
    }

    fn blocked(&self) -> Option<Blocked> {
        if self.overlay.is_some() {
            Some(Blocked::OverlayOpen)
        } else if self.loading.is_some() {
            Some(Blocked::Loading)
        } else if self.phase == Phase::Finished {
            Some(Blocked::Finished)
        } else if self.phase != Phase::Ready {
            Some(Blocked::NoCurrentNode)
        } else {
            None
        }
    }

    fn apply_assignments(&mut self, node: &Node) {
        if let Some(assignments) = node.assignments() {
            for (key, value) in assignments {
                self.state.set_choice(key.clone(), value.clone());
            }
        }
    }

    fn dispatch_audio(&mut self, node: &Node) {
        match &node.music {
            Some(MusicCue::Stop) => self.sink.stop_music(),
            Some(MusicCue::Play(track)) if !track.is_empty() => self.sink.play_music(track),
            _ => {}
        }
        if let Some(sfx) = &node.sfx {
            for track in sfx.tracks().into_iter().filter(|t| !t.is_empty()) {
                self.sink.play_sfx(track);
            }
        }
    }

    /// The current node was replaced: kill pending auto tickets and show
    /// its background
    fn node_changed(&mut self) {
        self.timer.cancel();
        let Some(node) = self.nodes.get(self.state.current_node_index) else {
            return;
        };
        if let Some(name) = node.background.as_deref().filter(|n| !n.is_empty()) {
            let transition = Transition::from_name(node.transition_name());
            self.sink
                .set_background(&Background::from_name(name), transition);
        }
    }

    async fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.timer.cancel();
        log::info!(target: "shiori::playback", "story finished");
        self.persist().await;
    }

    async fn persist(&self) {
        if let Err(err) = self.storage.autosave(&self.state).await {
            log::warn!(target: "shiori::playback", "autosave failed: {err}");
        }
    }
}
