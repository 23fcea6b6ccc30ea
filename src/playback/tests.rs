//! Tests for the playback controller

use super::*;
use crate::domain::repositories::{PersistenceError, PersistenceStore};
use crate::infrastructure::{InMemoryEventRepository, InMemoryPersistenceStore};
use crate::presentation::{Cue, RecordingSink};
use crate::storage::AUTOSAVE_KEY;
use crate::types::{ChoiceOption, NodeEffect, SfxCue};
use async_trait::async_trait;
use serde_json::json;

fn line(text: &str) -> Node {
    Node::dialogue(text, None)
}

fn yes_no() -> Node {
    Node::choice(vec![
        ChoiceOption {
            text: "Yes".to_string(),
            value: json!("Yes"),
        },
        ChoiceOption {
            text: "No".to_string(),
            value: json!("No"),
        },
    ])
}

fn story() -> InMemoryEventRepository {
    InMemoryEventRepository::new()
        .with_event("a", vec![line("a0"), line("a1")])
        .with_event("b", vec![line("b0")])
        .with_event("c", vec![line("c0"), line("c1"), line("c2")])
        .with_event("e2", vec![line("e2-0"), line("e2-1")])
}

fn manifest() -> Vec<ManifestEntry> {
    vec![
        ManifestEntry::new("a"),
        ManifestEntry::when("b", "x == 1"),
        ManifestEntry::new("c"),
    ]
}

fn player_with(
    events: InMemoryEventRepository,
    manifest: Vec<ManifestEntry>,
) -> (Player<RecordingSink>, Arc<InMemoryPersistenceStore>) {
    let store = Arc::new(InMemoryPersistenceStore::new());
    let player = Player::new(
        Arc::new(events),
        manifest,
        Storage::new(store.clone()),
        RecordingSink::new(),
    );
    (player, store)
}

fn player() -> Player<RecordingSink> {
    player_with(story(), manifest()).0
}

#[tokio::test]
async fn start_loads_first_event() {
    let mut player = player();

    let outcome = player.start().await.unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Fresh {
            event: "a".to_string()
        }
    );
    assert_eq!(player.phase(), Phase::Ready);
    assert_eq!(player.state().current_event.as_deref(), Some("a"));
    assert_eq!(player.state().current_node_index, 0);
    assert_eq!(player.state().status("a"), Some(EventStatus::Pending));
    assert_eq!(player.current_node().map(Node::text), Some("a0"));
}

#[tokio::test]
async fn advance_walks_nodes_then_follows_manifest() {
    let mut player = player();
    player.start().await.unwrap();
    player.state.set_choice("x", json!(2));

    assert_eq!(player.advance().await.unwrap(), Advance::Moved { index: 1 });

    let outcome = player.advance().await.unwrap();
    assert_eq!(
        outcome,
        Advance::NextEvent {
            from: "a".to_string(),
            to: "c".to_string(),
            skipped: vec!["b".to_string()],
        }
    );
    assert_eq!(player.state().status("a"), Some(EventStatus::Completed));
    assert_eq!(player.state().status("b"), Some(EventStatus::Skipped));
    assert_eq!(player.state().status("c"), Some(EventStatus::Pending));
    assert_eq!(player.state().current_node_index, 0);
}

#[tokio::test]
async fn finishes_at_manifest_end() {
    let (mut player, store) = player_with(story(), vec![ManifestEntry::new("b")]);
    player.start().await.unwrap();

    assert_eq!(player.advance().await.unwrap(), Advance::Finished);
    assert!(player.is_finished());
    assert_eq!(player.phase(), Phase::Finished);
    assert!(player.current_node().is_none());

    assert_eq!(
        player.advance().await.unwrap(),
        Advance::Ignored(Blocked::Finished)
    );

    let saved = store.load(AUTOSAVE_KEY).await.unwrap().unwrap();
    assert_eq!(saved["eventStatus"]["b"], json!("completed"));
}

#[tokio::test]
async fn empty_manifest_finishes_immediately() {
    let (mut player, _) = player_with(story(), Vec::new());
    assert_eq!(player.start().await.unwrap(), StartOutcome::Empty);
    assert!(player.is_finished());
}

#[tokio::test]
async fn jump_bypasses_the_manifest() {
    let events = story().with_event("a", vec![Node::jump("e2"), line("never shown")]);
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();

    let outcome = player.advance().await.unwrap();

    assert_eq!(
        outcome,
        Advance::Jumped {
            from: "a".to_string(),
            to: "e2".to_string()
        }
    );
    assert_eq!(player.state().current_event.as_deref(), Some("e2"));
    assert_eq!(player.state().current_node_index, 0);
    assert_eq!(player.state().status("a"), Some(EventStatus::Completed));
    // b was never considered, so it carries no status
    assert_eq!(player.state().status("b"), None);
}

#[tokio::test]
async fn newer_load_wins_over_stale_one() {
    let mut player = player();
    let x = player.begin_load("a");
    let y = player.begin_load("c");
    assert_eq!(player.phase(), Phase::Loading);

    let events = story();
    let y_nodes = events.load_event("c").await;
    let x_nodes = events.load_event("a").await;

    player.commit_load(y, y_nodes).await.unwrap();
    let err = player.commit_load(x, x_nodes).await.unwrap_err();

    assert!(err.is_stale());
    assert_eq!(player.state().current_event.as_deref(), Some("c"));
    assert_eq!(player.state().status("a"), None);
    assert_eq!(player.current_node().map(Node::text), Some("c0"));
}

#[tokio::test]
async fn stale_commit_arriving_first_is_dropped() {
    let mut player = player();
    let x = player.begin_load("a");
    let y = player.begin_load("c");
    let events = story();

    let x_nodes = events.load_event("a").await;
    assert!(player.commit_load(x, x_nodes).await.unwrap_err().is_stale());
    assert_eq!(player.phase(), Phase::Loading);

    let y_nodes = events.load_event("c").await;
    player.commit_load(y, y_nodes).await.unwrap();
    assert_eq!(player.state().current_event.as_deref(), Some("c"));
}

#[tokio::test]
async fn advance_is_ignored_while_loading() {
    let mut player = player();
    player.start().await.unwrap();
    let _pending = player.begin_load("c");

    assert_eq!(
        player.advance().await.unwrap(),
        Advance::Ignored(Blocked::Loading)
    );
    assert_eq!(player.state().current_event.as_deref(), Some("a"));
}

#[tokio::test]
async fn failed_load_keeps_last_stable_state() {
    let manifest = vec![ManifestEntry::new("b"), ManifestEntry::new("missing")];
    let (mut player, _) = player_with(story(), manifest);
    player.start().await.unwrap();

    let err = player.advance().await.unwrap_err();

    assert!(matches!(
        err,
        PlaybackError::EventLoad { ref event, source: RepositoryError::EventNotFound { .. } }
            if event == "missing"
    ));
    assert_eq!(player.phase(), Phase::Ready);
    assert_eq!(player.state().current_event.as_deref(), Some("b"));
    assert_eq!(player.state().current_node_index, 0);
    assert_eq!(player.state().status("missing"), None);
    assert_eq!(player.state().status("b"), Some(EventStatus::Pending));
}

#[tokio::test]
async fn failed_jump_can_be_retried_without_repeating_the_node() {
    let mut effect = serde_json::Map::new();
    effect.insert("x".to_string(), json!(1));
    let events = story().with_event(
        "a",
        vec![
            Node::jump("nowhere")
                .with_music(MusicCue::Play("theme.mp3".to_string()))
                .with_effect(NodeEffect::Assign(effect)),
        ],
    );
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();

    for _ in 0..2 {
        let err = player.advance().await.unwrap_err();
        assert!(matches!(err, PlaybackError::EventLoad { ref event, .. } if event == "nowhere"));
    }

    assert!(player.sink().cues().is_empty());
    assert_eq!(player.state().choice("x"), None);
    assert_eq!(player.state().status("a"), Some(EventStatus::Pending));
    assert_eq!(player.state().current_event.as_deref(), Some("a"));
    assert_eq!(player.state().current_node_index, 0);
    assert_eq!(player.phase(), Phase::Ready);
}

#[tokio::test]
async fn leaving_an_event_autosaves_the_new_position() {
    let (mut player, store) = player_with(
        story(),
        vec![ManifestEntry::new("a"), ManifestEntry::new("b")],
    );
    player.start().await.unwrap();
    player.advance().await.unwrap();
    player.advance().await.unwrap();

    let saved = store.load(AUTOSAVE_KEY).await.unwrap().unwrap();
    assert_eq!(saved["currentEvent"], json!("b"));
    assert_eq!(saved["currentNodeIndex"], json!(0));
    assert_eq!(saved["eventStatus"]["a"], json!("completed"));
    assert_eq!(saved["eventStatus"]["b"], json!("pending"));
}

#[tokio::test]
async fn empty_event_is_a_load_error() {
    let events = story().with_event("hollow", Vec::new());
    let (mut player, _) = player_with(events, vec![ManifestEntry::new("hollow")]);

    let err = player.start().await.unwrap_err();
    assert!(matches!(
        err,
        PlaybackError::EventLoad {
            source: RepositoryError::InvalidFormat { .. },
            ..
        }
    ));
    assert_eq!(player.phase(), Phase::Idle);
}

#[tokio::test]
async fn replay_resets_index_and_leaves_other_statuses() {
    let mut player = player();
    player.start().await.unwrap();
    player.advance().await.unwrap();
    player.advance().await.unwrap();
    player.advance().await.unwrap();
    assert_eq!(player.state().current_event.as_deref(), Some("c"));
    assert_eq!(player.state().current_node_index, 1);

    let before = player.state().event_status.clone();
    player.toggle_overlay(Overlay::EventViewer);
    player.replay("a").await.unwrap();

    assert_eq!(player.overlay(), None);
    assert_eq!(player.state().current_event.as_deref(), Some("a"));
    assert_eq!(player.state().current_node_index, 0);
    for (event, status) in &before {
        if event != "a" {
            assert_eq!(player.state().status(event), Some(*status), "{event}");
        }
    }

    // Replaying twice ends in the same place
    player.replay("a").await.unwrap();
    assert_eq!(player.state().current_node_index, 0);
}

#[tokio::test]
async fn overlays_block_advance_and_exclude_each_other() {
    let mut player = player();
    player.start().await.unwrap();

    assert_eq!(
        player.toggle_overlay(Overlay::SaveMenu),
        Some(Overlay::SaveMenu)
    );
    assert_eq!(
        player.toggle_overlay(Overlay::EventViewer),
        Some(Overlay::EventViewer)
    );
    assert_eq!(
        player.advance().await.unwrap(),
        Advance::Ignored(Blocked::OverlayOpen)
    );
    assert_eq!(player.state().current_node_index, 0);

    assert_eq!(player.toggle_overlay(Overlay::EventViewer), None);
    assert_eq!(player.advance().await.unwrap(), Advance::Moved { index: 1 });
}

#[tokio::test]
async fn choice_records_value_then_advances() {
    let events = story().with_event("a", vec![yes_no(), line("after")]);
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();

    let outcome = player.select_option(0).await.unwrap();

    assert_eq!(outcome, Advance::Moved { index: 1 });
    assert_eq!(player.state().choice(USER_CHOICE_KEY), Some(&json!("Yes")));
    assert!(player.check_condition("user_choice == 'Yes'"));
}

#[tokio::test]
async fn out_of_range_option_is_rejected() {
    let events = story().with_event("a", vec![yes_no()]);
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();

    let err = player.select_option(5).await.unwrap_err();
    assert!(matches!(err, PlaybackError::NoSuchChoice { index: 5 }));
    assert!(player.state().choice(USER_CHOICE_KEY).is_none());
}

#[tokio::test]
async fn recorded_choice_steers_the_manifest() {
    let mut player = player();
    player.start().await.unwrap();
    player.advance().await.unwrap();

    let outcome = player.select_choice("x", json!(1)).await.unwrap();

    assert!(matches!(outcome, Advance::NextEvent { ref to, .. } if to == "b"));
}

#[tokio::test]
async fn effect_assignments_apply_on_advance() {
    let mut effect = serde_json::Map::new();
    effect.insert("x".to_string(), json!(1));
    let events = story().with_event(
        "a",
        vec![line("found it").with_effect(NodeEffect::Assign(effect))],
    );
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();
    assert!(player.state().choice("x").is_none());

    let outcome = player.advance().await.unwrap();

    assert_eq!(player.state().choice("x"), Some(&json!(1)));
    assert!(matches!(outcome, Advance::NextEvent { ref to, .. } if to == "b"));
}

#[tokio::test]
async fn audio_cues_dispatch_on_advance() {
    let events = story().with_event(
        "a",
        vec![
            line("one").with_music(MusicCue::Play("theme.mp3".to_string())),
            line("two")
                .with_music(MusicCue::Stop)
                .with_sfx(SfxCue::Many(vec!["door.mp3".to_string(), "steps.mp3".to_string()])),
            line("three"),
        ],
    );
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();

    player.advance().await.unwrap();
    player.advance().await.unwrap();

    assert_eq!(
        player.sink_mut().take(),
        vec![
            Cue::PlayMusic {
                track: "theme.mp3".to_string()
            },
            Cue::StopMusic,
            Cue::PlaySfx {
                track: "door.mp3".to_string()
            },
            Cue::PlaySfx {
                track: "steps.mp3".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn background_shown_when_node_changes() {
    let events = story().with_event(
        "a",
        vec![
            line("outside").with_background("street.png"),
            line("inside")
                .with_background("rain.webm")
                .with_effect(NodeEffect::Transition("glitch".to_string())),
        ],
    );
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();
    player.advance().await.unwrap();

    assert_eq!(
        player.sink().cues(),
        &[
            Cue::SetBackground {
                background: Background::Image("street.png".to_string()),
                transition: Transition::None,
            },
            Cue::SetBackground {
                background: Background::Video("rain.webm".to_string()),
                transition: Transition::Glitch,
            },
        ]
    );
}

#[tokio::test]
async fn auto_ticket_toggled_off_never_advances() {
    let mut player = player();
    player.start().await.unwrap();
    player.set_auto_mode(true);

    let ticket = player.auto_ticket().unwrap();
    assert_eq!(ticket.delay, Duration::from_millis(2 * 30 + 2000));

    player.set_auto_mode(false);
    assert_eq!(
        player.fire_auto(ticket).await.unwrap(),
        Advance::Ignored(Blocked::StaleTimer)
    );
    assert_eq!(player.state().current_node_index, 0);
}

#[tokio::test]
async fn auto_ticket_dies_when_node_changes() {
    let mut player = player();
    player.start().await.unwrap();
    player.set_auto_mode(true);
    let ticket = player.auto_ticket().unwrap();

    player.advance().await.unwrap();

    assert_eq!(
        player.fire_auto(ticket).await.unwrap(),
        Advance::Ignored(Blocked::StaleTimer)
    );
    assert_eq!(player.state().current_node_index, 1);
}

#[tokio::test]
async fn live_auto_ticket_advances() {
    let mut player = player();
    player.start().await.unwrap();
    assert!(player.toggle_auto_mode());

    let ticket = player.auto_ticket().unwrap();
    assert_eq!(
        player.fire_auto(ticket).await.unwrap(),
        Advance::Moved { index: 1 }
    );
}

#[tokio::test]
async fn no_auto_ticket_for_choices() {
    let events = story().with_event("a", vec![yes_no()]);
    let (mut player, _) = player_with(events, manifest());
    player.start().await.unwrap();
    player.set_auto_mode(true);

    assert!(player.auto_ticket().is_none());
}

#[tokio::test(start_paused = true)]
async fn auto_ticket_wait_then_fire() {
    let mut player = player();
    player.start().await.unwrap();
    player.set_auto_mode(true);

    let ticket = player.auto_ticket().unwrap();
    let started = tokio::time::Instant::now();
    let ticket = ticket.wait().await;
    assert!(started.elapsed() >= Duration::from_millis(2060));

    assert_eq!(
        player.fire_auto(ticket).await.unwrap(),
        Advance::Moved { index: 1 }
    );
}

#[tokio::test]
async fn slot_round_trip_reproduces_state() {
    let mut player = player();
    player.start().await.unwrap();
    player.state.set_choice("x", json!(2));
    player.advance().await.unwrap();
    player.advance().await.unwrap();
    player.advance().await.unwrap();
    let saved = player.state().clone();

    player.save_slot("midway").await.unwrap();
    player.replay("a").await.unwrap();
    player.state.set_choice("x", json!(9));
    assert_ne!(player.state(), &saved);

    player.toggle_overlay(Overlay::SaveMenu);
    let slot = player.load_slot("midway").await.unwrap();

    assert_eq!(slot.snapshot, saved);
    assert_eq!(player.state(), &saved);
    assert_eq!(player.current_node().map(Node::text), Some("c1"));
    assert_eq!(player.overlay(), None);
    assert!(player.slot_directory().await.unwrap().contains_key("midway"));
}

#[tokio::test]
async fn restore_clamps_out_of_range_index() {
    let mut player = player();
    let mut snapshot = NarrativeState::new();
    snapshot.current_event = Some("b".to_string());
    snapshot.current_node_index = 7;
    snapshot.mark("a", EventStatus::Completed);

    player.restore_snapshot(snapshot).await.unwrap();

    assert_eq!(player.state().current_node_index, 0);
    assert_eq!(player.state().status("a"), Some(EventStatus::Completed));
    // Restoring leaves statuses alone, so b is not marked pending
    assert_eq!(player.state().status("b"), None);
}

#[tokio::test]
async fn start_resumes_autosave() {
    let store = Arc::new(InMemoryPersistenceStore::new());
    let storage = Storage::new(store.clone());

    let mut first = Player::new(Arc::new(story()), manifest(), storage.clone(), RecordingSink::new());
    first.start().await.unwrap();
    first.state.set_choice("x", json!(2));
    first.advance().await.unwrap();
    first.advance().await.unwrap();
    first.advance().await.unwrap();
    first.end_session().await;

    let mut second = Player::new(Arc::new(story()), manifest(), storage, RecordingSink::new());
    let outcome = second.start().await.unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Resumed {
            event: "c".to_string(),
            index: 1
        }
    );
    assert_eq!(second.state(), first.state());
}

#[tokio::test]
async fn broken_autosave_starts_over() {
    let (mut player, store) = player_with(story(), manifest());
    store
        .save(AUTOSAVE_KEY, &json!({ "currentEvent": "gone", "currentNodeIndex": 3 }))
        .await
        .unwrap();

    let outcome = player.start().await.unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Fresh {
            event: "a".to_string()
        }
    );
    assert_eq!(player.state().current_node_index, 0);
}

struct BrokenStore;

#[async_trait]
impl PersistenceStore for BrokenStore {
    async fn save(&self, key: &str, _value: &Value) -> Result<(), PersistenceError> {
        Err(PersistenceError::Io {
            key: key.to_string(),
            message: "disk full".to_string(),
        })
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        Err(PersistenceError::Io {
            key: key.to_string(),
            message: "disk gone".to_string(),
        })
    }
}

#[tokio::test]
async fn persistence_failures_do_not_stop_playback() {
    let mut player = Player::new(
        Arc::new(story()),
        manifest(),
        Storage::new(Arc::new(BrokenStore)),
        RecordingSink::new(),
    );

    player.start().await.unwrap();
    player.advance().await.unwrap();
    player.advance().await.unwrap();
    assert_eq!(player.state().current_event.as_deref(), Some("c"));

    let err = player.save_slot("x").await.unwrap_err();
    assert!(matches!(err, PlaybackError::Persistence(PersistenceError::Io { .. })));
}

#[tokio::test]
async fn event_log_tracks_progress() {
    let mut player = player();
    player.start().await.unwrap();
    player.state.set_choice("x", json!(2));
    player.advance().await.unwrap();
    player.advance().await.unwrap();

    let glyphs: Vec<(String, char, bool)> = player
        .event_log()
        .into_iter()
        .map(|entry| (entry.event.clone(), entry.glyph(), entry.can_replay()))
        .collect();

    assert_eq!(
        glyphs,
        vec![
            ("a".to_string(), '✓', true),
            ("b".to_string(), '✗', false),
            ("c".to_string(), '⋯', false),
        ]
    );
}
