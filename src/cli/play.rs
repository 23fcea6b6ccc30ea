//! Terminal player mode
//!
//! Reads commands from stdin and races them against the auto-play timer.

use crate::{
    cli::view_state::{ViewState, clear_screen},
    config::PlayerConfig,
    infrastructure::{
        FileSystemEventRepository, FileSystemManifestRepository, HttpSlotDirectoryMirror,
        JsonFilePersistenceStore,
    },
    playback::{Advance, Overlay, Player, StartOutcome, auto_play::AutoTicket},
    storage::Storage,
    types::{NarrativeState, Node, NodeKind},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Options of the `play` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayOptions {
    /// Start with auto-play on
    pub auto: bool,
    /// Print the narrative state after every step
    pub debug: bool,
}

/// One line of player input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Advance,
    Choose(usize),
    ToggleAuto,
    EventLog,
    SaveMenu,
    Replay(String),
    Save(String),
    Load(String),
    Delete(String),
    Faster,
    Slower,
    Mute,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };

        match (head, rest) {
            ("", _) => Command::Advance,
            ("a", "") => Command::ToggleAuto,
            ("l", "") => Command::EventLog,
            ("v", "") => Command::SaveMenu,
            ("+", "") => Command::Faster,
            ("-", "") => Command::Slower,
            ("m", "") => Command::Mute,
            ("q", "") => Command::Quit,
            ("r", event) if !event.is_empty() => Command::Replay(event.to_string()),
            ("s", name) if !name.is_empty() => Command::Save(name.to_string()),
            ("o", name) if !name.is_empty() => Command::Load(name.to_string()),
            ("d", name) if !name.is_empty() => Command::Delete(name.to_string()),
            (digit, "") => match digit.parse::<usize>() {
                Ok(n @ 1..=9) => Command::Choose(n - 1),
                _ => Command::Unknown(input.to_string()),
            },
            _ => Command::Unknown(input.to_string()),
        }
    }
}

/// Run the player against the story in `config.data_dir`
pub async fn run_play(config: PlayerConfig, options: PlayOptions) -> anyhow::Result<()> {
    let events = Arc::new(FileSystemEventRepository::new(&config.data_dir));
    let manifest = FileSystemManifestRepository::new(config.manifest_path());
    let mut storage = Storage::new(Arc::new(JsonFilePersistenceStore::new(&config.save_dir)));
    if let Some(url) = &config.slot_mirror_url {
        match HttpSlotDirectoryMirror::new(url.clone()) {
            Ok(mirror) => storage = storage.with_mirror(Arc::new(mirror)),
            Err(err) => {
                log::warn!(target: "shiori::storage", "slot directory mirror disabled: {err}");
                eprintln!("[warn] saves will not be mirrored to {url}: {err}");
            }
        }
    }

    let mut view = ViewState::new();
    let settings = config.settings();
    view.apply_settings(&settings);

    let mut player = Player::from_repositories(events, &manifest, storage, view)
        .await?
        .with_settings(settings)
        .with_auto_base_delay(config.auto_base_delay());
    player.set_auto_mode(options.auto);

    println!("=== shiori ===");
    println!();
    print_controls();

    match player.start().await {
        Ok(StartOutcome::Resumed { event, index }) => println!("(resuming {event} at node {index})"),
        Ok(StartOutcome::Fresh { event }) => println!("(starting {event})"),
        Ok(StartOutcome::Empty) => println!("(the manifest lists no events)"),
        Err(err) => report(err),
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = None;

    loop {
        shown = render(&mut player, shown, options.debug);

        let ticket = player.auto_ticket();
        let command = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => Command::parse(&line),
                None => Command::Quit,
            },
            ticket = wait_for(ticket) => {
                if let Err(err) = player.fire_auto(ticket).await {
                    report(err);
                }
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        handle(&mut player, command).await;
    }

    player.end_session().await;
    println!("Goodbye!");
    Ok(())
}

async fn wait_for(ticket: Option<AutoTicket>) -> AutoTicket {
    match ticket {
        Some(ticket) => ticket.wait().await,
        None => std::future::pending().await,
    }
}

async fn handle(player: &mut Player<ViewState>, command: Command) {
    let result = match command {
        Command::Advance if player.current_node().is_some_and(Node::is_choice) => {
            if let Some(NodeKind::Choice { choices }) = player.current_node().map(|node| &node.kind)
            {
                println!("(pick 1-{})", choices.len());
            }
            Ok(())
        }
        Command::Advance => player.advance().await.map(|outcome| {
            if let Advance::Ignored(reason) = outcome {
                log::debug!(target: "shiori::playback", "input ignored: {reason:?}");
                if player.overlay().is_some() {
                    println!("(close the open view first: l or v)");
                }
            }
        }),
        Command::Choose(index) => player.select_option(index).await.map(|_| ()),
        Command::ToggleAuto => {
            let on = player.toggle_auto_mode();
            println!("(auto {})", if on { "on" } else { "off" });
            Ok(())
        }
        Command::EventLog => {
            if player.toggle_overlay(Overlay::EventViewer).is_some() {
                print_event_log(player);
            }
            Ok(())
        }
        Command::SaveMenu => {
            if player.toggle_overlay(Overlay::SaveMenu).is_some() {
                match player.slot_directory().await {
                    Ok(directory) if directory.is_empty() => println!("(no saves)"),
                    Ok(directory) => {
                        for (name, entry) in &directory {
                            println!("  {name}  {}", entry.timestamp);
                        }
                    }
                    Err(err) => report(err),
                }
            }
            Ok(())
        }
        Command::Replay(event) => {
            let replayable = player
                .event_log()
                .iter()
                .any(|entry| entry.event == event && entry.can_replay());
            if replayable {
                player.replay(&event).await
            } else {
                println!("(only completed events can be replayed)");
                Ok(())
            }
        }
        Command::Save(name) => player.save_slot(&name).await.map(|slot| {
            println!("(saved '{}' at {})", slot.name, slot.timestamp);
        }),
        Command::Load(name) => player.load_slot(&name).await.map(|slot| {
            println!("(loaded '{}')", slot.name);
        }),
        Command::Delete(name) => player.delete_slot(&name).await.map(|removed| {
            if removed {
                println!("(deleted '{name}')");
            } else {
                println!("(no save named '{name}')");
            }
        }),
        adjust @ (Command::Faster | Command::Slower | Command::Mute) => {
            adjust_settings(player, &adjust);
            Ok(())
        }
        Command::Quit => Ok(()),
        Command::Unknown(input) => {
            println!("Unknown command '{input}'.");
            print_controls();
            Ok(())
        }
    };

    if let Err(err) = result {
        report(err);
    }
}

fn adjust_settings(player: &mut Player<ViewState>, command: &Command) {
    let settings = player.settings_mut();
    match command {
        Command::Faster => println!("(text speed {} ms/char)", settings.faster()),
        Command::Slower => println!("(text speed {} ms/char)", settings.slower()),
        Command::Mute => {
            let muted = settings.toggle_mute();
            println!("({})", if muted { "muted" } else { "unmuted" });
        }
        _ => {}
    }
    let settings = player.settings().clone();
    player.sink_mut().apply_settings(&settings);
}

/// Show the current node if it changed since `shown`; returns what is shown
fn render(
    player: &mut Player<ViewState>,
    shown: Option<(String, usize)>,
    debug: bool,
) -> Option<(String, usize)> {
    let changes = player.sink_mut().take_lines();
    let print_changes = || {
        for line in &changes {
            println!("{line}");
        }
    };

    if player.is_finished() {
        print_changes();
        if shown.is_some() {
            println!();
            println!("== THE END ==");
            println!("(l: event log, r <event>: replay, q: quit)");
        }
        return None;
    }

    let Some(node) = player.current_node().cloned() else {
        print_changes();
        return None;
    };
    let position = (
        player.state().current_event.clone().unwrap_or_default(),
        player.state().current_node_index,
    );
    if shown.as_ref() == Some(&position) {
        print_changes();
        return shown;
    }

    if node.is_choice() {
        clear_screen();
    }
    print_changes();
    show_node(&node);
    if debug {
        show_debug(player.state());
    }
    Some(position)
}

fn show_node(node: &Node) {
    match &node.kind {
        NodeKind::Dialogue { text, speaker } => {
            if let Some(speaker) = speaker {
                println!("{speaker}:");
            }
            println!("{text}");
        }
        NodeKind::Choice { choices } => {
            println!("--- Choice ---");
            for (i, choice) in choices.iter().enumerate() {
                println!("{}. {}", i + 1, choice.text);
            }
        }
        NodeKind::Jump { target } => println!("→ {target}"),
    }
    println!();
}

fn show_debug(state: &NarrativeState) {
    println!("[debug]");
    println!(
        "event={} node={}",
        state.current_event.as_deref().unwrap_or("-"),
        state.current_node_index
    );
    let choices = serde_json::to_string(&state.choices).unwrap_or_else(|_| "{}".to_string());
    println!("choices={choices}");
    println!();
}

fn print_event_log(player: &Player<ViewState>) {
    println!("--- Events ---");
    for entry in player.event_log() {
        let replay = if entry.can_replay() { "  (r to replay)" } else { "" };
        println!("{} {}{replay}", entry.glyph(), entry.event);
    }
    println!("(l to close)");
}

fn print_controls() {
    println!("Controls:");
    println!("  Enter:     next");
    println!("  1-9:       select choice");
    println!("  a:         toggle auto");
    println!("  l:         event log");
    println!("  r <event>: replay a completed event");
    println!("  v:         list saves");
    println!("  s <name>:  save   o <name>: load   d <name>: delete");
    println!("  + / -:     faster / slower text   m: mute");
    println!("  q:         quit");
    println!();
}

fn report(err: crate::domain::PlaybackError) {
    if err.is_stale() {
        return;
    }
    eprintln!("[error] {:#}", anyhow::Error::from(err));
}
