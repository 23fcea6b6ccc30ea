//! View state for the terminal player
//!
//! The terminal cannot show images or play audio, so [`ViewState`] implements
//! the presentation sink by remembering what would be on screen and queueing a
//! line for every visible change.

use crate::controls::PlayerSettings;
use crate::presentation::{Background, FADE_STEP, PresentationSink, Transition, fade_out_steps};

/// Clear the terminal screen
pub fn clear_screen() {
    print!("\x1b[2J\x1b[H");
    if std::io::Write::flush(&mut std::io::stdout()).is_err() {
        for _ in 0..50 {
            println!();
        }
    }
}

/// What the reader would currently see and hear
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Background currently shown
    pub background: Option<Background>,
    /// Track currently looping
    pub music: Option<String>,
    /// Last one-shot effect
    pub sfx_last: Option<String>,
    /// Music gain applied to new tracks
    pub music_gain: f32,
    /// Effect gain applied to one-shots
    pub sfx_gain: f32,
    lines: Vec<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            music_gain: 1.0,
            sfx_gain: 1.0,
            ..Self::default()
        }
    }

    /// Pick up volume and mute changes
    pub fn apply_settings(&mut self, settings: &PlayerSettings) {
        self.music_gain = settings.music_gain();
        self.sfx_gain = settings.sfx_gain();
    }

    /// Drain queued change lines
    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl PresentationSink for ViewState {
    fn play_music(&mut self, track: &str) {
        if self.music.as_deref() == Some(track) {
            return;
        }
        self.lines
            .push(format!("♪ {track} (volume {:.0}%)", self.music_gain * 100.0));
        self.music = Some(track.to_string());
    }

    fn stop_music(&mut self) {
        if let Some(track) = self.music.take() {
            let steps = fade_out_steps(self.music_gain);
            let fade_ms = FADE_STEP.as_millis() * steps.len() as u128;
            self.lines.push(format!("♪ {track} fades out ({fade_ms} ms)"));
        }
    }

    fn play_sfx(&mut self, track: &str) {
        if self.sfx_gain > 0.0 {
            self.lines.push(format!("* {track}"));
        }
        self.sfx_last = Some(track.to_string());
    }

    fn set_background(&mut self, background: &Background, transition: Transition) {
        if self.background.as_ref() == Some(background) {
            return;
        }
        let kind = match background {
            Background::Image(_) => "image",
            Background::Video(_) => "video",
        };
        let line = match transition {
            Transition::None => format!("[{kind}: {}]", background.name()),
            Transition::Fade | Transition::Glitch => format!(
                "[{kind}: {} ({transition:?}, {} ms)]",
                background.name(),
                transition.timing().clear_at.as_millis()
            ),
        };
        self.lines.push(line);
        self.background = Some(background.clone());
    }
}
