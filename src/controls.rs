//! Player-adjustable settings: text speed, volumes, mute

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_TEXT_SPEED_MS: u32 = 10;
pub const MAX_TEXT_SPEED_MS: u32 = 100;
pub const TEXT_SPEED_STEP_MS: u32 = 10;
pub const DEFAULT_TEXT_SPEED_MS: u32 = 30;
pub const DEFAULT_VOLUME: u8 = 80;
pub const MAX_VOLUME: u8 = 100;

/// Settings the reader can change during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSettings {
    text_speed_ms: u32,
    music_volume: u8,
    sfx_volume: u8,
    muted: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            text_speed_ms: DEFAULT_TEXT_SPEED_MS,
            music_volume: DEFAULT_VOLUME,
            sfx_volume: DEFAULT_VOLUME,
            muted: false,
        }
    }
}

impl PlayerSettings {
    pub fn new(text_speed_ms: u32, music_volume: u8, sfx_volume: u8) -> Self {
        let mut settings = Self::default();
        settings.set_text_speed_ms(text_speed_ms);
        settings.set_music_volume(music_volume);
        settings.set_sfx_volume(sfx_volume);
        settings
    }

    /// Milliseconds per revealed character
    pub fn text_speed_ms(&self) -> u32 {
        self.text_speed_ms
    }

    pub fn text_speed(&self) -> Duration {
        Duration::from_millis(u64::from(self.text_speed_ms))
    }

    /// Set the text speed, clamped to 10..=100 ms per character
    pub fn set_text_speed_ms(&mut self, ms: u32) {
        self.text_speed_ms = ms.clamp(MIN_TEXT_SPEED_MS, MAX_TEXT_SPEED_MS);
    }

    /// Reveal text more slowly (one step more per character)
    pub fn slower(&mut self) -> u32 {
        self.set_text_speed_ms(self.text_speed_ms.saturating_add(TEXT_SPEED_STEP_MS));
        self.text_speed_ms
    }

    /// Reveal text faster (one step less per character)
    pub fn faster(&mut self) -> u32 {
        self.set_text_speed_ms(self.text_speed_ms.saturating_sub(TEXT_SPEED_STEP_MS));
        self.text_speed_ms
    }

    /// Effective music volume, 0 while muted
    pub fn music_volume(&self) -> u8 {
        if self.muted { 0 } else { self.music_volume }
    }

    /// Effective sound effect volume, 0 while muted
    pub fn sfx_volume(&self) -> u8 {
        if self.muted { 0 } else { self.sfx_volume }
    }

    /// Music gain in 0.0..=1.0
    pub fn music_gain(&self) -> f32 {
        f32::from(self.music_volume()) / f32::from(MAX_VOLUME)
    }

    /// Sound effect gain in 0.0..=1.0
    pub fn sfx_gain(&self) -> f32 {
        f32::from(self.sfx_volume()) / f32::from(MAX_VOLUME)
    }

    /// Set the music volume; while muted this is the volume restored on unmute
    pub fn set_music_volume(&mut self, volume: u8) {
        self.music_volume = volume.min(MAX_VOLUME);
    }

    pub fn set_sfx_volume(&mut self, volume: u8) {
        self.sfx_volume = volume.min(MAX_VOLUME);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Zero both volumes, or restore them; returns the new mute state
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }
}
