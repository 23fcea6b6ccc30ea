//! Player configuration

use crate::controls::{DEFAULT_TEXT_SPEED_MS, DEFAULT_VOLUME, PlayerSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where story data lives and how a session starts out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Directory holding the manifest and event files
    pub data_dir: PathBuf,
    /// Manifest file name, relative to `data_dir`
    pub manifest_file: String,
    /// Directory for the autosave and save slots
    pub save_dir: PathBuf,
    /// Endpoint receiving the slot directory on every change
    pub slot_mirror_url: Option<String>,
    /// Initial text speed in ms per character
    pub text_speed_ms: u32,
    /// Fixed part of the auto-play delay
    pub auto_base_delay_ms: u64,
    pub music_volume: u8,
    pub sfx_volume: u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            manifest_file: "order.json".to_string(),
            save_dir: PathBuf::from("saves"),
            slot_mirror_url: None,
            text_speed_ms: DEFAULT_TEXT_SPEED_MS,
            auto_base_delay_ms: 2000,
            music_volume: DEFAULT_VOLUME,
            sfx_volume: DEFAULT_VOLUME,
        }
    }
}

impl PlayerConfig {
    /// Defaults overlaid with `SHIORI_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overlay values looked up by environment variable name
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("SHIORI_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("SHIORI_SAVE_DIR") {
            self.save_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("SHIORI_MANIFEST") {
            self.manifest_file = file;
        }
        if let Some(url) = lookup("SHIORI_SLOT_MIRROR_URL") {
            self.slot_mirror_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(speed) = lookup("SHIORI_TEXT_SPEED") {
            match speed.trim().parse() {
                Ok(ms) => self.text_speed_ms = ms,
                Err(_) => log::warn!("ignoring SHIORI_TEXT_SPEED={speed}: not a number"),
            }
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(&self.manifest_file)
    }

    pub fn auto_base_delay(&self) -> Duration {
        Duration::from_millis(self.auto_base_delay_ms)
    }

    /// Initial reader settings
    pub fn settings(&self) -> PlayerSettings {
        PlayerSettings::new(self.text_speed_ms, self.music_volume, self.sfx_volume)
    }
}
