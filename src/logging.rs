//! Stderr logger behind the `log` facade
//!
//! Library code only calls `log::*` macros with `shiori::*` targets. Binaries
//! install [`StderrLogger`] once at startup; embedders can install any other
//! `log` backend instead.

use log::{LevelFilter, Log, Metadata, Record};
use std::collections::HashSet;
use std::io::Write;

/// Log target category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Branch condition parsing and evaluation
    Condition,
    /// Manifest scanning
    Ordering,
    /// Controller flow: loads, advances, auto-play
    Playback,
    /// Autosave and save slots
    Storage,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Condition,
        Category::Ordering,
        Category::Playback,
        Category::Storage,
    ];

    pub fn target(self) -> &'static str {
        match self {
            Category::Condition => "shiori::condition",
            Category::Ordering => "shiori::ordering",
            Category::Playback => "shiori::playback",
            Category::Storage => "shiori::storage",
        }
    }

    fn from_target(target: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.target() == target)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "condition" => Some(Category::Condition),
            "ordering" => Some(Category::Ordering),
            "playback" => Some(Category::Playback),
            "storage" => Some(Category::Storage),
            _ => None,
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum level
    pub level: LevelFilter,
    /// Enabled categories; records from other targets always pass
    pub categories: HashSet<Category>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Warn,
            categories: Category::ALL.into_iter().collect(),
        }
    }
}

impl LogConfig {
    /// Read `SHIORI_LOG`
    pub fn from_env() -> Self {
        std::env::var("SHIORI_LOG")
            .map(|spec| Self::parse(&spec))
            .unwrap_or_default()
    }

    /// Parse `level[:category,category...]`, e.g. `debug:playback,storage`
    ///
    /// Unknown levels fall back to `warn`; unknown categories are ignored.
    pub fn parse(spec: &str) -> Self {
        let (level, categories) = match spec.split_once(':') {
            Some((level, categories)) => (level, Some(categories)),
            None => (spec, None),
        };

        let mut config = Self {
            level: level.trim().parse().unwrap_or(LevelFilter::Warn),
            ..Self::default()
        };
        if let Some(categories) = categories {
            let picked: HashSet<Category> =
                categories.split(',').filter_map(Category::from_name).collect();
            if !picked.is_empty() {
                config.categories = picked;
            }
        }
        config
    }

    /// Show debug output for every category
    pub fn debug() -> Self {
        Self {
            level: LevelFilter::Debug,
            ..Self::default()
        }
    }
}

/// Writes `[LEVEL] category message` lines to stderr
pub struct StderrLogger {
    config: LogConfig,
}

impl StderrLogger {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// Install as the global logger; a second call is a no-op
    pub fn install(config: LogConfig) {
        let level = config.level;
        if log::set_boxed_logger(Box::new(Self::new(config))).is_ok() {
            log::set_max_level(level);
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.config.level {
            return false;
        }
        match Category::from_target(metadata.target()) {
            Some(category) => self.config.categories.contains(&category),
            None => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let category = record
            .target()
            .strip_prefix("shiori::")
            .unwrap_or(record.target());
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] {:10} {}",
            record.level(),
            category,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
