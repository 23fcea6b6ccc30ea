//! Presentation requests emitted by the playback controller
//!
//! The controller never plays audio or draws anything itself. It calls a
//! [`PresentationSink`], which hosts implement on top of their own audio and
//! rendering stack.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Receiver of music, sound and background requests
pub trait PresentationSink: Send {
    /// Play `track` looped, replacing any current track
    fn play_music(&mut self, track: &str);

    /// Stop the current track; implementations may fade out
    fn stop_music(&mut self);

    /// Play `track` once
    fn play_sfx(&mut self, track: &str);

    /// Show `background` using `transition`
    fn set_background(&mut self, background: &Background, transition: Transition);
}

/// A background image or looping video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    Image(String),
    Video(String),
}

impl Background {
    /// Classify by file extension: `mp4`, `webm` and `ogg` are videos
    pub fn from_name(name: &str) -> Self {
        let is_video = name
            .rsplit_once('.')
            .map(|(_, ext)| matches!(ext.to_ascii_lowercase().as_str(), "mp4" | "webm" | "ogg"))
            .unwrap_or(false);
        if is_video {
            Background::Video(name.to_string())
        } else {
            Background::Image(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Background::Image(name) | Background::Video(name) => name,
        }
    }
}

/// Visual transition used when the background changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    #[default]
    None,
    Fade,
    Glitch,
}

/// When a transition swaps the image and when its visual effect ends,
/// both measured from the start of the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTiming {
    pub swap_at: Duration,
    pub clear_at: Duration,
}

impl Transition {
    /// Map a node's `effect` string; unknown names mean no transition
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("fade") => Transition::Fade,
            Some("glitch") => Transition::Glitch,
            _ => Transition::None,
        }
    }

    pub fn timing(self) -> TransitionTiming {
        match self {
            Transition::None => TransitionTiming {
                swap_at: Duration::ZERO,
                clear_at: Duration::ZERO,
            },
            Transition::Fade => TransitionTiming {
                swap_at: Duration::from_millis(500),
                clear_at: Duration::from_millis(1000),
            },
            Transition::Glitch => TransitionTiming {
                swap_at: Duration::from_millis(300),
                clear_at: Duration::from_millis(1100),
            },
        }
    }
}

/// Interval between music fade-out steps
pub const FADE_STEP: Duration = Duration::from_millis(100);

/// Volume ladder for fading music out from `volume` (0.0 to 1.0)
///
/// Each step lowers the volume by 0.1; the last entry is silence.
pub fn fade_out_steps(volume: f32) -> Vec<f32> {
    let mut steps = Vec::new();
    let mut current = volume.clamp(0.0, 1.0);
    while current > 0.1 {
        current = ((current - 0.1) * 100.0).round() / 100.0;
        steps.push(current);
    }
    steps.push(0.0);
    steps
}

/// A presentation request, as recorded by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args")]
pub enum Cue {
    PlayMusic { track: String },
    StopMusic,
    PlaySfx { track: String },
    SetBackground {
        background: Background,
        transition: Transition,
    },
}

/// Sink that queues every request for later inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    cues: Vec<Cue>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Drain queued requests
    pub fn take(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }
}

impl PresentationSink for RecordingSink {
    fn play_music(&mut self, track: &str) {
        self.cues.push(Cue::PlayMusic {
            track: track.to_string(),
        });
    }

    fn stop_music(&mut self) {
        self.cues.push(Cue::StopMusic);
    }

    fn play_sfx(&mut self, track: &str) {
        self.cues.push(Cue::PlaySfx {
            track: track.to_string(),
        });
    }

    fn set_background(&mut self, background: &Background, transition: Transition) {
        self.cues.push(Cue::SetBackground {
            background: background.clone(),
            transition,
        });
    }
}
