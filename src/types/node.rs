//! Event nodes: the steps a story event is made of
//!
//! On disk a node is a loosely shaped JSON object tagged by `"type"`.
//! It is normalized here into [`Node`], whose [`NodeKind`] is a closed sum
//! type, so the controller can match every variant exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step within an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    /// What kind of step this is
    pub kind: NodeKind,
    /// Music cue applied when the node is advanced past
    pub music: Option<MusicCue>,
    /// Sound effects played once when the node is advanced past
    pub sfx: Option<SfxCue>,
    /// Background shown while the node is current
    pub background: Option<String>,
    /// Background transition name or variable assignments
    pub effect: Option<NodeEffect>,
}

/// The closed set of node variants
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A line of text, optionally attributed to a speaker
    Dialogue {
        text: String,
        speaker: Option<String>,
    },
    /// A prompt the player answers by picking one option
    Choice { choices: Vec<ChoiceOption> },
    /// Leave the current event for `target`
    Jump { target: String },
}

/// A single selectable answer of a choice node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub text: String,
    #[serde(default)]
    pub value: Value,
}

/// Music instruction carried by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MusicCue {
    /// Play the named track looped
    Play(String),
    /// Stop whatever is playing
    Stop,
}

impl From<String> for MusicCue {
    fn from(value: String) -> Self {
        if value == "stop" {
            MusicCue::Stop
        } else {
            MusicCue::Play(value)
        }
    }
}

impl From<MusicCue> for String {
    fn from(cue: MusicCue) -> Self {
        match cue {
            MusicCue::Play(track) => track,
            MusicCue::Stop => "stop".to_string(),
        }
    }
}

/// One or several one-shot sound effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SfxCue {
    One(String),
    Many(Vec<String>),
}

impl SfxCue {
    /// Tracks in the order they should be triggered
    pub fn tracks(&self) -> Vec<&str> {
        match self {
            SfxCue::One(track) => vec![track.as_str()],
            SfxCue::Many(tracks) => tracks.iter().map(String::as_str).collect(),
        }
    }
}

/// The overloaded `effect` field of a node
///
/// A string names a background transition. An object is a set of
/// unconditional variable assignments applied when the node is advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeEffect {
    Transition(String),
    Assign(Map<String, Value>),
    /// Any other JSON shape; carried but ignored
    Other(Value),
}

impl Node {
    /// Build a plain dialogue node
    pub fn dialogue(text: impl Into<String>, speaker: Option<&str>) -> Self {
        Self::bare(NodeKind::Dialogue {
            text: text.into(),
            speaker: speaker.map(str::to_string),
        })
    }

    /// Build a choice node
    pub fn choice(choices: Vec<ChoiceOption>) -> Self {
        Self::bare(NodeKind::Choice { choices })
    }

    /// Build a jump node
    pub fn jump(target: impl Into<String>) -> Self {
        Self::bare(NodeKind::Jump {
            target: target.into(),
        })
    }

    fn bare(kind: NodeKind) -> Self {
        Self {
            kind,
            music: None,
            sfx: None,
            background: None,
            effect: None,
        }
    }

    pub fn with_music(mut self, cue: MusicCue) -> Self {
        self.music = Some(cue);
        self
    }

    pub fn with_sfx(mut self, cue: SfxCue) -> Self {
        self.sfx = Some(cue);
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn with_effect(mut self, effect: NodeEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Variable assignments carried by `effect`, if it is an object
    pub fn assignments(&self) -> Option<&Map<String, Value>> {
        match &self.effect {
            Some(NodeEffect::Assign(map)) => Some(map),
            _ => None,
        }
    }

    /// Transition name carried by `effect`, if it is a string
    pub fn transition_name(&self) -> Option<&str> {
        match &self.effect {
            Some(NodeEffect::Transition(name)) => Some(name),
            _ => None,
        }
    }

    /// Dialogue text, empty for other kinds
    pub fn text(&self) -> &str {
        match &self.kind {
            NodeKind::Dialogue { text, .. } => text,
            NodeKind::Choice { .. } | NodeKind::Jump { .. } => "",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, NodeKind::Choice { .. })
    }

    /// Short name of the variant, as written in the `type` field
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Dialogue { .. } => "dialogue",
            NodeKind::Choice { .. } => "choice",
            NodeKind::Jump { .. } => "jump",
        }
    }
}

/// Wire shape of a node before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    choices: Option<Vec<ChoiceOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    music: Option<MusicCue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sfx: Option<SfxCue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    effect: Option<NodeEffect>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_deref() {
            None | Some("dialogue") => NodeKind::Dialogue {
                text: raw.text.unwrap_or_default(),
                speaker: raw.speaker,
            },
            Some("choice") => NodeKind::Choice {
                choices: raw.choices.unwrap_or_default(),
            },
            Some("jump") => match raw.target {
                Some(target) if !target.is_empty() => NodeKind::Jump { target },
                _ => return Err("jump node is missing its target".to_string()),
            },
            Some(other) => return Err(format!("unknown node type '{other}'")),
        };

        Ok(Node {
            kind,
            music: raw.music,
            sfx: raw.sfx,
            background: raw.background,
            effect: raw.effect,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let mut raw = RawNode {
            music: node.music,
            sfx: node.sfx,
            background: node.background,
            effect: node.effect,
            ..RawNode::default()
        };
        match node.kind {
            NodeKind::Dialogue { text, speaker } => {
                raw.kind = Some("dialogue".to_string());
                raw.text = Some(text);
                raw.speaker = speaker;
            }
            NodeKind::Choice { choices } => {
                raw.kind = Some("choice".to_string());
                raw.choices = Some(choices);
            }
            NodeKind::Jump { target } => {
                raw.kind = Some("jump".to_string());
                raw.target = Some(target);
            }
        }
        raw
    }
}
