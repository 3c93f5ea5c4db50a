//! Timeline keyboard shortcuts
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Modifiers {
    pub fn any_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// A key press as delivered by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    /// Logical key value (`"s"`, `"+"`, `"-"` ...).
    pub key: String,
    /// Physical key code (`"NumpadAdd"` ...), when known.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Focus was in a text field; typing there must not edit the timeline.
    #[serde(default)]
    pub in_text_input: bool,
}

impl KeyInput {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: None,
            modifiers: Modifiers::default(),
            in_text_input: false,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn in_text_input(mut self) -> Self {
        self.in_text_input = true;
        self
    }
}

/// Keyboard command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommand {
    SplitAtPlayhead,
    ZoomIn,
    ZoomOut,
}

impl KeyCommand {
    /// Map a key press to a command, if it is bound to one
    pub fn from_input(input: &KeyInput) -> Option<Self> {
        if input.in_text_input {
            return None;
        }
        let code = input.code.as_deref();
        match input.key.as_str() {
            "s" if !input.modifiers.any_command() && !input.modifiers.shift => {
                Some(Self::SplitAtPlayhead)
            }
            "+" | "=" => Some(Self::ZoomIn),
            "-" | "_" => Some(Self::ZoomOut),
            _ if code == Some("NumpadAdd") => Some(Self::ZoomIn),
            _ if code == Some("NumpadSubtract") => Some(Self::ZoomOut),
            _ => None,
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::SplitAtPlayhead => "Split at Playhead",
            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
        }
    }

    /// Get keyboard shortcut display string
    pub fn shortcut_text(&self) -> &str {
        match self {
            Self::SplitAtPlayhead => "S",
            Self::ZoomIn => "+",
            Self::ZoomOut => "-",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::SplitAtPlayhead, Self::ZoomIn, Self::ZoomOut]
    }
}
