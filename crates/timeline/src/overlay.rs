use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Seconds, TimelineError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OverlayId(pub Uuid);

impl OverlayId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in percent of the preview frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Border {
    pub width: f64,
    pub color: String,
    #[serde(default)]
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SubtitleStyle {
    pub font_family: String,
    pub font_size: f64,
    pub color: String,
    pub background_color: String,
    pub opacity: f64,
    pub text_align: TextAlign,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 24.0,
            color: "#ffffff".to_string(),
            background_color: "rgba(0, 0, 0, 0.5)".to_string(),
            opacity: 1.0,
            text_align: TextAlign::Center,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayKind {
    Image {
        url: String,
        size: Size,
        #[serde(default)]
        rotation: f64,
        #[serde(default = "full_opacity")]
        opacity: f64,
        #[serde(default)]
        z_index: i32,
        #[serde(default)]
        border: Option<Border>,
        #[serde(default)]
        animation: Option<String>,
    },
    Subtitle {
        text: String,
        #[serde(default)]
        style: SubtitleStyle,
    },
}

fn full_opacity() -> f64 {
    1.0
}

/// Image or subtitle drawn over the preview during `[start_time, end_time)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Overlay {
    pub id: OverlayId,
    pub start_time: Seconds,
    pub end_time: Seconds,
    #[serde(default)]
    pub position: Position,
    #[serde(flatten)]
    pub kind: OverlayKind,
}

impl Overlay {
    pub fn new(start_time: Seconds, end_time: Seconds, kind: OverlayKind) -> Self {
        Self {
            id: OverlayId::new(),
            start_time,
            end_time,
            position: Position::default(),
            kind,
        }
    }

    pub fn subtitle(start_time: Seconds, end_time: Seconds, text: impl Into<String>) -> Self {
        Self::new(
            start_time,
            end_time,
            OverlayKind::Subtitle {
                text: text.into(),
                style: SubtitleStyle::default(),
            },
        )
    }

    pub fn is_active_at(&self, time: Seconds) -> bool {
        time >= self.start_time && time < self.end_time
    }

    /// Stacking order; subtitles sit above every image.
    pub fn layer(&self) -> i32 {
        match &self.kind {
            OverlayKind::Image { z_index, .. } => *z_index,
            OverlayKind::Subtitle { .. } => i32::MAX,
        }
    }
}

/// Image and subtitle overlays, independent of the segment tracks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverlayStore {
    overlays: Vec<Overlay>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    pub fn add(&mut self, overlay: Overlay) -> Result<OverlayId, TimelineError> {
        if !(overlay.start_time < overlay.end_time) {
            return Err(TimelineError::InvalidBounds {
                start: overlay.start_time,
                end: overlay.end_time,
            });
        }
        let id = overlay.id;
        if self.get(id).is_some() {
            return Err(TimelineError::OverlayExists(id));
        }
        self.overlays.push(overlay);
        Ok(id)
    }

    pub fn remove(&mut self, id: OverlayId) -> Result<Overlay, TimelineError> {
        let idx = self
            .overlays
            .iter()
            .position(|o| o.id == id)
            .ok_or(TimelineError::OverlayNotFound(id))?;
        Ok(self.overlays.remove(idx))
    }

    pub fn set_timing(
        &mut self,
        id: OverlayId,
        start_time: Seconds,
        end_time: Seconds,
    ) -> Result<(), TimelineError> {
        if !(start_time < end_time) {
            return Err(TimelineError::InvalidBounds {
                start: start_time,
                end: end_time,
            });
        }
        let overlay = self
            .overlays
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(TimelineError::OverlayNotFound(id))?;
        overlay.start_time = start_time;
        overlay.end_time = end_time;
        Ok(())
    }

    /// Overlays visible at `time`, bottom layer first.
    pub fn active_at(&self, time: Seconds) -> Vec<&Overlay> {
        let mut active: Vec<&Overlay> = self.overlays.iter().filter(|o| o.is_active_at(time)).collect();
        active.sort_by_key(|o| o.layer());
        active
    }
}
