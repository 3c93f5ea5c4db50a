use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{same_time, Seconds, Waveform};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn opposite(self) -> Self {
        match self {
            Self::Video => Self::Audio,
            Self::Audio => Self::Video,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Kind-specific payload of a segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentMedia {
    Video {
        #[serde(default)]
        thumbnail: Option<String>,
    },
    Audio,
}

/// Portion of the original source media a segment plays, in source seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SourceRange {
    pub start: Seconds,
    pub end: Seconds,
}

impl SourceRange {
    pub fn new(start: Seconds, end: Seconds) -> Self {
        Self { start, end }
    }

    /// Split proportionally; `ratio` is the cut position within the segment.
    pub fn split_at_ratio(&self, ratio: f64) -> (SourceRange, SourceRange) {
        let cut = self.start + ratio * (self.end - self.start);
        (
            SourceRange::new(self.start, cut),
            SourceRange::new(cut, self.end),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub start_time: Seconds,
    pub end_time: Seconds,
    #[serde(default)]
    pub link: Option<SegmentId>,
    #[serde(default)]
    pub waveform: Waveform,
    #[serde(default)]
    pub source: Option<SourceRange>,
    #[serde(flatten)]
    pub media: SegmentMedia,
}

impl Segment {
    pub fn video(start_time: Seconds, end_time: Seconds, waveform: Waveform) -> Self {
        Self {
            id: SegmentId::new(),
            start_time,
            end_time,
            link: None,
            waveform,
            source: None,
            media: SegmentMedia::Video { thumbnail: None },
        }
    }

    pub fn audio(start_time: Seconds, end_time: Seconds, waveform: Waveform) -> Self {
        Self {
            id: SegmentId::new(),
            start_time,
            end_time,
            link: None,
            waveform,
            source: None,
            media: SegmentMedia::Audio,
        }
    }

    pub fn with_id(mut self, id: SegmentId) -> Self {
        self.id = id;
        self
    }

    pub fn with_source(mut self, source: SourceRange) -> Self {
        self.source = Some(source);
        self
    }

    /// Only video segments carry a thumbnail; audio segments ignore it.
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        if let SegmentMedia::Video { thumbnail } = &mut self.media {
            *thumbnail = Some(url.into());
        }
        self
    }

    pub fn kind(&self) -> TrackKind {
        match self.media {
            SegmentMedia::Video { .. } => TrackKind::Video,
            SegmentMedia::Audio => TrackKind::Audio,
        }
    }

    pub fn thumbnail(&self) -> Option<&str> {
        match &self.media {
            SegmentMedia::Video { thumbnail } => thumbnail.as_deref(),
            SegmentMedia::Audio => None,
        }
    }

    pub fn duration(&self) -> Seconds {
        self.end_time - self.start_time
    }

    /// True when `time` lies inside the open interval `(start, end)`.
    pub fn strictly_contains(&self, time: Seconds) -> bool {
        time > self.start_time && time < self.end_time
    }

    pub(crate) fn move_to(&mut self, start: Seconds, end: Seconds) {
        let shift = start - self.start_time;
        if same_time(end - self.end_time, shift) {
            self.waveform.translate(shift);
        }
        self.start_time = start;
        self.end_time = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_thumbnail() {
        let video = Segment::video(0.0, 5.0, Waveform::default()).with_thumbnail("thumb.jpg");
        assert_eq!(video.kind(), TrackKind::Video);
        assert_eq!(video.thumbnail(), Some("thumb.jpg"));

        let audio = Segment::audio(0.0, 5.0, Waveform::default()).with_thumbnail("ignored.jpg");
        assert_eq!(audio.kind(), TrackKind::Audio);
        assert_eq!(audio.thumbnail(), None);
    }

    #[test]
    fn test_strictly_contains_excludes_boundaries() {
        let seg = Segment::video(2.0, 4.0, Waveform::default());
        assert!(!seg.strictly_contains(2.0));
        assert!(seg.strictly_contains(3.0));
        assert!(!seg.strictly_contains(4.0));
    }

    #[test]
    fn test_source_range_split() {
        let (left, right) = SourceRange::new(10.0, 20.0).split_at_ratio(0.25);
        assert_eq!(left, SourceRange::new(10.0, 12.5));
        assert_eq!(right, SourceRange::new(12.5, 20.0));
    }

    #[test]
    fn test_serde_tags_media_kind() {
        let seg = Segment::audio(1.0, 2.0, Waveform::default());
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["type"], "audio");
        let back: Segment = serde_json::from_value(json).unwrap();
        assert_eq!(back, seg);
    }
}
