use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{same_time, Seconds, Segment, SegmentId, TimelineError, TrackKind};

/// Authoritative set of video and audio segments.
///
/// Each track keeps insertion order; lookups are linear, which is fine at the
/// tens-of-segments scale a single timeline holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SegmentStore {
    video: Vec<Segment>,
    audio: Vec<Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    pub fn len(&self) -> usize {
        self.video.len() + self.audio.len()
    }

    pub fn track(&self, kind: TrackKind) -> &[Segment] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    fn track_mut(&mut self, kind: TrackKind) -> &mut Vec<Segment> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }

    pub fn video(&self) -> &[Segment] {
        &self.video
    }

    pub fn audio(&self) -> &[Segment] {
        &self.audio
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.video.iter().chain(self.audio.iter())
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.video
            .iter_mut()
            .chain(self.audio.iter_mut())
            .find(|s| s.id == id)
    }

    fn position(&self, id: SegmentId) -> Option<(TrackKind, usize)> {
        if let Some(idx) = self.video.iter().position(|s| s.id == id) {
            return Some((TrackKind::Video, idx));
        }
        self.audio
            .iter()
            .position(|s| s.id == id)
            .map(|idx| (TrackKind::Audio, idx))
    }

    pub fn insert(&mut self, segment: Segment) -> Result<SegmentId, TimelineError> {
        if self.contains(segment.id) {
            return Err(TimelineError::SegmentExists(segment.id));
        }
        if !(segment.start_time < segment.end_time) {
            return Err(TimelineError::InvalidBounds {
                start: segment.start_time,
                end: segment.end_time,
            });
        }
        let id = segment.id;
        self.track_mut(segment.kind()).push(segment);
        Ok(id)
    }

    /// Insert a video/audio pair and link them. Both must share bounds.
    pub fn insert_linked_pair(
        &mut self,
        video: Segment,
        audio: Segment,
    ) -> Result<(SegmentId, SegmentId), TimelineError> {
        let video_id = self.insert(video)?;
        let audio_id = match self.insert(audio) {
            Ok(id) => id,
            Err(err) => {
                self.remove(video_id)?;
                return Err(err);
            }
        };
        if let Err(err) = self.link(video_id, audio_id) {
            self.remove(video_id)?;
            self.remove(audio_id)?;
            return Err(err);
        }
        Ok((video_id, audio_id))
    }

    /// Remove a segment. Its partner survives with the link cleared.
    pub fn remove(&mut self, id: SegmentId) -> Result<Segment, TimelineError> {
        let (kind, idx) = self
            .position(id)
            .ok_or(TimelineError::SegmentNotFound(id))?;
        let removed = self.track_mut(kind).remove(idx);
        if let Some(partner_id) = removed.link {
            if let Some(partner) = self.get_mut(partner_id) {
                if partner.link == Some(id) {
                    partner.link = None;
                }
            }
        }
        Ok(removed)
    }

    /// Pair two segments of opposite kinds that already share bounds.
    pub fn link(&mut self, a: SegmentId, b: SegmentId) -> Result<(), TimelineError> {
        let first = self.get(a).ok_or(TimelineError::SegmentNotFound(a))?;
        let second = self.get(b).ok_or(TimelineError::SegmentNotFound(b))?;
        if first.kind() == second.kind() {
            return Err(TimelineError::KindMismatch(a, b));
        }
        if !same_time(first.start_time, second.start_time)
            || !same_time(first.end_time, second.end_time)
        {
            return Err(TimelineError::InvalidBounds {
                start: second.start_time,
                end: second.end_time,
            });
        }
        // Drop whatever either side was paired with before.
        for (id, old) in [(a, first.link), (b, second.link)] {
            if let Some(old) = old.filter(|old| *old != a && *old != b) {
                if let Some(stale) = self.get_mut(old) {
                    if stale.link == Some(id) {
                        stale.link = None;
                    }
                }
            }
        }
        if let Some(seg) = self.get_mut(a) {
            seg.link = Some(b);
        }
        if let Some(seg) = self.get_mut(b) {
            seg.link = Some(a);
        }
        Ok(())
    }

    /// Partner of `id`, ignoring links whose other end no longer exists or
    /// does not point back.
    pub fn partner_of(&self, id: SegmentId) -> Option<SegmentId> {
        let segment = self.get(id)?;
        let partner_id = segment.link?;
        let partner = self.get(partner_id)?;
        (partner.link == Some(id) && partner.kind() != segment.kind()).then_some(partner_id)
    }

    /// Apply new bounds to a segment and its partner in one step.
    ///
    /// Returns the partner that was updated, if any. A dangling link is
    /// cleared instead of propagated. A pure translation carries the keyed
    /// waveform span along, so later splits still slice real samples.
    pub fn set_bounds(
        &mut self,
        id: SegmentId,
        start: Seconds,
        end: Seconds,
    ) -> Result<Option<SegmentId>, TimelineError> {
        if !(start < end) {
            return Err(TimelineError::InvalidBounds { start, end });
        }
        let had_link = self
            .get(id)
            .ok_or(TimelineError::SegmentNotFound(id))?
            .link
            .is_some();
        let partner = self.partner_of(id);

        let segment = self
            .get_mut(id)
            .ok_or(TimelineError::SegmentNotFound(id))?;
        segment.move_to(start, end);
        if had_link && partner.is_none() {
            warn!("segment {} links to a missing partner; clearing link", id);
            segment.link = None;
        }

        if let Some(partner_id) = partner {
            if let Some(partner) = self.get_mut(partner_id) {
                partner.move_to(start, end);
            }
        }
        Ok(partner)
    }

    /// Swap `parent` for two children, keeping track order: the left child
    /// takes the parent's slot and the right child follows it.
    pub(crate) fn replace_with_children(
        &mut self,
        parent: SegmentId,
        left: Segment,
        right: Segment,
    ) -> Result<(), TimelineError> {
        let (kind, idx) = self
            .position(parent)
            .ok_or(TimelineError::SegmentNotFound(parent))?;
        let track = self.track_mut(kind);
        track[idx] = left;
        track.insert(idx + 1, right);
        Ok(())
    }

    /// First segment (video track first) whose open interval holds `time`.
    pub fn find_containing(&self, time: Seconds) -> Option<&Segment> {
        self.iter().find(|s| s.strictly_contains(time))
    }

    /// Start and end of every segment, in track order.
    pub fn boundaries(&self) -> Vec<Seconds> {
        self.iter()
            .flat_map(|s| [s.start_time, s.end_time])
            .collect()
    }

    /// Check the structural invariants: positive spans above `min_duration`
    /// and symmetric links with identical bounds.
    pub fn validate(&self, min_duration: Seconds) -> Result<(), String> {
        for segment in self.iter() {
            if segment.duration() + crate::TIME_EPSILON < min_duration {
                return Err(format!(
                    "segment {} is shorter than {}s ({}..{})",
                    segment.id, min_duration, segment.start_time, segment.end_time
                ));
            }
            if let Some(partner_id) = segment.link {
                let partner = self
                    .get(partner_id)
                    .ok_or_else(|| format!("segment {} links to missing {}", segment.id, partner_id))?;
                if partner.link != Some(segment.id) {
                    return Err(format!("link {} -> {} is not symmetric", segment.id, partner_id));
                }
                if partner.kind() == segment.kind() {
                    return Err(format!("link {} -> {} joins same kinds", segment.id, partner_id));
                }
                if !same_time(partner.start_time, segment.start_time)
                    || !same_time(partner.end_time, segment.end_time)
                {
                    return Err(format!(
                        "linked segments {} and {} disagree on bounds",
                        segment.id, partner_id
                    ));
                }
            }
        }
        Ok(())
    }
}
