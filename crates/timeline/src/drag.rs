use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ListenerGuard, Seconds, SegmentId, SegmentStore, SnapEngine, TimelineError, TIME_EPSILON};

/// Bounds of a segment before and after an interaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentMove {
    pub segment_id: SegmentId,
    pub old_start: Seconds,
    pub old_end: Seconds,
    pub new_start: Seconds,
    pub new_end: Seconds,
}

impl SegmentMove {
    pub fn is_noop(&self) -> bool {
        self.old_start == self.new_start && self.old_end == self.new_end
    }
}

/// One drag of a segment (and its partner) along the time axis.
///
/// The segment's length never changes during a drag; only its position does.
#[derive(Debug)]
pub struct DragSession {
    segment_id: SegmentId,
    old_start: Seconds,
    old_end: Seconds,
    /// Pointer time minus segment start at the moment of the grab.
    offset: Seconds,
    new_start: Seconds,
    listeners: ListenerGuard,
}

impl DragSession {
    pub fn begin(
        store: &SegmentStore,
        segment_id: SegmentId,
        pointer_time: Seconds,
        listeners: ListenerGuard,
    ) -> Result<Self, TimelineError> {
        let segment = store
            .get(segment_id)
            .ok_or(TimelineError::SegmentNotFound(segment_id))?;
        debug!(
            "drag begin: {} [{:.3}, {:.3}) grabbed at {:.3}",
            segment_id, segment.start_time, segment.end_time, pointer_time
        );
        Ok(Self {
            segment_id,
            old_start: segment.start_time,
            old_end: segment.end_time,
            offset: pointer_time - segment.start_time,
            new_start: segment.start_time,
            listeners,
        })
    }

    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    /// Reposition for a new pointer time. Returns the partner that moved along,
    /// if any.
    pub fn update(
        &mut self,
        store: &mut SegmentStore,
        snap: &mut SnapEngine,
        pointer_time: Seconds,
        duration: Seconds,
    ) -> Result<Option<SegmentId>, TimelineError> {
        let length = self.old_end - self.old_start;
        let max_start = (duration - length).max(0.0);
        let candidate = (pointer_time - self.offset).clamp(0.0, max_start);

        let mut start = snap.find_nearest_snap_point(candidate, &[self.old_start, self.old_end], false);
        if start < 0.0 || start > max_start + TIME_EPSILON {
            // A snap target past the slack would push the segment off the timeline.
            snap.clear();
            start = candidate;
        }

        self.new_start = start;
        store.set_bounds(self.segment_id, start, start + length)
    }

    pub fn finish(mut self, snap: &mut SnapEngine) -> SegmentMove {
        self.listeners.dispose();
        snap.clear();
        let moved = SegmentMove {
            segment_id: self.segment_id,
            old_start: self.old_start,
            old_end: self.old_end,
            new_start: self.new_start,
            new_end: self.new_start + (self.old_end - self.old_start),
        };
        debug!(
            "drag end: {} {:.3} -> {:.3}",
            moved.segment_id, moved.old_start, moved.new_start
        );
        moved
    }
}
