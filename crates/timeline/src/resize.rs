use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ListenerGuard, Seconds, SegmentId, SegmentMove, SegmentStore, SnapEngine, TimelineError,
    TIME_EPSILON,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    Left,
    Right,
}

/// Moves one boundary of a segment (and its partner).
#[derive(Debug)]
pub struct ResizeSession {
    segment_id: SegmentId,
    edge: ResizeEdge,
    old_start: Seconds,
    old_end: Seconds,
    listeners: ListenerGuard,
}

impl ResizeSession {
    pub fn begin(
        store: &SegmentStore,
        segment_id: SegmentId,
        edge: ResizeEdge,
        listeners: ListenerGuard,
    ) -> Result<Self, TimelineError> {
        let segment = store
            .get(segment_id)
            .ok_or(TimelineError::SegmentNotFound(segment_id))?;
        debug!(
            "resize begin: {} {:?} edge of [{:.3}, {:.3})",
            segment_id, edge, segment.start_time, segment.end_time
        );
        Ok(Self {
            segment_id,
            edge,
            old_start: segment.start_time,
            old_end: segment.end_time,
            listeners,
        })
    }

    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    pub fn edge(&self) -> ResizeEdge {
        self.edge
    }

    /// Move the grabbed edge toward `pointer_time`.
    ///
    /// The candidate is clamped to the minimum length first and snapped
    /// second; a snap target that would undo the clamp is dropped.
    pub fn update(
        &mut self,
        store: &mut SegmentStore,
        snap: &mut SnapEngine,
        pointer_time: Seconds,
        duration: Seconds,
        min_duration: Seconds,
    ) -> Result<Option<SegmentId>, TimelineError> {
        let segment = store
            .get(self.segment_id)
            .ok_or(TimelineError::SegmentNotFound(self.segment_id))?;
        let (start, end) = (segment.start_time, segment.end_time);

        match self.edge {
            ResizeEdge::Left => {
                let limit = end - min_duration;
                let candidate = pointer_time.max(0.0).min(limit);
                let mut new_start = snap.find_nearest_snap_point(candidate, &[end], true);
                if new_start < 0.0 || new_start > limit + TIME_EPSILON {
                    snap.clear();
                    new_start = candidate;
                }
                store.set_bounds(self.segment_id, new_start, end)
            }
            ResizeEdge::Right => {
                let floor = start + min_duration;
                let candidate = pointer_time.min(duration).max(floor);
                let mut new_end = snap.find_nearest_snap_point(candidate, &[start], true);
                if new_end < floor - TIME_EPSILON || new_end > duration.max(floor) + TIME_EPSILON {
                    snap.clear();
                    new_end = candidate;
                }
                store.set_bounds(self.segment_id, start, new_end)
            }
        }
    }

    pub fn finish(mut self, store: &SegmentStore, snap: &mut SnapEngine) -> SegmentMove {
        self.listeners.dispose();
        snap.clear();
        let (new_start, new_end) = store
            .get(self.segment_id)
            .map_or((self.old_start, self.old_end), |s| (s.start_time, s.end_time));
        debug!(
            "resize end: {} [{:.3}, {:.3}) -> [{:.3}, {:.3})",
            self.segment_id, self.old_start, self.old_end, new_start, new_end
        );
        SegmentMove {
            segment_id: self.segment_id,
            old_start: self.old_start,
            old_end: self.old_end,
            new_start,
            new_end,
        }
    }
}
