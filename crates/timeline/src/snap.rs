use tracing::trace;

use crate::{SampleMarks, Seconds, SegmentStore, TIME_EPSILON};

/// Magnetic alignment for drag and resize.
///
/// Candidates are `{0, duration}`, every segment boundary and every external
/// sample time, kept sorted and de-duplicated. Segment boundaries are also
/// kept separately, in track order, for the edge-priority pass.
#[derive(Debug, Clone)]
pub struct SnapEngine {
    threshold: Seconds,
    edge_threshold: Seconds,
    points: Vec<Seconds>,
    boundaries: Vec<Seconds>,
    active: Option<Seconds>,
}

impl SnapEngine {
    pub fn new(threshold: Seconds, edge_threshold: Seconds) -> Self {
        Self {
            threshold,
            edge_threshold,
            points: Vec::new(),
            boundaries: Vec::new(),
            active: None,
        }
    }

    pub fn rebuild(&mut self, store: &SegmentStore, marks: &SampleMarks, duration: Seconds) {
        self.boundaries = store.boundaries();

        let mut points = Vec::with_capacity(2 + self.boundaries.len() + marks.len());
        points.push(0.0);
        if duration > 0.0 {
            points.push(duration);
        }
        points.extend(self.boundaries.iter().copied());
        points.extend(marks.times());
        points.retain(|p| p.is_finite());
        points.sort_by(|a, b| a.total_cmp(b));
        points.dedup_by(|a, b| (*a - *b).abs() <= TIME_EPSILON);
        self.points = points;
        trace!("snap candidates rebuilt: {} points", self.points.len());
    }

    pub fn points(&self) -> &[Seconds] {
        &self.points
    }

    pub fn active_snap_point(&self) -> Option<Seconds> {
        self.active
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Nearest candidate to `time`, or `time` itself when nothing is close.
    ///
    /// With `edge_priority`, segment boundaries within the tight edge
    /// tolerance win outright (first hit in track order). Otherwise the
    /// closest candidate within the loose tolerance is chosen. Points in
    /// `excluded` are never returned. The result is remembered as the active
    /// snap point (or cleared when no snap happened).
    pub fn find_nearest_snap_point(
        &mut self,
        time: Seconds,
        excluded: &[Seconds],
        edge_priority: bool,
    ) -> Seconds {
        let is_excluded = |p: Seconds| excluded.iter().any(|e| (e - p).abs() <= TIME_EPSILON);

        if edge_priority {
            let hit = self
                .boundaries
                .iter()
                .copied()
                .find(|&b| !is_excluded(b) && (b - time).abs() < self.edge_threshold);
            if let Some(edge) = hit {
                self.active = Some(edge);
                return edge;
            }
        }

        let mut best: Option<(Seconds, Seconds)> = None;
        for &point in &self.points {
            if is_excluded(point) {
                continue;
            }
            let distance = (point - time).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((point, distance));
            }
        }

        match best {
            Some((point, distance)) if distance <= self.threshold => {
                self.active = Some(point);
                point
            }
            _ => {
                self.active = None;
                time
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SampleMark, Segment, Waveform};

    fn engine() -> SnapEngine {
        let mut store = SegmentStore::new();
        store
            .insert_linked_pair(
                Segment::video(2.0, 8.0, Waveform::default()),
                Segment::audio(2.0, 8.0, Waveform::default()),
            )
            .unwrap();
        let marks = SampleMarks::new(vec![SampleMark::new(5.0, "m.jpg"), SampleMark::new(8.0, "n.jpg")]);
        let mut snap = SnapEngine::new(0.5, 0.1);
        snap.rebuild(&store, &marks, 20.0);
        snap
    }

    #[test]
    fn test_points_sorted_and_deduplicated() {
        assert_eq!(engine().points(), &[0.0, 2.0, 5.0, 8.0, 20.0]);
    }

    #[test]
    fn test_registered_point_is_idempotent() {
        let mut snap = engine();
        for p in snap.points().to_vec() {
            assert_eq!(snap.find_nearest_snap_point(p, &[], false), p);
            assert_eq!(snap.active_snap_point(), Some(p));
        }
    }

    #[test]
    fn test_snaps_within_threshold() {
        let mut snap = engine();
        assert_eq!(snap.find_nearest_snap_point(4.6, &[], false), 5.0);
        assert_eq!(snap.find_nearest_snap_point(5.5, &[], false), 5.0);
        assert_eq!(snap.find_nearest_snap_point(3.5, &[], false), 3.5);
        assert_eq!(snap.active_snap_point(), None);
    }

    #[test]
    fn test_excluded_points_are_skipped() {
        let mut snap = engine();
        assert_eq!(snap.find_nearest_snap_point(2.2, &[2.0, 8.0], false), 2.2);
        assert_eq!(snap.find_nearest_snap_point(7.8, &[8.0], false), 7.8);
    }

    #[test]
    fn test_edge_priority_uses_tight_tolerance() {
        let mut snap = engine();
        assert_eq!(snap.find_nearest_snap_point(7.95, &[2.0], true), 8.0);
        // Sample mark at 5.0 is not a segment edge; the loose pass still applies.
        assert_eq!(snap.find_nearest_snap_point(5.3, &[2.0], true), 5.0);
        // Outside the edge tolerance the loose pass picks the closest point.
        assert_eq!(snap.find_nearest_snap_point(7.7, &[2.0], true), 8.0);
    }

    #[test]
    fn test_clear_resets_indicator() {
        let mut snap = engine();
        snap.find_nearest_snap_point(0.1, &[], false);
        assert_eq!(snap.active_snap_point(), Some(0.0));
        snap.clear();
        assert_eq!(snap.active_snap_point(), None);
    }
}
