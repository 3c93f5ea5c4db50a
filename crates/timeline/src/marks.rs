use serde::{Deserialize, Serialize};

use crate::Seconds;

/// A sampled frame of the source media: where it sits and what it looks like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleMark {
    pub time: Seconds,
    pub preview_url: String,
}

impl SampleMark {
    pub fn new(time: Seconds, preview_url: impl Into<String>) -> Self {
        Self {
            time,
            preview_url: preview_url.into(),
        }
    }
}

/// Background tile for one sample mark, in percent of the content width.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkTile {
    pub time: Seconds,
    pub preview_url: String,
    pub left_percent: f64,
    pub width_percent: f64,
}

/// Sample marks kept sorted by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SampleMarks {
    marks: Vec<SampleMark>,
}

impl SampleMarks {
    pub fn new(marks: Vec<SampleMark>) -> Self {
        let mut marks = Self { marks };
        marks.sort();
        marks
    }

    fn sort(&mut self) {
        self.marks.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    pub fn replace(&mut self, marks: Vec<SampleMark>) {
        self.marks = marks;
        self.sort();
    }

    pub fn as_slice(&self) -> &[SampleMark] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = Seconds> + '_ {
        self.marks.iter().map(|m| m.time)
    }

    /// Re-derive marks after a segment moved from `[old_start, old_end]` to
    /// start at `new_start`: every mark inside the old range travels with it.
    ///
    /// Returns how many marks moved.
    pub fn shift_range(&mut self, old_start: Seconds, old_end: Seconds, new_start: Seconds) -> usize {
        let delta = new_start - old_start;
        if delta == 0.0 {
            return 0;
        }
        let mut moved = 0;
        for mark in &mut self.marks {
            if mark.time >= old_start && mark.time <= old_end {
                mark.time += delta;
                moved += 1;
            }
        }
        if moved > 0 {
            self.sort();
        }
        moved
    }

    /// Tiles for the timeline background. Each mark runs until the next one;
    /// the last runs to the end of the timeline.
    pub fn tiles(&self, duration: Seconds) -> Vec<MarkTile> {
        if duration <= 0.0 {
            return Vec::new();
        }
        self.marks
            .iter()
            .enumerate()
            .map(|(idx, mark)| {
                let next = self.marks.get(idx + 1).map_or(duration, |m| m.time);
                MarkTile {
                    time: mark.time,
                    preview_url: mark.preview_url.clone(),
                    left_percent: mark.time / duration * 100.0,
                    width_percent: (next - mark.time).max(0.0) / duration * 100.0,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks() -> SampleMarks {
        SampleMarks::new(vec![
            SampleMark::new(10.0, "c.jpg"),
            SampleMark::new(0.0, "a.jpg"),
            SampleMark::new(5.0, "b.jpg"),
        ])
    }

    #[test]
    fn test_marks_are_sorted() {
        let times: Vec<_> = marks().times().collect();
        assert_eq!(times, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_shift_range_moves_covered_marks() {
        let mut marks = marks();
        let moved = marks.shift_range(4.0, 10.0, 14.0);
        assert_eq!(moved, 2);
        let times: Vec<_> = marks.times().collect();
        assert_eq!(times, vec![0.0, 15.0, 20.0]);
    }

    #[test]
    fn test_shift_range_zero_delta() {
        let mut marks = marks();
        assert_eq!(marks.shift_range(0.0, 10.0, 0.0), 0);
    }

    #[test]
    fn test_tiles_span_to_next_mark() {
        let tiles = marks().tiles(20.0);
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].width_percent, 25.0);
        assert_eq!(tiles[1].left_percent, 25.0);
        assert_eq!(tiles[2].width_percent, 50.0);
        assert_eq!(tiles[2].preview_url, "c.jpg");
    }

    #[test]
    fn test_tiles_empty_without_duration() {
        assert!(marks().tiles(0.0).is_empty());
    }
}
