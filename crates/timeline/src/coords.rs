use serde::{Deserialize, Serialize};

use crate::Seconds;

/// Layout of the scrollable timeline container, in CSS pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    /// Left edge of the container in client coordinates.
    pub container_left: f64,
    pub scroll_left: f64,
    /// Full scrollable content width.
    pub scroll_width: f64,
    /// Visible width.
    pub client_width: f64,
}

impl Viewport {
    pub fn new(client_width: f64) -> Self {
        Self {
            container_left: 0.0,
            scroll_left: 0.0,
            scroll_width: client_width,
            client_width,
        }
    }

    pub fn max_scroll_left(&self) -> f64 {
        (self.scroll_width - self.client_width).max(0.0)
    }

    pub fn clamp_scroll(&self, scroll_left: f64) -> f64 {
        scroll_left.clamp(0.0, self.max_scroll_left())
    }
}

/// Rendered width of the timeline content: one second spans
/// `pixels_per_second * zoom` pixels, never narrower than the visible area.
pub fn content_width(duration: Seconds, pixels_per_second: f64, zoom: f64, client_width: f64) -> f64 {
    (duration.max(0.0) * pixels_per_second * zoom).max(client_width)
}

/// Absolute position of a segment, in percent of the content width.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentGeometry {
    pub left_percent: f64,
    pub width_percent: f64,
}

/// Pointer/time conversion for one event.
///
/// Built from the viewport as it is *now*; zoom changes `scroll_width`, so a
/// mapper must never outlive the event it was created for.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    viewport: Viewport,
    duration: Seconds,
}

impl CoordinateMapper {
    pub fn new(viewport: Viewport, duration: Seconds) -> Self {
        Self { viewport, duration }
    }

    fn is_degenerate(&self) -> bool {
        !(self.duration > 0.0 && self.viewport.scroll_width > 0.0)
    }

    pub fn time_from_pointer(&self, client_x: f64) -> Seconds {
        if self.is_degenerate() {
            return 0.0;
        }
        let offset = client_x - self.viewport.container_left + self.viewport.scroll_left;
        offset / self.viewport.scroll_width * self.duration
    }

    /// Same as [`time_from_pointer`](Self::time_from_pointer), limited to `[0, duration]`.
    pub fn clamped_time_from_pointer(&self, client_x: f64) -> Seconds {
        self.time_from_pointer(client_x).clamp(0.0, self.duration.max(0.0))
    }

    pub fn pointer_from_time(&self, time: Seconds) -> f64 {
        if self.is_degenerate() {
            return self.viewport.container_left - self.viewport.scroll_left;
        }
        time / self.duration * self.viewport.scroll_width + self.viewport.container_left
            - self.viewport.scroll_left
    }

    /// Horizontal content offset of `time`, before scrolling.
    pub fn content_x(&self, time: Seconds) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        time / self.duration * self.viewport.scroll_width
    }

    pub fn percent_from_time(&self, time: Seconds) -> f64 {
        if self.duration > 0.0 {
            time / self.duration * 100.0
        } else {
            0.0
        }
    }

    pub fn time_from_percent(&self, percent: f64) -> Seconds {
        percent / 100.0 * self.duration
    }

    pub fn geometry(&self, start: Seconds, end: Seconds) -> SegmentGeometry {
        SegmentGeometry {
            left_percent: self.percent_from_time(start),
            width_percent: self.percent_from_time(end - start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(scroll_left: f64, zoom: f64) -> Viewport {
        let client_width = 800.0;
        Viewport {
            container_left: 40.0,
            scroll_left,
            scroll_width: content_width(120.0, 50.0, zoom, client_width),
            client_width,
        }
    }

    #[test]
    fn test_time_from_pointer() {
        let mapper = CoordinateMapper::new(viewport(0.0, 1.0), 120.0);
        // 6000px of content, pointer 340px into the container.
        assert!((mapper.time_from_pointer(380.0) - 6.8).abs() < 1e-9);
    }

    #[test]
    fn test_scroll_shifts_pointer_time() {
        let mapper = CoordinateMapper::new(viewport(600.0, 1.0), 120.0);
        assert!((mapper.time_from_pointer(40.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_percent_and_pointer() {
        for &(scroll, zoom) in &[(0.0, 0.5), (250.0, 1.0), (1900.0, 2.0), (37.5, 1.3)] {
            let mapper = CoordinateMapper::new(viewport(scroll, zoom), 120.0);
            for &time in &[0.0, 0.25, 17.3, 59.99, 120.0] {
                let via_percent = mapper.time_from_percent(mapper.percent_from_time(time));
                assert!((via_percent - time).abs() < 1e-9);
                let via_pointer = mapper.time_from_pointer(mapper.pointer_from_time(time));
                assert!((via_pointer - time).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_geometry() {
        let mapper = CoordinateMapper::new(viewport(0.0, 1.0), 40.0);
        let geometry = mapper.geometry(10.0, 20.0);
        assert!((geometry.left_percent - 25.0).abs() < 1e-9);
        assert!((geometry.width_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_content_width_never_below_viewport() {
        assert_eq!(content_width(4.0, 50.0, 0.5, 800.0), 800.0);
        assert_eq!(content_width(60.0, 50.0, 2.0, 800.0), 6000.0);
    }

    #[test]
    fn test_degenerate_duration_maps_to_zero() {
        let mapper = CoordinateMapper::new(viewport(0.0, 1.0), 0.0);
        assert_eq!(mapper.time_from_pointer(500.0), 0.0);
        assert_eq!(mapper.percent_from_time(3.0), 0.0);
    }

    #[test]
    fn test_clamped_pointer_time() {
        let mapper = CoordinateMapper::new(viewport(0.0, 1.0), 120.0);
        assert_eq!(mapper.clamped_time_from_pointer(-500.0), 0.0);
        assert_eq!(mapper.clamped_time_from_pointer(1e7), 120.0);
    }
}
