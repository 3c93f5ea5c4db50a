//! Ruler ticks and time labels
use serde::{Deserialize, Serialize};

use crate::Seconds;

/// Format seconds as zero-padded `MM:SS`. Minutes keep counting past 59.
pub fn format_time(seconds: Seconds) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Spacing between ruler ticks for a timeline of the given length.
pub fn tick_interval(duration: Seconds) -> Seconds {
    if duration <= 30.0 {
        5.0
    } else if duration <= 60.0 {
        10.0
    } else if duration <= 300.0 {
        15.0
    } else if duration <= 900.0 {
        30.0
    } else {
        300.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulerTick {
    pub time: Seconds,
    pub percent: f64,
    pub label: String,
}

/// Ticks from 0 to `duration` inclusive. Zoomed in past 1.0 only every
/// second tick is kept, so labels do not crowd.
pub fn ruler_ticks(duration: Seconds, zoom: f64) -> Vec<RulerTick> {
    if !(duration > 0.0 && duration.is_finite()) {
        return Vec::new();
    }
    let interval = tick_interval(duration);
    let count = (duration / interval).floor() as u64;
    (0..=count)
        .filter(|i| zoom <= 1.0 || i % 2 == 0)
        .map(|i| {
            let time = i as f64 * interval;
            RulerTick {
                time,
                percent: time / duration * 100.0,
                label: format_time(time),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(-4.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn test_tick_interval_steps() {
        assert_eq!(tick_interval(30.0), 5.0);
        assert_eq!(tick_interval(45.0), 10.0);
        assert_eq!(tick_interval(300.0), 15.0);
        assert_eq!(tick_interval(600.0), 30.0);
        assert_eq!(tick_interval(3600.0), 300.0);
    }

    #[test]
    fn test_ruler_ticks() {
        let ticks = ruler_ticks(30.0, 1.0);
        let times: Vec<_> = ticks.iter().map(|t| t.time).collect();
        assert_eq!(times, vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0]);
        assert_eq!(ticks[1].label, "00:05");
        assert_eq!(ticks[6].percent, 100.0);
    }

    #[test]
    fn test_ruler_ticks_thin_out_when_zoomed() {
        let times: Vec<_> = ruler_ticks(30.0, 1.5).iter().map(|t| t.time).collect();
        assert_eq!(times, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_ruler_ticks_empty_timeline() {
        assert!(ruler_ticks(0.0, 1.0).is_empty());
    }
}
