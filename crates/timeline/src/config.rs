use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Seconds, TimelineError};

/// Tunables for the editing engine. Every field falls back to its default
/// when missing from a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Loose tolerance used when scanning every snap candidate.
    pub snap_threshold: Seconds,
    /// Tight tolerance for segment edges while resizing.
    pub edge_snap_threshold: Seconds,
    /// Floor for `end_time - start_time` of every segment.
    pub min_segment_duration: Seconds,
    /// A bound media element is only re-seeked past this drift.
    pub media_sync_tolerance: Seconds,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
    pub initial_zoom: f64,
    /// Distance covered by skip back / skip forward.
    pub skip_seconds: Seconds,
    /// Length of the pair created by a split on an empty timeline.
    pub bootstrap_fallback_duration: Seconds,
    pub placeholder_samples_per_second: f64,
    pub placeholder_min_samples: usize,
    pub bootstrap_waveform_samples: usize,
    /// Half-width of the auto-scroll dead band, as a fraction of the visible width.
    pub autoscroll_band: f64,
    /// Rendered width of one second of media at zoom 1.0.
    pub pixels_per_second: f64,
    /// Visible width assumed until the host reports its real viewport.
    pub viewport_width: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snap_threshold: 0.5,
            edge_snap_threshold: 0.1,
            min_segment_duration: 0.5,
            media_sync_tolerance: 0.1,
            zoom_min: 0.5,
            zoom_max: 2.0,
            zoom_step: 0.2,
            initial_zoom: 0.5,
            skip_seconds: 5.0,
            bootstrap_fallback_duration: 10.0,
            placeholder_samples_per_second: 100.0,
            placeholder_min_samples: 20,
            bootstrap_waveform_samples: 100,
            autoscroll_band: 0.25,
            pixels_per_second: 50.0,
            viewport_width: 1000.0,
        }
    }
}

impl EngineConfig {
    pub fn with_snap_threshold(mut self, threshold: Seconds) -> Self {
        self.snap_threshold = threshold;
        self
    }

    pub fn with_min_segment_duration(mut self, min: Seconds) -> Self {
        self.min_segment_duration = min;
        self
    }

    pub fn validate(&self) -> Result<(), TimelineError> {
        let positive = [
            ("snap_threshold", self.snap_threshold),
            ("edge_snap_threshold", self.edge_snap_threshold),
            ("min_segment_duration", self.min_segment_duration),
            ("media_sync_tolerance", self.media_sync_tolerance),
            ("zoom_min", self.zoom_min),
            ("zoom_step", self.zoom_step),
            ("bootstrap_fallback_duration", self.bootstrap_fallback_duration),
            ("placeholder_samples_per_second", self.placeholder_samples_per_second),
            ("pixels_per_second", self.pixels_per_second),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TimelineError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.zoom_min > self.zoom_max {
            return Err(TimelineError::Config(format!(
                "zoom range is inverted: {}..{}",
                self.zoom_min, self.zoom_max
            )));
        }
        if !(0.0..=0.5).contains(&self.autoscroll_band) {
            return Err(TimelineError::Config(format!(
                "autoscroll_band must be within 0..=0.5, got {}",
                self.autoscroll_band
            )));
        }
        if self.skip_seconds < 0.0 || self.viewport_width < 0.0 {
            return Err(TimelineError::Config(
                "skip_seconds and viewport_width cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<(), TimelineError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self, TimelineError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
