use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Seconds, TIME_EPSILON};

/// Closed-open span of timeline time, `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeSpan {
    pub start: Seconds,
    pub end: Seconds,
}

impl TimeSpan {
    pub fn new(start: Seconds, end: Seconds) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Seconds {
        self.end - self.start
    }
}

/// Amplitude samples for a segment. The sample count is independent of the
/// segment duration; `span` records which stretch of time the samples cover
/// when it is known.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Waveform {
    #[serde(default)]
    pub span: Option<TimeSpan>,
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn keyed(start: Seconds, end: Seconds, samples: Vec<f32>) -> Self {
        Self {
            span: Some(TimeSpan::new(start, end)),
            samples,
        }
    }

    pub fn unkeyed(samples: Vec<f32>) -> Self {
        Self {
            span: None,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn translate(&mut self, shift: Seconds) {
        if let Some(span) = self.span.as_mut() {
            span.start += shift;
            span.end += shift;
        }
    }

    /// Synthesize stand-in amplitudes for `[start, end)` at a density
    /// proportional to its duration.
    pub fn placeholder<R: Rng + ?Sized>(
        start: Seconds,
        end: Seconds,
        samples_per_second: f64,
        min_samples: usize,
        rng: &mut R,
    ) -> Self {
        let duration = (end - start).max(0.0);
        let count = ((samples_per_second * duration).floor() as usize).max(min_samples);
        Self::keyed(start, end, random_samples(count, rng))
    }

    /// Derive the waveform of a child segment covering `[start, end)`.
    ///
    /// When this waveform is keyed to a time range that encloses the child,
    /// the matching slice is extracted (start index floored, end index
    /// ceiled). Otherwise a placeholder is synthesized.
    pub fn derive_child<R: Rng + ?Sized>(
        &self,
        start: Seconds,
        end: Seconds,
        samples_per_second: f64,
        min_samples: usize,
        rng: &mut R,
    ) -> Self {
        if let Some(samples) = self.slice_samples(start, end) {
            return Self::keyed(start, end, samples);
        }
        Self::placeholder(start, end, samples_per_second, min_samples, rng)
    }

    fn slice_samples(&self, start: Seconds, end: Seconds) -> Option<Vec<f32>> {
        let span = self.span?;
        if self.samples.is_empty() {
            return None;
        }
        let range = span.duration();
        if !(range.is_finite() && range > 0.0) {
            return None;
        }

        let start_ratio = (start - span.start) / range;
        let end_ratio = (end - span.start) / range;
        if start_ratio < -TIME_EPSILON || end_ratio > 1.0 + TIME_EPSILON || start_ratio >= end_ratio
        {
            return None;
        }

        let len = self.samples.len();
        let start_index = ((start_ratio.max(0.0) * len as f64).floor() as usize).min(len);
        let end_index = ((end_ratio.min(1.0) * len as f64).ceil() as usize).min(len);
        if start_index >= end_index {
            return None;
        }
        Some(self.samples[start_index..end_index].to_vec())
    }
}

fn random_samples<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<f32> {
    (0..count).map(|_| rng.gen_range(0.2f32..1.0f32)).collect()
}
