use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

use crate::{Seconds, Viewport};

/// Transport state shown by the controls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlaybackState {
    pub current_time: Seconds,
    pub is_playing: bool,
    pub zoom: f64,
    pub duration: Seconds,
}

/// Result of one clock step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tick {
    /// Not playing, or the first frame after play started.
    Idle,
    Advanced(Seconds),
    /// Reached the end: time went back to zero and playback stopped.
    Wrapped,
}

/// Owner of `current_time`. Advances by wall-clock deltas between animation
/// frames; a bound media element follows it, never the other way round.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,
    /// Timestamp of the previous frame in milliseconds.
    last_frame: Option<f64>,
}

impl PlaybackClock {
    pub fn new(zoom: f64) -> Self {
        Self {
            state: PlaybackState {
                current_time: 0.0,
                is_playing: false,
                zoom,
                duration: 0.0,
            },
            last_frame: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_time(&self) -> Seconds {
        self.state.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn duration(&self) -> Seconds {
        self.state.duration
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.state.zoom = zoom;
    }

    pub fn set_duration(&mut self, duration: Seconds) {
        self.state.duration = duration.max(0.0);
        self.state.current_time = self.state.current_time.clamp(0.0, self.state.duration);
    }

    /// Returns false when there is nothing to play.
    pub fn play(&mut self) -> bool {
        if self.state.duration <= 0.0 {
            return false;
        }
        self.state.is_playing = true;
        self.last_frame = None;
        true
    }

    pub fn pause(&mut self) {
        self.state.is_playing = false;
        self.last_frame = None;
    }

    pub fn seek(&mut self, time: Seconds) -> Seconds {
        self.state.current_time = time.clamp(0.0, self.state.duration.max(0.0));
        self.state.current_time
    }

    /// Animation-frame callback. The first frame after `play` only records
    /// its timestamp.
    pub fn frame(&mut self, timestamp_ms: f64) -> Tick {
        if !self.state.is_playing {
            return Tick::Idle;
        }
        let Some(last) = self.last_frame.replace(timestamp_ms) else {
            return Tick::Idle;
        };
        self.advance(((timestamp_ms - last) / 1000.0).max(0.0))
    }

    pub fn advance(&mut self, delta: Seconds) -> Tick {
        if !self.state.is_playing {
            return Tick::Idle;
        }
        let next = self.state.current_time + delta;
        if next >= self.state.duration {
            info!("playback reached the end at {:.3}s; rewinding", self.state.duration);
            self.state.current_time = 0.0;
            self.pause();
            return Tick::Wrapped;
        }
        self.state.current_time = next;
        Tick::Advanced(next)
    }
}

/// The media element playing alongside the timeline.
pub trait MediaEndpoint {
    fn current_time(&self) -> Seconds;
    fn set_current_time(&mut self, time: Seconds);
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
}

impl<T: MediaEndpoint + ?Sized> MediaEndpoint for Rc<RefCell<T>> {
    fn current_time(&self) -> Seconds {
        self.borrow().current_time()
    }

    fn set_current_time(&mut self, time: Seconds) {
        self.borrow_mut().set_current_time(time)
    }

    fn is_paused(&self) -> bool {
        self.borrow().is_paused()
    }

    fn play(&mut self) {
        self.borrow_mut().play()
    }

    fn pause(&mut self) {
        self.borrow_mut().pause()
    }
}

/// Media element stand-in with its own free-running clock.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    pub position: Seconds,
    pub paused: bool,
    pub seek_count: usize,
}

impl SimulatedMedia {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            paused: true,
            seek_count: 0,
        }
    }

    /// Let the element's own clock run, e.g. at a slightly different rate.
    pub fn run_for(&mut self, delta: Seconds) {
        if !self.paused {
            self.position += delta;
        }
    }
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEndpoint for SimulatedMedia {
    fn current_time(&self) -> Seconds {
        self.position
    }

    fn set_current_time(&mut self, time: Seconds) {
        self.position = time;
        self.seek_count += 1;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaSyncReport {
    pub seeked: bool,
    pub play_state_changed: bool,
}

/// Bring `media` in line with the clock. Position is only corrected past
/// `tolerance`; play/pause is reconciled independently.
pub fn reconcile_media(
    media: &mut dyn MediaEndpoint,
    current_time: Seconds,
    is_playing: bool,
    tolerance: Seconds,
) -> MediaSyncReport {
    let mut report = MediaSyncReport::default();
    let drift = (media.current_time() - current_time).abs();
    if drift > tolerance {
        debug!("media drifted {:.3}s; seeking to {:.3}", drift, current_time);
        media.set_current_time(current_time);
        report.seeked = true;
    }
    if is_playing && media.is_paused() {
        media.play();
        report.play_state_changed = true;
    } else if !is_playing && !media.is_paused() {
        media.pause();
        report.play_state_changed = true;
    }
    report
}

/// New `scroll_left` needed to bring the playhead back into the middle band
/// of the viewport, or `None` while it is still inside.
///
/// `playhead_x` is the playhead's offset within the scrolled content. The
/// band spans `band` of the visible width on each side of the centre.
pub fn autoscroll_target(playhead_x: f64, viewport: &Viewport, band: f64) -> Option<f64> {
    if viewport.client_width <= 0.0 {
        return None;
    }
    let center = viewport.client_width / 2.0;
    let visible_x = playhead_x - viewport.scroll_left;
    if (visible_x - center).abs() <= viewport.client_width * band {
        return None;
    }
    let target = viewport.clamp_scroll(playhead_x - center);
    (target != viewport.scroll_left).then_some(target)
}
