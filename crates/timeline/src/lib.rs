use thiserror::Error;

mod config;
pub use config::*;
mod segment;
pub use segment::*;
mod waveform;
pub use waveform::*;
mod store;
pub use store::*;
mod coords;
pub use coords::*;
mod snap;
pub use snap::*;
mod marks;
pub use marks::*;
mod session;
pub use session::*;
mod drag;
pub use drag::*;
mod resize;
pub use resize::*;
mod split;
pub use split::*;
mod playback;
pub use playback::*;
mod keyboard;
pub use keyboard::*;
mod timecode;
pub use timecode::*;
mod overlay;
pub use overlay::*;
mod commands;
pub use commands::*;
mod engine;
pub use engine::*;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),
    #[error("segment already exists: {0}")]
    SegmentExists(SegmentId),
    #[error("overlay not found: {0}")]
    OverlayNotFound(OverlayId),
    #[error("overlay already exists: {0}")]
    OverlayExists(OverlayId),
    #[error("invalid bounds: start {start} must be before end {end}")]
    InvalidBounds { start: Seconds, end: Seconds },
    #[error("invalid duration: {0}")]
    InvalidDuration(Seconds),
    #[error("cannot link {0} to {1}: segments must be of opposite kinds")]
    KindMismatch(SegmentId, SegmentId),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Seconds = f64; // timeline time, always in seconds

/// Tolerance used when comparing timestamps that were copied, not computed.
pub const TIME_EPSILON: Seconds = 1e-9;

pub(crate) fn same_time(a: Seconds, b: Seconds) -> bool {
    (a - b).abs() <= TIME_EPSILON
}
