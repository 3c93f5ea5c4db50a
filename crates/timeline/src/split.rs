use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    EngineConfig, Seconds, Segment, SegmentId, SegmentMedia, SegmentStore, TimelineError, Waveform,
};

/// What a split request did. Only `Split` and `Bootstrapped` mutate the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SplitOutcome {
    Bootstrapped {
        video: SegmentId,
        audio: SegmentId,
    },
    Split {
        /// Keeps the parent's identity.
        left: SegmentId,
        right: SegmentId,
        /// Children of the linked partner, left then right.
        partner: Option<(SegmentId, SegmentId)>,
    },
    NoSegment,
    TooCloseToEdge,
}

impl SplitOutcome {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Bootstrapped { .. } | Self::Split { .. })
    }
}

/// Video and audio segments covering `[0, end)`, linked, with synthesized
/// waveforms of a fixed sample count.
pub fn bootstrap_pair<R: Rng + ?Sized>(
    store: &mut SegmentStore,
    end: Seconds,
    samples: usize,
    rng: &mut R,
) -> Result<(SegmentId, SegmentId), TimelineError> {
    let mut video_samples = Vec::with_capacity(samples);
    let mut audio_samples = Vec::with_capacity(samples);
    for _ in 0..samples {
        video_samples.push(rng.gen_range(0.2f32..1.0f32));
        audio_samples.push(rng.gen_range(0.2f32..1.0f32));
    }
    let pair = store.insert_linked_pair(
        Segment::video(0.0, end, Waveform::keyed(0.0, end, video_samples)),
        Segment::audio(0.0, end, Waveform::keyed(0.0, end, audio_samples)),
    )?;
    info!("created bootstrap segment pair covering 0..{:.3}s", end);
    Ok(pair)
}

/// Cut the segment under the playhead in two, together with its partner.
pub fn split_at_playhead<R: Rng + ?Sized>(
    store: &mut SegmentStore,
    time: Seconds,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<SplitOutcome, TimelineError> {
    let Some(parent) = store.find_containing(time).cloned() else {
        if store.is_empty() && time == 0.0 {
            let (video, audio) = bootstrap_pair(
                store,
                config.bootstrap_fallback_duration,
                config.bootstrap_waveform_samples,
                rng,
            )?;
            return Ok(SplitOutcome::Bootstrapped { video, audio });
        }
        debug!("split at {:.3}: no segment under the playhead", time);
        return Ok(SplitOutcome::NoSegment);
    };

    let min = config.min_segment_duration;
    if time - parent.start_time < min || parent.end_time - time < min {
        debug!(
            "split at {:.3}: too close to an edge of [{:.3}, {:.3})",
            time, parent.start_time, parent.end_time
        );
        return Ok(SplitOutcome::TooCloseToEdge);
    }

    let parent_id = parent.id;
    let partner_id = store.partner_of(parent_id);

    let (left, right) = split_segment(&parent, time, config, rng);
    let (left_id, right_id) = (left.id, right.id);
    store.replace_with_children(parent_id, left, right)?;

    let mut partner = None;
    if let Some(partner_id) = partner_id {
        let partner_segment = store
            .get(partner_id)
            .ok_or(TimelineError::SegmentNotFound(partner_id))?;
        let (p_left, p_right) = split_segment(partner_segment, time, config, rng);
        let (p_left_id, p_right_id) = (p_left.id, p_right.id);
        store.replace_with_children(partner_id, p_left, p_right)?;
        store.link(left_id, p_left_id)?;
        store.link(right_id, p_right_id)?;
        partner = Some((p_left_id, p_right_id));
    }

    info!(
        "split {} at {:.3}s -> {} + {}{}",
        parent_id,
        time,
        left_id,
        right_id,
        if partner.is_some() { " (with partner)" } else { "" }
    );
    Ok(SplitOutcome::Split {
        left: left_id,
        right: right_id,
        partner,
    })
}

/// Children of `parent` at `time`, unlinked. The left child keeps the id and
/// thumbnail; the right child gets a fresh id.
fn split_segment<R: Rng + ?Sized>(
    parent: &Segment,
    time: Seconds,
    config: &EngineConfig,
    rng: &mut R,
) -> (Segment, Segment) {
    let sps = config.placeholder_samples_per_second;
    let min_samples = config.placeholder_min_samples;
    let ratio = (time - parent.start_time) / parent.duration();
    let sources = parent.source.map(|s| s.split_at_ratio(ratio));

    let left = Segment {
        id: parent.id,
        start_time: parent.start_time,
        end_time: time,
        link: None,
        waveform: parent
            .waveform
            .derive_child(parent.start_time, time, sps, min_samples, rng),
        source: sources.map(|(l, _)| l),
        media: parent.media.clone(),
    };
    let right = Segment {
        id: SegmentId::new(),
        start_time: time,
        end_time: parent.end_time,
        link: None,
        waveform: parent
            .waveform
            .derive_child(time, parent.end_time, sps, min_samples, rng),
        source: sources.map(|(_, r)| r),
        media: match parent.media {
            SegmentMedia::Video { .. } => SegmentMedia::Video { thumbnail: None },
            SegmentMedia::Audio => SegmentMedia::Audio,
        },
    };
    (left, right)
}
