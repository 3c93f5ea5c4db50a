use serde::{Deserialize, Serialize};

use crate::{
    KeyCommand, KeyInput, Overlay, OverlayId, PointerInput, ResizeEdge, SampleMark, Seconds,
    Segment, SegmentId, SegmentMove, SplitOutcome, Tick, TimelineEngine, TimelineError,
};

/// Every user-facing engine operation, as data. Used to script the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TimelineCommand {
    Mount,
    Unmount,
    SetDuration {
        duration: Seconds,
    },
    SetSourceWaveform {
        samples: Vec<f32>,
    },
    SetSampleMarks {
        marks: Vec<SampleMark>,
    },
    SetViewport {
        container_left: f64,
        client_width: f64,
    },
    ScrollTo {
        scroll_left: f64,
    },
    Seek {
        time: Seconds,
    },
    ClickToSeek {
        client_x: f64,
    },
    Play,
    Pause,
    TogglePlayback,
    SkipForward,
    SkipBack,
    Frame {
        timestamp_ms: f64,
    },
    Advance {
        delta: Seconds,
    },
    ZoomIn,
    ZoomOut,
    SetZoom {
        zoom: f64,
    },
    SplitAtPlayhead,
    RemoveSegment {
        segment_id: SegmentId,
    },
    BeginDrag {
        segment_id: SegmentId,
        pointer: PointerInput,
    },
    BeginResize {
        segment_id: SegmentId,
        edge: ResizeEdge,
        pointer: PointerInput,
    },
    BeginScrub {
        pointer: PointerInput,
    },
    PointerMove {
        pointer: PointerInput,
    },
    PointerUp,
    PointerCancel,
    Key {
        input: KeyInput,
    },
    AddOverlay {
        overlay: Overlay,
    },
    RemoveOverlay {
        overlay_id: OverlayId,
    },
    SetOverlayTiming {
        overlay_id: OverlayId,
        start_time: Seconds,
        end_time: Seconds,
    },
}

/// What applying a command produced, beyond the state change itself.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    Split(SplitOutcome),
    SegmentRemoved(Segment),
    InteractionEnded(Option<SegmentMove>),
    Tick(Tick),
    Key(Option<KeyCommand>),
    OverlayAdded(OverlayId),
    OverlayRemoved(OverlayId),
}

pub fn apply_command(
    engine: &mut TimelineEngine,
    command: TimelineCommand,
) -> Result<CommandOutcome, TimelineError> {
    match command {
        TimelineCommand::Mount => engine.mount(),
        TimelineCommand::Unmount => engine.unmount(),
        TimelineCommand::SetDuration { duration } => engine.set_duration(duration)?,
        TimelineCommand::SetSourceWaveform { samples } => engine.set_source_waveform(samples),
        TimelineCommand::SetSampleMarks { marks } => engine.set_sample_marks(marks),
        TimelineCommand::SetViewport {
            container_left,
            client_width,
        } => engine.set_viewport(container_left, client_width),
        TimelineCommand::ScrollTo { scroll_left } => engine.scroll_to(scroll_left),
        TimelineCommand::Seek { time } => engine.seek(time),
        TimelineCommand::ClickToSeek { client_x } => {
            engine.click_to_seek(client_x);
        }
        TimelineCommand::Play => engine.play(),
        TimelineCommand::Pause => engine.pause(),
        TimelineCommand::TogglePlayback => engine.toggle_playback(),
        TimelineCommand::SkipForward => engine.skip_forward(),
        TimelineCommand::SkipBack => engine.skip_back(),
        TimelineCommand::Frame { timestamp_ms } => {
            return Ok(CommandOutcome::Tick(engine.frame(timestamp_ms)))
        }
        TimelineCommand::Advance { delta } => return Ok(CommandOutcome::Tick(engine.advance(delta))),
        TimelineCommand::ZoomIn => engine.zoom_in(),
        TimelineCommand::ZoomOut => engine.zoom_out(),
        TimelineCommand::SetZoom { zoom } => engine.set_zoom(zoom),
        TimelineCommand::SplitAtPlayhead => {
            return Ok(CommandOutcome::Split(engine.split_at_playhead()?))
        }
        TimelineCommand::RemoveSegment { segment_id } => {
            return Ok(CommandOutcome::SegmentRemoved(engine.remove_segment(segment_id)?))
        }
        TimelineCommand::BeginDrag {
            segment_id,
            pointer,
        } => engine.begin_drag(segment_id, pointer)?,
        TimelineCommand::BeginResize {
            segment_id,
            edge,
            pointer,
        } => engine.begin_resize(segment_id, edge, pointer)?,
        TimelineCommand::BeginScrub { pointer } => engine.begin_scrub(pointer),
        TimelineCommand::PointerMove { pointer } => engine.pointer_move(pointer)?,
        TimelineCommand::PointerUp => {
            return Ok(CommandOutcome::InteractionEnded(engine.pointer_up()))
        }
        TimelineCommand::PointerCancel => {
            return Ok(CommandOutcome::InteractionEnded(engine.pointer_cancel()))
        }
        TimelineCommand::Key { input } => return Ok(CommandOutcome::Key(engine.handle_key(&input)?)),
        TimelineCommand::AddOverlay { overlay } => {
            return Ok(CommandOutcome::OverlayAdded(engine.add_overlay(overlay)?))
        }
        TimelineCommand::RemoveOverlay { overlay_id } => {
            engine.remove_overlay(overlay_id)?;
            return Ok(CommandOutcome::OverlayRemoved(overlay_id));
        }
        TimelineCommand::SetOverlayTiming {
            overlay_id,
            start_time,
            end_time,
        } => engine.set_overlay_timing(overlay_id, start_time, end_time)?,
    }
    Ok(CommandOutcome::Applied)
}

impl TimelineEngine {
    pub fn apply(&mut self, command: TimelineCommand) -> Result<CommandOutcome, TimelineError> {
        apply_command(self, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;

    fn engine() -> TimelineEngine {
        TimelineEngine::with_seed(EngineConfig::default(), 3).unwrap()
    }

    #[test]
    fn test_commands_parse_from_json() {
        let script = r#"[
            { "command": "set_duration", "duration": 30.0 },
            { "command": "seek", "time": 12.0 },
            { "command": "split_at_playhead" },
            { "command": "pointer_move", "pointer": { "client_x": 40.0, "source": "touch" } },
            { "command": "key", "input": { "key": "s" } }
        ]"#;
        let commands: Vec<TimelineCommand> = serde_json::from_str(script).unwrap();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[1], TimelineCommand::Seek { time: 12.0 });
    }

    #[test]
    fn test_apply_split_reports_outcome() {
        let mut engine = engine();
        engine.apply(TimelineCommand::SetDuration { duration: 30.0 }).unwrap();
        engine.apply(TimelineCommand::Seek { time: 10.0 }).unwrap();
        let outcome = engine.apply(TimelineCommand::SplitAtPlayhead).unwrap();
        assert!(matches!(outcome, CommandOutcome::Split(SplitOutcome::Split { .. })));
        assert_eq!(engine.store().len(), 4);
    }

    #[test]
    fn test_apply_propagates_errors() {
        let mut engine = engine();
        let err = engine
            .apply(TimelineCommand::RemoveSegment {
                segment_id: SegmentId::new(),
            })
            .unwrap_err();
        assert!(matches!(err, TimelineError::SegmentNotFound(_)));
    }

    #[test]
    fn test_advance_reports_tick() {
        let mut engine = engine();
        engine.apply(TimelineCommand::SetDuration { duration: 30.0 }).unwrap();
        engine.apply(TimelineCommand::Play).unwrap();
        let outcome = engine.apply(TimelineCommand::Advance { delta: 0.5 }).unwrap();
        assert_eq!(outcome, CommandOutcome::Tick(Tick::Advanced(0.5)));
    }

    #[test]
    fn test_outcome_serializes() {
        let json = serde_json::to_value(CommandOutcome::Key(Some(KeyCommand::ZoomIn))).unwrap();
        assert_eq!(json["result"], "key");
        assert_eq!(json["value"], "zoom_in");
    }
}
