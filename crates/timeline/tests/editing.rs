use std::cell::RefCell;
use std::rc::Rc;

use timeline::{
    CoordinateMapper, EngineConfig, InMemoryListenerHost, InteractionKind, ListenerKind,
    PointerInput, ResizeEdge, SampleMark, SegmentId, SharedListenerHost, SplitOutcome, Tick,
    TimelineEngine, TimelineEvent, Viewport,
};

fn engine(duration: f64) -> TimelineEngine {
    let mut engine = TimelineEngine::with_seed(EngineConfig::default(), 42).unwrap();
    engine.set_duration(duration).unwrap();
    engine
}

fn pointer_at(engine: &TimelineEngine, time: f64) -> PointerInput {
    PointerInput::mouse(engine.mapper().pointer_from_time(time))
}

fn split_at(engine: &mut TimelineEngine, time: f64) -> SplitOutcome {
    engine.seek(time);
    engine.split_at_playhead().unwrap()
}

fn bounds(engine: &TimelineEngine, id: SegmentId) -> (f64, f64) {
    let segment = engine.store().get(id).unwrap();
    (segment.start_time, segment.end_time)
}

fn assert_linked_bounds_agree(engine: &TimelineEngine) {
    for segment in engine.store().iter() {
        if let Some(partner) = engine.store().partner_of(segment.id) {
            let other = engine.store().get(partner).unwrap();
            assert_eq!(segment.start_time, other.start_time);
            assert_eq!(segment.end_time, other.end_time);
        }
    }
}

#[test]
fn test_coordinate_round_trip() {
    for &duration in &[1.0, 30.0, 600.0] {
        for &zoom in &[0.5, 1.0, 1.7, 2.0] {
            for &scroll_left in &[0.0, 120.0, 999.5] {
                let viewport = Viewport {
                    container_left: 24.0,
                    scroll_left,
                    scroll_width: timeline::content_width(duration, 50.0, zoom, 800.0),
                    client_width: 800.0,
                };
                let mapper = CoordinateMapper::new(viewport, duration);
                for step in 0..=20 {
                    let time = duration * step as f64 / 20.0;
                    let percent = mapper.percent_from_time(time);
                    assert!((mapper.time_from_percent(percent) - time).abs() < 1e-9);
                    let x = mapper.pointer_from_time(time);
                    assert!((mapper.time_from_pointer(x) - time).abs() < 1e-9);
                }
            }
        }
    }
}

#[test]
fn test_snap_points_are_idempotent() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 12.0);
    engine.set_sample_marks(vec![SampleMark::new(3.0, "a.jpg"), SampleMark::new(21.5, "b.jpg")]);
    assert_eq!(engine.snap_points(), &[0.0, 3.0, 12.0, 21.5, 30.0]);

    let mut snap = timeline::SnapEngine::new(0.5, 0.1);
    snap.rebuild(engine.store(), engine.marks(), engine.duration());
    for &point in engine.snap_points() {
        assert_eq!(snap.find_nearest_snap_point(point, &[], false), point);
    }
}

#[test]
fn test_drag_keeps_linked_bounds_identical() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 10.0);
    let audio = engine
        .store()
        .audio()
        .iter()
        .find(|s| s.start_time == 0.0)
        .unwrap()
        .id;

    engine.begin_drag(audio, pointer_at(&engine, 5.0)).unwrap();
    for &t in &[5.7, 9.3, 14.1, 22.6] {
        engine.pointer_move(pointer_at(&engine, t)).unwrap();
        assert_linked_bounds_agree(&engine);
    }
    let moved = engine.pointer_up().unwrap();
    assert!((moved.new_start - 17.6).abs() < 1e-9);
    assert_linked_bounds_agree(&engine);
    assert!(engine.validate().is_ok());
}

#[test]
fn test_resizes_never_break_duration_floor() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 10.0);
    split_at(&mut engine, 20.0);
    let middle = engine
        .store()
        .video()
        .iter()
        .find(|s| s.start_time == 10.0)
        .unwrap()
        .id;

    let targets = [19.9, 25.0, 0.0, -5.0, 19.95, 10.02, 31.0, 10.0];
    for (i, &target) in targets.iter().enumerate() {
        let edge = if i % 2 == 0 { ResizeEdge::Left } else { ResizeEdge::Right };
        engine.begin_resize(middle, edge, pointer_at(&engine, target)).unwrap();
        engine.pointer_move(pointer_at(&engine, target)).unwrap();
        engine.pointer_up();

        let (start, end) = bounds(&engine, middle);
        assert!(end - start >= 0.5 - 1e-9, "{:?} left [{}, {})", edge, start, end);
        assert!(start >= 0.0 && end <= 30.0 + 1e-9);
        assert_linked_bounds_agree(&engine);
    }
}

#[test]
fn test_split_conserves_interval_and_relinks() {
    let mut engine = engine(30.0);
    let video = engine.store().video()[0].id;
    let audio = engine.store().audio()[0].id;

    let outcome = split_at(&mut engine, 7.25);
    let SplitOutcome::Split { left, right, partner: Some((p_left, p_right)) } = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert_eq!(left, video);
    assert_eq!(p_left, audio);

    assert_eq!(bounds(&engine, left), (0.0, 7.25));
    assert_eq!(bounds(&engine, right), (7.25, 30.0));
    assert_eq!(bounds(&engine, p_left), (0.0, 7.25));
    assert_eq!(bounds(&engine, p_right), (7.25, 30.0));

    assert_eq!(engine.store().partner_of(left), Some(p_left));
    assert_eq!(engine.store().partner_of(right), Some(p_right));
    assert!(engine.validate().is_ok());
}

#[test]
fn test_playback_wraps_to_zero() {
    let mut engine = engine(30.0);
    engine.seek(29.95);
    engine.play();
    assert_eq!(engine.advance(1.0), Tick::Wrapped);
    assert_eq!(engine.current_time(), 0.0);
    assert!(!engine.is_playing());
}

#[test]
fn test_drag_without_slack_does_not_move() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 12.0);
    let tail = engine
        .store()
        .video()
        .iter()
        .find(|s| s.start_time == 12.0)
        .unwrap()
        .id;
    assert_eq!(bounds(&engine, tail), (12.0, 30.0));

    engine.begin_drag(tail, pointer_at(&engine, 20.0)).unwrap();
    // Pointer asks for a start of 15.
    engine.pointer_move(pointer_at(&engine, 23.0)).unwrap();
    assert_eq!(bounds(&engine, tail), (12.0, 30.0));
    let moved = engine.pointer_up().unwrap();
    assert_eq!(moved.new_start, 12.0);
}

#[test]
fn test_split_near_edge_is_noop() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 10.0);
    let before = engine.store().clone();

    let outcome = split_at(&mut engine, 9.7);
    assert_eq!(outcome, SplitOutcome::TooCloseToEdge);
    assert_eq!(engine.store(), &before);
}

#[test]
fn test_drag_callback_and_mark_shift() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 10.0);
    engine.set_sample_marks(vec![
        SampleMark::new(2.0, "a.jpg"),
        SampleMark::new(8.0, "b.jpg"),
        SampleMark::new(15.0, "c.jpg"),
    ]);
    engine.set_shift_marks_on_move(true);

    let reported = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reported);
    engine.on_segment_moved(move |m| sink.borrow_mut().push(*m));

    let head = engine.store().video()[0].id;
    engine.begin_drag(head, pointer_at(&engine, 0.0)).unwrap();
    engine.pointer_move(pointer_at(&engine, 3.0)).unwrap();
    engine.pointer_up();

    let reported = reported.borrow();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].segment_id, head);
    assert_eq!((reported[0].old_start, reported[0].old_end), (0.0, 10.0));
    assert!((reported[0].new_start - 3.0).abs() < 1e-9);

    let times: Vec<f64> = engine.marks().times().collect();
    assert!((times[0] - 5.0).abs() < 1e-9);
    assert!((times[1] - 11.0).abs() < 1e-9);
    assert_eq!(times[2], 15.0);
}

#[test]
fn test_cancel_releases_listeners_and_clears_snap() {
    let host = InMemoryListenerHost::shared();
    let shared: SharedListenerHost = host.clone();
    let mut engine = TimelineEngine::with_seed(EngineConfig::default(), 7)
        .unwrap()
        .with_listener_host(shared);
    engine.set_duration(30.0).unwrap();
    split_at(&mut engine, 10.0);
    engine.set_sample_marks(vec![SampleMark::new(20.0, "m.jpg")]);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    let head = engine.store().video()[0].id;
    engine.begin_drag(head, pointer_at(&engine, 1.0)).unwrap();
    assert!(host.borrow().is_attached(ListenerKind::TouchMove));

    // Start lands at 19.8, within snap range of the mark.
    engine.pointer_move(PointerInput::touch(engine.mapper().pointer_from_time(20.8))).unwrap();
    assert_eq!(engine.active_snap_point(), Some(20.0));
    assert_eq!(bounds(&engine, head), (20.0, 30.0));

    assert!(engine.pointer_cancel().is_some());
    assert_eq!(host.borrow().active_count(), 0);
    assert_eq!(engine.active_snap_point(), None);
    assert_eq!(engine.interaction(), None);
    assert!(events
        .borrow()
        .contains(&TimelineEvent::InteractionEnded(InteractionKind::Drag)));
}

#[test]
fn test_new_interaction_replaces_stale_one() {
    let host = InMemoryListenerHost::shared();
    let shared: SharedListenerHost = host.clone();
    let mut engine = TimelineEngine::with_seed(EngineConfig::default(), 7)
        .unwrap()
        .with_listener_host(shared);
    engine.set_duration(30.0).unwrap();
    let video = engine.store().video()[0].id;

    engine.begin_drag(video, pointer_at(&engine, 1.0)).unwrap();
    engine
        .begin_resize(video, ResizeEdge::Right, pointer_at(&engine, 30.0))
        .unwrap();
    assert_eq!(engine.interaction(), Some(InteractionKind::Resize));
    assert_eq!(host.borrow().active_count(), 5);

    engine.pointer_up();
    assert_eq!(host.borrow().active_count(), 0);
}

#[test]
fn test_pointer_events_without_session_are_ignored() {
    let mut engine = engine(30.0);
    let before = engine.store().clone();
    engine.pointer_move(PointerInput::mouse(400.0)).unwrap();
    assert_eq!(engine.pointer_up(), None);
    assert_eq!(engine.pointer_cancel(), None);
    assert_eq!(engine.store(), &before);
}

#[test]
fn test_mount_binds_keyboard_until_unmount() {
    let host = InMemoryListenerHost::shared();
    let shared: SharedListenerHost = host.clone();
    let mut engine = TimelineEngine::with_seed(EngineConfig::default(), 7)
        .unwrap()
        .with_listener_host(shared);
    engine.mount();
    assert!(host.borrow().is_attached(ListenerKind::KeyDown));
    engine.unmount();
    assert_eq!(host.borrow().active_count(), 0);
}

#[test]
fn test_zoom_keeps_pointer_mapping_current() {
    let mut engine = engine(120.0);
    engine.set_viewport(0.0, 1000.0);
    let at_half = engine.mapper().time_from_pointer(500.0);
    engine.set_zoom(2.0);
    let at_double = engine.mapper().time_from_pointer(500.0);
    assert!((at_half - 20.0).abs() < 1e-9);
    assert!((at_double - 5.0).abs() < 1e-9);
}

#[test]
fn test_split_under_drag_ends_the_drag() {
    let mut engine = engine(30.0);
    engine.mount();
    let video = engine.store().video()[0].id;

    engine.begin_drag(video, pointer_at(&engine, 5.0)).unwrap();
    engine.seek(12.0);
    assert_eq!(
        engine.handle_key(&timeline::KeyInput::key("s")).unwrap(),
        Some(timeline::KeyCommand::SplitAtPlayhead)
    );
    assert_eq!(engine.interaction(), None);

    // The released pointer no longer drives the left child.
    engine.pointer_move(pointer_at(&engine, 8.0)).unwrap();
    assert_eq!(bounds(&engine, video), (0.0, 12.0));
    let right = engine
        .store()
        .video()
        .iter()
        .find(|s| s.id != video)
        .unwrap()
        .id;
    assert_eq!(bounds(&engine, right), (12.0, 30.0));
    assert_linked_bounds_agree(&engine);
    assert!(engine.validate().is_ok());
}

#[test]
fn test_split_elsewhere_keeps_the_drag() {
    let mut engine = engine(30.0);
    split_at(&mut engine, 10.0);
    let tail = engine
        .store()
        .video()
        .iter()
        .find(|s| s.start_time == 10.0)
        .unwrap()
        .id;

    engine.begin_drag(tail, pointer_at(&engine, 20.0)).unwrap();
    let outcome = split_at(&mut engine, 5.0);
    assert!(matches!(outcome, SplitOutcome::Split { .. }));
    assert_eq!(engine.interaction(), Some(InteractionKind::Drag));
    assert_eq!(engine.pointer_up().unwrap().segment_id, tail);
}

#[test]
fn test_removing_partner_mid_drag_ends_the_drag() {
    let host = InMemoryListenerHost::shared();
    let shared: SharedListenerHost = host.clone();
    let mut engine = TimelineEngine::with_seed(EngineConfig::default(), 7)
        .unwrap()
        .with_listener_host(shared);
    engine.set_duration(30.0).unwrap();
    let video = engine.store().video()[0].id;
    let audio = engine.store().audio()[0].id;

    engine.begin_drag(video, pointer_at(&engine, 3.0)).unwrap();
    assert_eq!(host.borrow().active_count(), 5);

    engine.remove_segment(audio).unwrap();
    assert_eq!(engine.interaction(), None);
    assert_eq!(host.borrow().active_count(), 0);
    assert_eq!(engine.store().get(video).unwrap().link, None);

    engine.pointer_move(pointer_at(&engine, 9.0)).unwrap();
    assert_eq!(bounds(&engine, video), (0.0, 30.0));
}

#[test]
fn test_moved_segment_splits_real_samples() {
    let mut engine = TimelineEngine::with_seed(EngineConfig::default(), 7).unwrap();
    engine.set_source_waveform((0..300).map(|i| i as f32).collect());
    engine.set_duration(30.0).unwrap();
    split_at(&mut engine, 10.0);
    let head = engine.store().video()[0].id;

    engine.begin_drag(head, pointer_at(&engine, 0.0)).unwrap();
    engine.pointer_move(pointer_at(&engine, 15.0)).unwrap();
    engine.pointer_up();
    let (start, _) = bounds(&engine, head);
    assert!((start - 15.0).abs() < 1e-9);

    assert!(matches!(split_at(&mut engine, 20.0), SplitOutcome::Split { .. }));
    let samples = &engine.store().get(head).unwrap().waveform.samples;
    assert!((50..=51).contains(&samples.len()));
    assert_eq!(samples[0], 0.0);
    assert_eq!(samples[1], 1.0);
}
