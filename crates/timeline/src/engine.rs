use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::{
    autoscroll_target, bootstrap_pair, content_width, reconcile_media, ruler_ticks,
    split_at_playhead, CoordinateMapper, DragSession, EngineConfig, InMemoryListenerHost,
    KeyCommand, KeyInput, ListenerGuard, ListenerKind, MarkTile, MediaEndpoint, Overlay,
    OverlayId, OverlayStore, PlaybackClock, PlaybackState, PointerInput, ResizeEdge,
    ResizeSession, RulerTick, SampleMark, SampleMarks, Seconds, Segment, SegmentGeometry,
    SegmentId, SegmentMove, SegmentStore, SharedListenerHost, SnapEngine, SplitOutcome, Tick,
    TimelineError, Viewport, Waveform, POINTER_SESSION_LISTENERS,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Drag,
    Resize,
    Scrub,
}

/// Notifications for views and other observers of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    SegmentsChanged,
    MarksChanged,
    OverlaysChanged,
    CurrentTimeChanged(Seconds),
    PlayingChanged(bool),
    ZoomChanged(f64),
    ScrollChanged(f64),
    SnapIndicatorChanged(Option<Seconds>),
    SegmentMoved(SegmentMove),
    InteractionEnded(InteractionKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&TimelineEvent)>;
type MoveCallback = Box<dyn FnMut(&SegmentMove)>;

enum Interaction {
    Drag(DragSession),
    Resize(ResizeSession),
    Scrub(ListenerGuard),
}

impl Interaction {
    fn kind(&self) -> InteractionKind {
        match self {
            Self::Drag(_) => InteractionKind::Drag,
            Self::Resize(_) => InteractionKind::Resize,
            Self::Scrub(_) => InteractionKind::Scrub,
        }
    }

    fn segment_id(&self) -> Option<SegmentId> {
        match self {
            Self::Drag(drag) => Some(drag.segment_id()),
            Self::Resize(resize) => Some(resize.segment_id()),
            Self::Scrub(_) => None,
        }
    }
}

/// Everything a view needs to render the timeline at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineSnapshot {
    pub playback: PlaybackState,
    pub segments: SegmentStore,
    pub marks: SampleMarks,
    pub overlays: OverlayStore,
    pub viewport: Viewport,
    pub active_snap_point: Option<Seconds>,
}

/// Owner of all timeline editing state.
///
/// Every mutation goes through a method here, completes in one call, and is
/// announced to subscribers afterwards. Pointer-driven operations map client
/// coordinates through a [`CoordinateMapper`] built fresh for each event.
pub struct TimelineEngine {
    config: EngineConfig,
    store: SegmentStore,
    snap: SnapEngine,
    marks: SampleMarks,
    overlays: OverlayStore,
    clock: PlaybackClock,
    viewport: Viewport,
    source_waveform: Waveform,
    media: Option<Box<dyn MediaEndpoint>>,
    listener_host: SharedListenerHost,
    keyboard: Option<ListenerGuard>,
    interaction: Option<Interaction>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    on_segment_moved: Option<MoveCallback>,
    shift_marks_on_move: bool,
    rng: StdRng,
}

impl TimelineEngine {
    pub fn new(config: EngineConfig) -> Result<Self, TimelineError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic placeholder waveforms, for tests and replays.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, TimelineError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Result<Self, TimelineError> {
        config.validate()?;
        let host: SharedListenerHost = Rc::new(RefCell::new(InMemoryListenerHost::new()));
        Ok(Self {
            snap: SnapEngine::new(config.snap_threshold, config.edge_snap_threshold),
            clock: PlaybackClock::new(config.clamp_zoom(config.initial_zoom)),
            viewport: Viewport::new(config.viewport_width),
            config,
            store: SegmentStore::new(),
            marks: SampleMarks::default(),
            overlays: OverlayStore::new(),
            source_waveform: Waveform::default(),
            media: None,
            listener_host: host,
            keyboard: None,
            interaction: None,
            observers: Vec::new(),
            next_subscription: 0,
            on_segment_moved: None,
            shift_marks_on_move: false,
            rng,
        })
    }

    /// Register listeners with the given host instead of the built-in registry.
    pub fn with_listener_host(mut self, host: SharedListenerHost) -> Self {
        self.listener_host = host;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn marks(&self) -> &SampleMarks {
        &self.marks
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn current_time(&self) -> Seconds {
        self.clock.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn zoom(&self) -> f64 {
        self.clock.zoom()
    }

    pub fn duration(&self) -> Seconds {
        self.clock.duration()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn active_snap_point(&self) -> Option<Seconds> {
        self.snap.active_snap_point()
    }

    pub fn snap_points(&self) -> &[Seconds] {
        self.snap.points()
    }

    pub fn interaction(&self) -> Option<InteractionKind> {
        self.interaction.as_ref().map(Interaction::kind)
    }

    pub fn is_mounted(&self) -> bool {
        self.keyboard.is_some()
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            playback: self.clock.state(),
            segments: self.store.clone(),
            marks: self.marks.clone(),
            overlays: self.overlays.clone(),
            viewport: self.viewport,
            active_snap_point: self.snap.active_snap_point(),
        }
    }

    /// Check the segment invariants; used by tests and the CLI report.
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate(self.config.min_segment_duration)
    }

    // Observers

    pub fn subscribe(&mut self, observer: impl FnMut(&TimelineEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Called with the old and new bounds after every completed drag.
    pub fn on_segment_moved(&mut self, callback: impl FnMut(&SegmentMove) + 'static) {
        self.on_segment_moved = Some(Box::new(callback));
    }

    /// Move sample marks along with dragged segments.
    pub fn set_shift_marks_on_move(&mut self, enabled: bool) {
        self.shift_marks_on_move = enabled;
    }

    fn emit(&mut self, event: TimelineEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    // Lifecycle

    /// Bind the global keyboard shortcuts.
    pub fn mount(&mut self) {
        if self.keyboard.is_some() {
            return;
        }
        self.keyboard = Some(ListenerGuard::acquire(&self.listener_host, &[ListenerKind::KeyDown]));
        debug!("timeline mounted");
    }

    /// Release every host listener and stop the playback loop.
    pub fn unmount(&mut self) {
        if let Some(mut keyboard) = self.keyboard.take() {
            keyboard.dispose();
        }
        if let Some(interaction) = self.interaction.take() {
            self.finish_interaction(interaction);
        }
        if self.clock.is_playing() {
            self.clock.pause();
            self.emit(TimelineEvent::PlayingChanged(false));
            self.sync_media();
        }
        debug!("timeline unmounted");
    }

    // External inputs

    /// Set the media duration. The first time a duration is known on an
    /// empty timeline, a full-length linked pair is created.
    pub fn set_duration(&mut self, duration: Seconds) -> Result<(), TimelineError> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(TimelineError::InvalidDuration(duration));
        }
        let previous_time = self.clock.current_time();
        self.clock.set_duration(duration);
        self.relayout();

        if self.store.is_empty() {
            if self.source_waveform.is_empty() {
                bootstrap_pair(
                    &mut self.store,
                    duration,
                    self.config.bootstrap_waveform_samples,
                    &mut self.rng,
                )?;
            } else {
                let samples = self.source_waveform.samples.clone();
                self.store.insert_linked_pair(
                    Segment::video(0.0, duration, Waveform::keyed(0.0, duration, samples.clone())),
                    Segment::audio(0.0, duration, Waveform::keyed(0.0, duration, samples)),
                )?;
                info!("created segment pair covering 0..{:.3}s from source waveform", duration);
            }
            self.emit(TimelineEvent::SegmentsChanged);
        }
        self.refresh_snap();

        if self.clock.current_time() != previous_time {
            self.emit(TimelineEvent::CurrentTimeChanged(self.clock.current_time()));
            self.sync_media();
        }
        Ok(())
    }

    /// Amplitudes of the whole source media, used for the first segments.
    pub fn set_source_waveform(&mut self, samples: Vec<f32>) {
        self.source_waveform = Waveform::unkeyed(samples);
    }

    pub fn set_sample_marks(&mut self, marks: Vec<SampleMark>) {
        self.marks.replace(marks);
        self.refresh_snap();
        self.emit(TimelineEvent::MarksChanged);
    }

    /// Bind the media element that should follow the clock.
    pub fn bind_media(&mut self, media: Box<dyn MediaEndpoint>) {
        self.media = Some(media);
        self.sync_media();
    }

    pub fn unbind_media(&mut self) -> Option<Box<dyn MediaEndpoint>> {
        self.media.take()
    }

    /// Report the container's position and visible width.
    pub fn set_viewport(&mut self, container_left: f64, client_width: f64) {
        self.viewport.container_left = container_left;
        self.viewport.client_width = client_width.max(0.0);
        self.relayout();
    }

    /// Manual scroll by the user.
    pub fn scroll_to(&mut self, scroll_left: f64) {
        let clamped = self.viewport.clamp_scroll(scroll_left);
        if clamped != self.viewport.scroll_left {
            self.viewport.scroll_left = clamped;
            self.emit(TimelineEvent::ScrollChanged(clamped));
        }
    }

    fn relayout(&mut self) {
        self.viewport.scroll_width = content_width(
            self.clock.duration(),
            self.config.pixels_per_second,
            self.clock.zoom(),
            self.viewport.client_width,
        );
        let clamped = self.viewport.clamp_scroll(self.viewport.scroll_left);
        if clamped != self.viewport.scroll_left {
            self.viewport.scroll_left = clamped;
            self.emit(TimelineEvent::ScrollChanged(clamped));
        }
    }

    // Geometry

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.viewport, self.clock.duration())
    }

    pub fn content_width(&self) -> f64 {
        self.viewport.scroll_width
    }

    pub fn segment_geometry(&self, id: SegmentId) -> Option<SegmentGeometry> {
        let segment = self.store.get(id)?;
        Some(self.mapper().geometry(segment.start_time, segment.end_time))
    }

    pub fn playhead_percent(&self) -> f64 {
        self.mapper().percent_from_time(self.clock.current_time())
    }

    pub fn ruler_ticks(&self) -> Vec<RulerTick> {
        ruler_ticks(self.clock.duration(), self.clock.zoom())
    }

    pub fn mark_tiles(&self) -> Vec<MarkTile> {
        self.marks.tiles(self.clock.duration())
    }

    // Playback

    pub fn seek(&mut self, time: Seconds) {
        self.clock.seek(time);
        self.after_time_change();
    }

    /// Seek to the time under a click on the ruler or track area.
    pub fn click_to_seek(&mut self, client_x: f64) -> Seconds {
        let time = self.mapper().clamped_time_from_pointer(client_x);
        self.seek(time);
        self.clock.current_time()
    }

    pub fn play(&mut self) {
        if self.clock.is_playing() {
            return;
        }
        if self.clock.play() {
            self.emit(TimelineEvent::PlayingChanged(true));
            self.sync_media();
        }
    }

    pub fn pause(&mut self) {
        if !self.clock.is_playing() {
            return;
        }
        self.clock.pause();
        self.emit(TimelineEvent::PlayingChanged(false));
        self.sync_media();
    }

    pub fn toggle_playback(&mut self) {
        if self.clock.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn skip_forward(&mut self) {
        self.seek(self.clock.current_time() + self.config.skip_seconds);
    }

    pub fn skip_back(&mut self) {
        self.seek(self.clock.current_time() - self.config.skip_seconds);
    }

    /// Animation-frame callback; `timestamp_ms` is the host's frame clock.
    pub fn frame(&mut self, timestamp_ms: f64) -> Tick {
        let tick = self.clock.frame(timestamp_ms);
        self.after_tick(tick);
        tick
    }

    /// Advance the clock by an explicit delta.
    pub fn advance(&mut self, delta: Seconds) -> Tick {
        let tick = self.clock.advance(delta);
        self.after_tick(tick);
        tick
    }

    fn after_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Idle => {}
            Tick::Advanced(_) => self.after_time_change(),
            Tick::Wrapped => {
                self.emit(TimelineEvent::PlayingChanged(false));
                self.after_time_change();
            }
        }
    }

    fn after_time_change(&mut self) {
        self.emit(TimelineEvent::CurrentTimeChanged(self.clock.current_time()));
        self.sync_media();
        if !matches!(self.interaction, Some(Interaction::Scrub(_))) {
            self.autoscroll();
        }
    }

    fn sync_media(&mut self) {
        let (time, playing) = (self.clock.current_time(), self.clock.is_playing());
        let tolerance = self.config.media_sync_tolerance;
        if let Some(media) = self.media.as_mut() {
            reconcile_media(media.as_mut(), time, playing, tolerance);
        }
    }

    fn autoscroll(&mut self) {
        let playhead_x = self.mapper().content_x(self.clock.current_time());
        if let Some(target) = autoscroll_target(playhead_x, &self.viewport, self.config.autoscroll_band) {
            self.viewport.scroll_left = target;
            self.emit(TimelineEvent::ScrollChanged(target));
        }
    }

    // Zoom

    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = self.config.clamp_zoom(zoom);
        if zoom == self.clock.zoom() {
            return;
        }
        self.clock.set_zoom(zoom);
        self.relayout();
        self.emit(TimelineEvent::ZoomChanged(zoom));
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.clock.zoom() + self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.clock.zoom() - self.config.zoom_step);
    }

    // Editing

    pub fn split_at_playhead(&mut self) -> Result<SplitOutcome, TimelineError> {
        let time = self.clock.current_time();
        let min = self.config.min_segment_duration;
        let target = self
            .store
            .find_containing(time)
            .filter(|s| time - s.start_time >= min && s.end_time - time >= min)
            .map(|s| s.id);
        if let Some(target) = target {
            // The left child keeps the parent's id; a session still holding
            // the parent's bounds would stretch it over its sibling.
            self.end_interaction_on(target, "split");
        }

        let outcome = split_at_playhead(
            &mut self.store,
            time,
            &self.config,
            &mut self.rng,
        )?;
        if outcome.is_mutation() {
            self.refresh_snap();
            self.emit(TimelineEvent::SegmentsChanged);
        }
        Ok(outcome)
    }

    /// Delete a segment. Its partner stays, unlinked.
    pub fn remove_segment(&mut self, id: SegmentId) -> Result<Segment, TimelineError> {
        self.end_interaction_on(id, "removed");
        let removed = self.store.remove(id)?;
        info!("removed {} segment {}", removed.kind(), id);
        self.refresh_snap();
        self.emit(TimelineEvent::SegmentsChanged);
        Ok(removed)
    }

    /// End a drag or resize holding `id` or its partner.
    fn end_interaction_on(&mut self, id: SegmentId, reason: &str) {
        let partner = self.store.partner_of(id);
        let touches_interaction = self
            .interaction
            .as_ref()
            .and_then(Interaction::segment_id)
            .map_or(false, |active| active == id || Some(active) == partner);
        if touches_interaction {
            if let Some(interaction) = self.interaction.take() {
                warn!("segment {} {} mid-interaction; ending it", id, reason);
                self.finish_interaction(interaction);
            }
        }
    }

    fn refresh_snap(&mut self) {
        // Candidates stay frozen while a pointer session runs, so a segment
        // never snaps to where it was a frame ago.
        if self.interaction.is_none() {
            self.snap
                .rebuild(&self.store, &self.marks, self.clock.duration());
        }
    }

    // Pointer sessions

    fn replace_interaction(&mut self) {
        if let Some(stale) = self.interaction.take() {
            warn!("{:?} still active when a new interaction began; ending it", stale.kind());
            self.finish_interaction(stale);
        }
    }

    fn acquire_pointer_listeners(&self) -> ListenerGuard {
        ListenerGuard::acquire(&self.listener_host, &POINTER_SESSION_LISTENERS)
    }

    pub fn begin_drag(&mut self, id: SegmentId, pointer: PointerInput) -> Result<(), TimelineError> {
        if !self.store.contains(id) {
            return Err(TimelineError::SegmentNotFound(id));
        }
        self.replace_interaction();
        self.refresh_snap();
        let time = self.mapper().time_from_pointer(pointer.client_x);
        let listeners = self.acquire_pointer_listeners();
        let session = DragSession::begin(&self.store, id, time, listeners)?;
        self.interaction = Some(Interaction::Drag(session));
        Ok(())
    }

    pub fn begin_resize(
        &mut self,
        id: SegmentId,
        edge: ResizeEdge,
        pointer: PointerInput,
    ) -> Result<(), TimelineError> {
        if !self.store.contains(id) {
            return Err(TimelineError::SegmentNotFound(id));
        }
        debug!(
            "resize grab at {:.3}s ({:?})",
            self.mapper().time_from_pointer(pointer.client_x),
            pointer.source
        );
        self.replace_interaction();
        self.refresh_snap();
        let listeners = self.acquire_pointer_listeners();
        let session = ResizeSession::begin(&self.store, id, edge, listeners)?;
        self.interaction = Some(Interaction::Resize(session));
        Ok(())
    }

    /// Grab the playhead; moves seek until release.
    pub fn begin_scrub(&mut self, pointer: PointerInput) {
        self.replace_interaction();
        let listeners = self.acquire_pointer_listeners();
        self.interaction = Some(Interaction::Scrub(listeners));
        debug!("scrub begin");
        self.scrub_to(pointer.client_x);
    }

    fn scrub_to(&mut self, client_x: f64) {
        let time = self.mapper().clamped_time_from_pointer(client_x);
        self.clock.seek(time);
        self.after_time_change();
    }

    /// Pointer moved during a session. Ignored when no session is active.
    pub fn pointer_move(&mut self, pointer: PointerInput) -> Result<(), TimelineError> {
        let time = self.mapper().time_from_pointer(pointer.client_x);
        let duration = self.clock.duration();
        let min_duration = self.config.min_segment_duration;
        let snap_before = self.snap.active_snap_point();

        if matches!(self.interaction, Some(Interaction::Scrub(_))) {
            self.scrub_to(pointer.client_x);
            return Ok(());
        }
        let result = match self.interaction.as_mut() {
            None => return Ok(()),
            Some(Interaction::Scrub(_)) => Ok(None),
            Some(Interaction::Drag(drag)) => {
                drag.update(&mut self.store, &mut self.snap, time, duration)
            }
            Some(Interaction::Resize(resize)) => {
                resize.update(&mut self.store, &mut self.snap, time, duration, min_duration)
            }
        };
        result?;

        self.emit(TimelineEvent::SegmentsChanged);
        let snap_after = self.snap.active_snap_point();
        if snap_after != snap_before {
            self.emit(TimelineEvent::SnapIndicatorChanged(snap_after));
        }
        Ok(())
    }

    /// Release ends the session. Returns the bounds change for drag and resize.
    pub fn pointer_up(&mut self) -> Option<SegmentMove> {
        let interaction = self.interaction.take()?;
        self.finish_interaction(interaction)
    }

    /// Abnormal termination (focus lost, touch cancelled). Ends the session
    /// like a release; the segment keeps its last applied bounds.
    pub fn pointer_cancel(&mut self) -> Option<SegmentMove> {
        let interaction = self.interaction.take()?;
        debug!("{:?} cancelled", interaction.kind());
        self.finish_interaction(interaction)
    }

    fn finish_interaction(&mut self, interaction: Interaction) -> Option<SegmentMove> {
        let kind = interaction.kind();
        let had_snap = self.snap.active_snap_point().is_some();
        let change = match interaction {
            Interaction::Drag(drag) => {
                let moved = drag.finish(&mut self.snap);
                if let Some(callback) = self.on_segment_moved.as_mut() {
                    callback(&moved);
                }
                if self.shift_marks_on_move
                    && self.marks.shift_range(moved.old_start, moved.old_end, moved.new_start) > 0
                {
                    self.emit(TimelineEvent::MarksChanged);
                }
                self.emit(TimelineEvent::SegmentMoved(moved));
                Some(moved)
            }
            Interaction::Resize(resize) => Some(resize.finish(&self.store, &mut self.snap)),
            Interaction::Scrub(mut listeners) => {
                listeners.dispose();
                None
            }
        };
        if had_snap {
            self.emit(TimelineEvent::SnapIndicatorChanged(None));
        }
        self.refresh_snap();
        self.emit(TimelineEvent::InteractionEnded(kind));
        change
    }

    // Keyboard

    /// Dispatch a key press. Only bound while mounted.
    pub fn handle_key(&mut self, input: &KeyInput) -> Result<Option<KeyCommand>, TimelineError> {
        if !self.is_mounted() {
            return Ok(None);
        }
        let Some(command) = KeyCommand::from_input(input) else {
            return Ok(None);
        };
        match command {
            KeyCommand::SplitAtPlayhead => {
                self.split_at_playhead()?;
            }
            KeyCommand::ZoomIn => self.zoom_in(),
            KeyCommand::ZoomOut => self.zoom_out(),
        }
        Ok(Some(command))
    }

    // Overlays

    pub fn add_overlay(&mut self, overlay: Overlay) -> Result<OverlayId, TimelineError> {
        let id = self.overlays.add(overlay)?;
        self.emit(TimelineEvent::OverlaysChanged);
        Ok(id)
    }

    pub fn remove_overlay(&mut self, id: OverlayId) -> Result<Overlay, TimelineError> {
        let removed = self.overlays.remove(id)?;
        self.emit(TimelineEvent::OverlaysChanged);
        Ok(removed)
    }

    pub fn set_overlay_timing(
        &mut self,
        id: OverlayId,
        start_time: Seconds,
        end_time: Seconds,
    ) -> Result<(), TimelineError> {
        self.overlays.set_timing(id, start_time, end_time)?;
        self.emit(TimelineEvent::OverlaysChanged);
        Ok(())
    }

    pub fn active_overlays(&self) -> Vec<&Overlay> {
        self.overlays.active_at(self.clock.current_time())
    }
}
