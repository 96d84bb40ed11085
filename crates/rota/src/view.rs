use crate::adapter::{self, DataSetEvent, DataSetSubscription, PieChartAdapter};
use crate::config::{Anchor, ChartConfig};
use crate::dynamics::{Dynamics, FrictionDynamics};
use crate::error::ChartError;
use crate::events::{ChartEvent, ItemClick};
use crate::geometry::{Padding, Point, Rect};
use crate::gesture::{GestureController, PointerAction, PointerEvent, TouchState};
use crate::raster::Raster;
use crate::render::{RenderLoop, RenderStyle, Shared};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::slice::PieSlice;
use crate::state::{ChartState, SavedState, ToggleOutcome};
use async_channel::Receiver;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    FlingStep,
}

struct AdapterObserver {
    adapter: Arc<dyn PieChartAdapter>,
    subscription: DataSetSubscription,
    /// Snapshot taken on invalidation, consumed by the next change.
    saved: Option<SavedState>,
}

impl AdapterObserver {
    fn new(adapter: Arc<dyn PieChartAdapter>) -> Self {
        let subscription = adapter.observable().subscribe();
        Self {
            adapter,
            subscription,
            saved: None,
        }
    }
}

impl Drop for AdapterObserver {
    fn drop(&mut self) {
        self.adapter
            .observable()
            .unsubscribe(self.subscription.id());
    }
}

#[derive(Default)]
struct Listeners {
    selection: Option<Box<dyn FnMut(usize)>>,
    item_click: Option<Box<dyn FnMut(&ItemClick)>>,
    rotation_state: Option<Box<dyn FnMut(TouchState)>>,
    ready: Option<Box<dyn FnMut()>>,
}

impl Listeners {
    fn dispatch(&mut self, event: &ChartEvent) {
        match event {
            ChartEvent::SelectionChanged(index) => {
                if let Some(listener) = self.selection.as_mut() {
                    listener(*index);
                }
            }
            ChartEvent::ItemClick(click) => {
                if let Some(listener) = self.item_click.as_mut() {
                    listener(click);
                }
            }
            ChartEvent::RotationStateChanged(state) => {
                if let Some(listener) = self.rotation_state.as_mut() {
                    listener(*state);
                }
            }
            ChartEvent::Ready => {
                if let Some(listener) = self.ready.as_mut() {
                    listener();
                }
            }
        }
    }
}

/// Rotating pie chart control.
///
/// Lives on the input thread. The host forwards pointer events to
/// [`ChartView::on_touch`], calls [`ChartView::pump`] regularly (at the
/// latest by [`ChartView::next_deadline`]) and paints
/// [`ChartView::surface`]. Drawing happens on a separate thread started by
/// [`ChartView::attach`], which starts out paused.
pub struct ChartView {
    shared: Arc<Shared>,
    render: Option<RenderLoop>,
    gesture: GestureController,
    dynamics: Option<Box<dyn Dynamics>>,
    scheduler: Scheduler<Deferred>,
    fling_task: Option<TaskHandle>,
    events: Receiver<ChartEvent>,
    data: Option<AdapterObserver>,
    listeners: Listeners,
    config: ChartConfig,
}

impl ChartView {
    pub fn new(config: ChartConfig) -> Result<Self, ChartError> {
        let dynamics = FrictionDynamics::new(config.friction)?;
        let (tx, rx) = async_channel::unbounded();
        let state = ChartState::new(&config, tx);

        Ok(Self {
            shared: Arc::new(Shared::new(state, config.frame_interval)),
            render: None,
            gesture: GestureController::new(config.touch_slop, config.pixel_density),
            dynamics: Some(Box::new(dynamics)),
            scheduler: Scheduler::new(),
            fling_task: None,
            events: rx,
            data: None,
            listeners: Listeners::default(),
            config,
        })
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Starts the render thread if it is not running.
    pub fn attach(&mut self) -> Result<(), ChartError> {
        if self.render.as_ref().is_some_and(RenderLoop::is_running) {
            return Ok(());
        }
        self.render = Some(RenderLoop::start(Arc::clone(&self.shared))?);
        Ok(())
    }

    /// Stops and joins the render thread.
    pub fn detach(&mut self) {
        if let Some(mut render) = self.render.take() {
            render.stop();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.render.is_some()
    }

    /// Installs a new data source. Weights that do not sum to 1.0 are
    /// rejected and the current data stays in place.
    pub fn set_adapter(&mut self, adapter: Arc<dyn PieChartAdapter>) -> Result<(), ChartError> {
        if let Err(e) = adapter::validate(adapter.as_ref()) {
            log::warn!("Rejecting adapter: {}", e);
            return Err(e);
        }

        self.data = Some(AdapterObserver::new(Arc::clone(&adapter)));
        self.shared.state.lock().set_adapter(Some(adapter));
        Ok(())
    }

    pub fn clear_adapter(&mut self) {
        self.data = None;
        self.shared.state.lock().set_adapter(None);
    }

    /// Replaces the motion model. The new model starts at the current
    /// rotation with the old model's velocity.
    pub fn set_dynamics(&mut self, mut dynamics: Box<dyn Dynamics>, now: Instant) {
        if let Some(previous) = &self.dynamics {
            let rotation = self.shared.state.lock().rotation();
            dynamics.set_state(rotation, previous.velocity(), now);
        }
        self.dynamics = Some(dynamics);
    }

    /// Removes the motion model; releases then always snap.
    pub fn clear_dynamics(&mut self) {
        self.cancel_fling();
        self.dynamics = None;
    }

    pub fn set_anchor(&mut self, anchor: Anchor, now: Instant) {
        self.config.anchor = anchor;
        self.shared.state.lock().set_anchor(anchor, now);
    }

    /// Animates slice `index` onto the anchor. Returns `false` when the index
    /// is out of range or the chart is disabled.
    pub fn set_selection(&mut self, index: usize, now: Instant) -> bool {
        self.shared.state.lock().rotate_to(index, true, now)
    }

    pub fn pause(&self) {
        if self.shared.gate.pause() {
            log::debug!("Chart rendering paused");
        }
    }

    pub fn resume(&self) {
        if self.shared.gate.resume() {
            log::debug!("Chart rendering resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.gate.is_paused()
    }

    pub fn toggle_chart(&mut self, now: Instant) -> ToggleOutcome {
        let outcome = self.shared.state.lock().toggle(now);
        log::debug!("Chart toggle: {}", outcome);
        outcome
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.shared.state.lock().set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.lock().is_enabled()
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        self.shared.state.lock().set_style(style);
    }

    pub fn current_index(&self) -> usize {
        self.shared.state.lock().current_index()
    }

    pub fn rotation(&self) -> f64 {
        self.shared.state.lock().rotation()
    }

    pub fn diameter(&self) -> f64 {
        self.shared.state.lock().geometry().diameter
    }

    pub fn radius(&self) -> f64 {
        self.shared.state.lock().geometry().radius()
    }

    pub fn center(&self) -> Point {
        self.shared.state.lock().geometry().center
    }

    /// Latest presented frame.
    pub fn surface(&self) -> Option<Raster> {
        self.shared.front()
    }

    pub fn frame_count(&self) -> u64 {
        self.shared.frame_count()
    }

    pub fn hit_raster(&self) -> Option<Raster> {
        self.shared.state.lock().hit_raster().cloned()
    }

    pub fn slice(&self, index: usize) -> Option<PieSlice> {
        self.shared.state.lock().slice(index).cloned()
    }

    pub fn slice_count(&self) -> usize {
        self.shared.state.lock().slices().len()
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.state.lock().is_loaded()
    }

    pub fn is_hidden(&self) -> bool {
        self.shared.state.lock().is_hidden()
    }

    pub fn touch_state(&self) -> TouchState {
        self.gesture.state()
    }

    pub fn is_flinging(&self) -> bool {
        self.fling_task
            .is_some_and(|handle| self.scheduler.is_pending(handle))
    }

    /// Returns the side of the square the chart needs within
    /// `width` x `height`.
    pub fn measure(&mut self, width: f64, height: f64, padding: Padding) -> f64 {
        self.shared.state.lock().measure(width, height, padding)
    }

    pub fn layout(&mut self, frame: Rect) {
        self.shared.state.lock().layout(frame);
    }

    /// Feeds one pointer event. Returns `false` when the event is not for the
    /// chart: outside the disc while at rest, or the chart is hidden or not
    /// loaded.
    pub fn on_touch(&mut self, event: PointerEvent) -> bool {
        let shared = Arc::clone(&self.shared);
        {
            let mut state = shared.state.lock();
            if self.gesture.state() == TouchState::Resting && !state.in_circle(event.position) {
                return false;
            }

            match event.action {
                PointerAction::Down => self.start_touch(&mut state, &event),
                PointerAction::Move => self.move_touch(&mut state, &event),
                PointerAction::Up => {
                    let velocity = match self.gesture.state() {
                        TouchState::Rotating => {
                            self.gesture.track(&event);
                            self.gesture.release_velocity()
                        }
                        _ => 0.0,
                    };
                    self.end_touch(&mut state, event.position, velocity, true, event.time);
                }
                PointerAction::Cancel => {
                    self.end_touch(&mut state, event.position, 0.0, false, event.time)
                }
            }
        }

        self.deliver_events();
        true
    }

    fn start_touch(&mut self, state: &mut ChartState, event: &PointerEvent) {
        self.cancel_fling();
        self.gesture.press(event, state.rotation());
        state.emit(ChartEvent::RotationStateChanged(TouchState::Pressed));
    }

    fn move_touch(&mut self, state: &mut ChartState, event: &PointerEvent) {
        let center = state.geometry().center;

        if self.gesture.state() == TouchState::Pressed
            && self
                .gesture
                .start_drag_if_needed(event.position, center, state.is_enabled())
        {
            state.emit(ChartEvent::RotationStateChanged(TouchState::Rotating));
        }

        if self.gesture.state() == TouchState::Rotating {
            self.gesture.track(event);
            let previous = state.rotation();
            state.set_rotation(self.gesture.drag_rotation(event.position, center));
            self.gesture.classify(previous, state.rotation());
        }
    }

    fn end_touch(
        &mut self,
        state: &mut ChartState,
        position: Point,
        velocity: f64,
        released: bool,
        now: Instant,
    ) {
        match self.gesture.release() {
            TouchState::Pressed if released => self.tap(state, position, now),
            TouchState::Pressed => {
                state.snap_to_anchor(true, now);
            }
            TouchState::Rotating => {
                if let Some(dynamics) = self.dynamics.as_mut()
                    && velocity.abs() > self.config.min_fling_velocity
                {
                    dynamics.set_state(state.rotation(), velocity, now);
                    self.fling_task = Some(self.scheduler.post(now, Deferred::FlingStep));
                } else {
                    state.snap_to_anchor(true, now);
                }
            }
            _ => {}
        }

        state.emit(ChartEvent::RotationStateChanged(TouchState::Resting));
    }

    fn tap(&mut self, state: &mut ChartState, position: Point, now: Instant) {
        let hit = if state.is_enabled() {
            state.slice_index_at(position)
        } else {
            None
        };
        let Some(index) = hit else {
            state.snap_to_anchor(true, now);
            return;
        };

        // a press that stopped a fling can land on the stale current index
        let second_tap = state.current_index() == index;
        if second_tap || !state.rotate_to(index, true, now) {
            state.snap_to_anchor(true, now);
        }

        if let (Some(slice), Some(id)) = (state.slice(index).cloned(), state.item_id(index)) {
            state.emit(ChartEvent::ItemClick(ItemClick {
                second_tap,
                slice,
                index,
                id,
            }));
        }
    }

    fn cancel_fling(&mut self) {
        if let Some(handle) = self.fling_task.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn step_fling(&mut self, now: Instant) {
        let Some(dynamics) = self.dynamics.as_mut() else {
            self.fling_task = None;
            return;
        };

        dynamics.update(now);

        let mut state = self.shared.state.lock();
        let previous = state.rotation();
        state.set_rotation(dynamics.position());
        self.gesture.classify(previous, state.rotation());

        if dynamics.is_at_rest(self.config.velocity_tolerance) {
            self.fling_task = None;
            state.snap_to_anchor(true, now);
        } else {
            self.fling_task = Some(self.scheduler.post_delayed(
                now,
                self.config.fling_step,
                Deferred::FlingStep,
            ));
        }
    }

    /// Runs input-thread housekeeping: data-set notifications, due fling
    /// steps, and delivery of queued events to listeners.
    pub fn pump(&mut self, now: Instant) {
        self.drain_data_events();

        while let Some((_, task)) = self.scheduler.pop_due(now) {
            match task {
                Deferred::FlingStep => self.step_fling(now),
            }
        }

        self.deliver_events();
    }

    /// When `pump` next has scheduled work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    fn drain_data_events(&mut self) {
        let Some(observer) = self.data.as_mut() else {
            return;
        };

        let pending: Vec<DataSetEvent> =
            std::iter::from_fn(|| observer.subscription.try_recv().ok()).collect();
        if pending.is_empty() {
            return;
        }

        let stable = observer.adapter.has_stable_ids();
        let mut state = self.shared.state.lock();
        for event in pending {
            log::debug!("Data set {:?}", event);
            match event {
                DataSetEvent::Changed => {
                    let restore = if stable { observer.saved.take() } else { None };
                    state.on_data_changed(restore);
                }
                DataSetEvent::Invalidated => {
                    if stable {
                        observer.saved = Some(state.save_state());
                    }
                    state.on_data_changed(None);
                }
            }
        }
    }

    fn deliver_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.listeners.dispatch(&event);
        }
    }

    pub fn set_on_selection_changed(&mut self, listener: impl FnMut(usize) + 'static) {
        self.listeners.selection = Some(Box::new(listener));
    }

    pub fn set_on_item_click(&mut self, listener: impl FnMut(&ItemClick) + 'static) {
        self.listeners.item_click = Some(Box::new(listener));
    }

    pub fn set_on_rotation_state_change(&mut self, listener: impl FnMut(TouchState) + 'static) {
        self.listeners.rotation_state = Some(Box::new(listener));
    }

    pub fn set_on_ready(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.ready = Some(Box::new(listener));
    }
}

impl Drop for ChartView {
    fn drop(&mut self) {
        self.data = None;
        self.detach();
    }
}
