use crate::adapter::{ItemId, PieChartAdapter};
use crate::animation::{Easing, ValueAnimator};
use crate::colors::find_duplicate;
use crate::config::{Anchor, ChartConfig};
use crate::error::ChartError;
use crate::events::ChartEvent;
use crate::geometry::{
    ChartGeometry, FULL_TURN, Padding, Point, Rect, normalize_degrees, screen_angle,
    shortest_path,
};
use crate::gesture::TouchState;
use crate::raster::Raster;
use crate::render::{self, RenderStyle};
use crate::slice::{PieSlice, SlicePool};
use async_channel::Sender;
use palette::Srgb;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::Display as StrumDisplay;

/// Rotations shorter than this commit at once instead of animating.
const ALIGNED_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum ToggleOutcome {
    Hidden,
    Showing,
    /// Nothing is loaded yet; the toggle runs on the next committed index.
    Deferred,
}

/// View state remembered across an invalidation when ids are stable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedState {
    pub rotation: f64,
    pub current_index: usize,
}

#[derive(Debug, Clone)]
struct RotateAnimation {
    animator: ValueAnimator,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    snap: Duration,
    toggle: Duration,
    overshoot_tension: f64,
}

/// Everything the input side and the render thread share. Lives behind a
/// single mutex; no method blocks.
pub struct ChartState {
    adapter: Option<Arc<dyn PieChartAdapter>>,
    slices: Vec<PieSlice>,
    pool: SlicePool,
    loaded: bool,
    geometry: ChartGeometry,
    rotation: f64,
    snap_degree: f64,
    current_index: usize,
    scale: f64,
    hidden: bool,
    enabled: bool,
    needs_toggle: bool,
    needs_update: bool,
    pending_restore: Option<SavedState>,
    rotate_anim: Option<RotateAnimation>,
    scale_anim: Option<ValueAnimator>,
    hit_raster: Option<Raster>,
    style: RenderStyle,
    timing: Timing,
    events: Sender<ChartEvent>,
}

impl ChartState {
    pub fn new(config: &ChartConfig, events: Sender<ChartEvent>) -> Self {
        Self {
            adapter: None,
            slices: Vec::new(),
            pool: SlicePool::default(),
            loaded: false,
            geometry: ChartGeometry::new(config.chart_stroke),
            rotation: 0.0,
            snap_degree: config.anchor.degrees(),
            current_index: 0,
            scale: 1.0,
            hidden: false,
            enabled: true,
            needs_toggle: false,
            needs_update: false,
            pending_restore: None,
            rotate_anim: None,
            scale_anim: None,
            hit_raster: None,
            style: RenderStyle::from_config(config),
            timing: Timing {
                snap: config.snap_duration,
                toggle: config.toggle_duration,
                overshoot_tension: config.overshoot_tension,
            },
            events,
        }
    }

    pub fn emit(&self, event: ChartEvent) {
        if self.events.try_send(event).is_err() {
            log::debug!("Chart event dropped, no receiver");
        }
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Stores `degrees` normalized to `[0, 360)`. Any change makes the hit
    /// raster stale.
    pub fn set_rotation(&mut self, degrees: f64) {
        let degrees = normalize_degrees(degrees);
        if degrees != self.rotation {
            self.rotation = degrees;
            self.invalidate_raster();
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn set_scale(&mut self, scale: f64) {
        if scale != self.scale {
            self.scale = scale;
            self.invalidate_raster();
        }
    }

    /// Committed index, 0 until slices are loaded.
    pub fn current_index(&self) -> usize {
        if self.loaded { self.current_index } else { 0 }
    }

    pub fn snap_degree(&self) -> f64 {
        self.snap_degree
    }

    pub fn set_anchor(&mut self, anchor: Anchor, now: Instant) {
        self.snap_degree = anchor.degrees();
        self.snap_to_anchor(true, now);
    }

    pub fn adapter(&self) -> Option<&Arc<dyn PieChartAdapter>> {
        self.adapter.as_ref()
    }

    /// Swaps the data source and drops every loaded slice. A rotation still
    /// in flight is abandoned without committing.
    pub fn set_adapter(&mut self, adapter: Option<Arc<dyn PieChartAdapter>>) {
        if self.rotate_anim.take().is_some() {
            self.emit(ChartEvent::RotationStateChanged(TouchState::Resting));
        }
        self.needs_update = false;
        self.pending_restore = None;
        self.adapter = adapter;
        self.reset();
    }

    /// Unloads and recycles all slices.
    pub fn reset(&mut self) {
        self.loaded = false;
        let slices = std::mem::take(&mut self.slices);
        self.pool.recycle(slices);
        self.invalidate_raster();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn needs_load(&self) -> bool {
        !self.loaded && self.adapter.is_some() && self.geometry.is_laid_out()
    }

    /// Builds the slice list from the adapter with cumulative offsets from 0.
    /// The chart counts as loaded only after every slice is in place.
    pub fn load_slices(&mut self) {
        let Some(adapter) = self.adapter.clone() else {
            return;
        };

        let bounds = self.geometry.slice_bounds();
        let mut offset = 0.0;
        for index in 0..adapter.count() {
            let recycled = self.pool.take();
            let mut slice = adapter.slice(recycled, index, offset);
            slice.set_bounds(bounds);
            offset += slice.degrees();
            self.slices.push(slice);
        }

        let colors: Vec<Srgb<u8>> = self.slices.iter().map(PieSlice::color).collect();
        if let Some((first, second)) = find_duplicate(&colors) {
            log::warn!(
                "Slices {} and {} share a color, taps on them are ambiguous",
                first,
                second
            );
        }

        self.loaded = true;
        self.invalidate_raster();

        if let Some(saved) = self.pending_restore.take() {
            self.set_rotation(saved.rotation);
            if saved.current_index < self.slices.len() {
                self.current_index = saved.current_index;
            }
        }
    }

    pub fn slices(&self) -> &[PieSlice] {
        &self.slices
    }

    pub fn slice(&self, index: usize) -> Option<&PieSlice> {
        self.slices.get(index)
    }

    pub fn item_id(&self, index: usize) -> Option<ItemId> {
        let adapter = self.adapter.as_ref()?;
        (index < self.slices.len()).then(|| adapter.item_id(index))
    }

    pub fn geometry(&self) -> &ChartGeometry {
        &self.geometry
    }

    pub fn measure(&mut self, width: f64, height: f64, padding: Padding) -> f64 {
        let side = self.geometry.measure(width, height, padding);
        self.relayout_slices();
        side
    }

    pub fn layout(&mut self, frame: Rect) {
        self.geometry.layout(frame);
        self.relayout_slices();
    }

    fn relayout_slices(&mut self) {
        let bounds = self.geometry.slice_bounds();
        for slice in &mut self.slices {
            slice.set_bounds(bounds);
        }
        self.invalidate_raster();
    }

    pub fn hit_raster(&self) -> Option<&Raster> {
        self.hit_raster.as_ref()
    }

    pub fn invalidate_raster(&mut self) {
        self.hit_raster = None;
    }

    pub fn rebuild_raster(&mut self) -> Result<(), ChartError> {
        self.hit_raster = render::render_hit_raster(self)?;
        Ok(())
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        self.style = style;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Rotates the slice containing the anchor onto it, or the slice whose
    /// center is nearest the anchor when none contains it.
    pub fn snap_to_anchor(&mut self, animated: bool, now: Instant) -> bool {
        let index = self
            .slices
            .iter()
            .position(|s| s.contains_degree(self.rotation, self.snap_degree))
            .or_else(|| self.nearest_to_anchor());

        match index {
            Some(index) => self.rotate_to(index, animated, now),
            None => false,
        }
    }

    fn nearest_to_anchor(&self) -> Option<usize> {
        self.slices
            .iter()
            .enumerate()
            .map(|(index, slice)| {
                let gap = normalize_degrees(slice.center_degree() + self.rotation - self.snap_degree);
                (index, gap.min(FULL_TURN - gap))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Turns the chart so the center of slice `index` sits on the anchor,
    /// along the shorter arc. Returns `false` when disabled or out of range.
    pub fn rotate_to(&mut self, index: usize, animated: bool, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(slice) = self.slices.get(index) else {
            return false;
        };

        let target = normalize_degrees(self.snap_degree - slice.center_degree());
        let (start, end) = shortest_path(self.rotation, target);

        if animated && (end - start).abs() > ALIGNED_TOLERANCE {
            let animator = ValueAnimator::start(
                start,
                end,
                self.timing.snap,
                Easing::AccelerateDecelerate,
                now,
            );
            self.rotate_anim = Some(RotateAnimation { animator, index });
            self.emit(ChartEvent::RotationStateChanged(TouchState::Rotating));
        } else {
            self.rotate_anim = None;
            self.set_rotation(end);
            self.commit_index(index, now);
        }
        true
    }

    /// Aligns a freshly loaded chart. A toggle requested before load runs on
    /// the commit of that snap, or right away when no snap can start.
    pub fn settle_after_load(&mut self, now: Instant) {
        if !self.snap_to_anchor(true, now) {
            self.run_pending_toggle(now);
        }
    }

    fn run_pending_toggle(&mut self, now: Instant) {
        if std::mem::take(&mut self.needs_toggle) {
            self.toggle(now);
        }
    }

    fn commit_index(&mut self, index: usize, now: Instant) {
        let previous = self.current_index;
        self.current_index = index;

        self.run_pending_toggle(now);

        if index != previous && !self.hidden && self.loaded {
            self.emit(ChartEvent::SelectionChanged(index));
        }
    }

    /// Starts hiding or revealing the chart.
    pub fn toggle(&mut self, now: Instant) -> ToggleOutcome {
        if !self.loaded {
            self.needs_toggle = true;
            return ToggleOutcome::Deferred;
        }
        self.needs_toggle = false;

        let revealing = self.hidden;
        let (end, easing) = if revealing {
            let tension = self.timing.overshoot_tension;
            (1.0, Easing::Overshoot { tension })
        } else {
            (0.0, Easing::Linear)
        };

        self.hidden = !revealing;
        self.scale_anim = Some(ValueAnimator::start(
            self.scale,
            end,
            self.timing.toggle,
            easing,
            now,
        ));
        self.invalidate_raster();

        if revealing {
            ToggleOutcome::Showing
        } else {
            ToggleOutcome::Hidden
        }
    }

    pub fn is_animating(&self) -> bool {
        self.rotate_anim.is_some() || self.scale_anim.is_some()
    }

    pub fn is_rotating(&self) -> bool {
        self.rotate_anim.is_some()
    }

    /// Advances both animators to `now`. A finished rotation commits its
    /// index; a data change held back during animation is applied once both
    /// are idle.
    pub fn step_animations(&mut self, now: Instant) {
        if let Some(anim) = self.rotate_anim.as_mut() {
            let frame = anim.animator.step(now);
            let index = anim.index;
            self.set_rotation(frame.value);

            if frame.finished {
                self.rotate_anim = None;
                self.invalidate_raster();
                self.emit(ChartEvent::RotationStateChanged(TouchState::Resting));
                self.commit_index(index, now);
            }
        }

        if let Some(anim) = self.scale_anim.as_mut() {
            let frame = anim.step(now);
            self.set_scale(frame.value);

            if frame.finished {
                self.scale_anim = None;
                self.invalidate_raster();
            }
        }

        if self.needs_update && !self.is_animating() {
            self.needs_update = false;
            self.reset();
        }
    }

    /// Reacts to a data-set notification. `restore` is applied on the next
    /// load.
    pub fn on_data_changed(&mut self, restore: Option<SavedState>) {
        if restore.is_some() {
            self.pending_restore = restore;
        }
        if self.is_animating() {
            self.needs_update = true;
        } else {
            self.reset();
        }
    }

    pub fn save_state(&self) -> SavedState {
        SavedState {
            rotation: self.rotation,
            current_index: self.current_index(),
        }
    }

    /// Whether `point` lies on the disc. Always false while hidden or
    /// unloaded.
    pub fn in_circle(&self, point: Point) -> bool {
        !self.hidden && self.loaded && self.geometry.contains(point)
    }

    /// Index of the slice under `point`. Reads the hit raster; falls back to
    /// angular containment while the raster is stale.
    pub fn slice_index_at(&self, point: Point) -> Option<usize> {
        if !self.in_circle(point) {
            return None;
        }

        match &self.hit_raster {
            Some(raster) => {
                let key = render::key_of(raster.pixel(point.x as i32, point.y as i32)?)?;
                self.slices.iter().position(|s| s.color() == key)
            }
            None => {
                let degree = screen_angle(self.geometry.center, point);
                self.slices
                    .iter()
                    .position(|s| s.contains_degree(self.rotation, degree))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::WeightedAdapter;
    use async_channel::Receiver;

    fn laid_out(weights: &[f64]) -> (ChartState, Receiver<ChartEvent>) {
        let (tx, rx) = async_channel::unbounded();
        let mut state = ChartState::new(&ChartConfig::default(), tx);
        state.measure(400.0, 400.0, Padding::default());
        state.layout(Rect::new(0.0, 0.0, 400.0, 400.0));
        state.set_adapter(Some(Arc::new(WeightedAdapter::new(weights))));
        (state, rx)
    }

    fn drain(rx: &Receiver<ChartEvent>) -> Vec<ChartEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_load_assigns_cumulative_offsets() {
        let (mut state, _rx) = laid_out(&[0.1, 0.2, 0.3, 0.4]);
        assert!(state.needs_load());
        state.load_slices();

        assert!(state.is_loaded());
        let offsets: Vec<f64> = state.slices().iter().map(|s| s.offset()).collect();
        for (got, want) in offsets.iter().zip([0.0, 36.0, 108.0, 216.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        let span: f64 = state.slices().iter().map(|s| s.degrees()).sum();
        assert!((span - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_unlaid_chart_does_not_load() {
        let (tx, _rx) = async_channel::unbounded();
        let mut state = ChartState::new(&ChartConfig::default(), tx);
        state.set_adapter(Some(Arc::new(WeightedAdapter::new(&[1.0]))));
        assert!(!state.needs_load());
        assert_eq!(state.current_index(), 0);
    }

    #[test]
    fn test_immediate_rotation_commits_and_notifies() {
        let (mut state, rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        let now = Instant::now();

        assert!(state.rotate_to(2, false, now));
        // center 225 onto anchor 90
        assert!((state.rotation() - 225.0).abs() < 1e-9);
        assert_eq!(state.current_index(), 2);
        assert_eq!(drain(&rx), vec![ChartEvent::SelectionChanged(2)]);

        // same index again raises nothing
        state.rotate_to(2, false, now);
        assert!(drain(&rx).is_empty());
        assert!(!state.rotate_to(9, false, now));
    }

    #[test]
    fn test_animated_rotation_commits_on_completion() {
        let (mut state, rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        let now = Instant::now();

        state.rotate_to(1, true, now);
        assert_eq!(state.current_index(), 0);
        state.step_animations(now + Duration::from_millis(150));
        assert_eq!(state.current_index(), 0);

        state.step_animations(now + Duration::from_millis(300));
        assert!(!state.is_animating());
        assert_eq!(state.current_index(), 1);
        assert!((state.rotation() - 315.0).abs() < 1e-9);
        assert_eq!(
            drain(&rx),
            vec![
                ChartEvent::RotationStateChanged(TouchState::Rotating),
                ChartEvent::RotationStateChanged(TouchState::Resting),
                ChartEvent::SelectionChanged(1),
            ]
        );
    }

    #[test]
    fn test_disabled_chart_does_not_rotate() {
        let (mut state, _rx) = laid_out(&[0.5, 0.5]);
        state.load_slices();
        state.set_enabled(false);
        assert!(!state.rotate_to(1, false, Instant::now()));
        assert_eq!(state.rotation(), 0.0);
    }

    #[test]
    fn test_snap_picks_slice_under_anchor() {
        let (mut state, _rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        let now = Instant::now();

        // anchor 90 at rotation 100 lands in local 350, the last slice
        state.set_rotation(100.0);
        state.snap_to_anchor(false, now);
        assert_eq!(state.current_index(), 3);
        assert!((state.rotation() - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_deferred_toggle_runs_once_after_load() {
        let (mut state, _rx) = laid_out(&[0.5, 0.5]);
        let now = Instant::now();

        assert_eq!(state.toggle(now), ToggleOutcome::Deferred);
        assert!(!state.is_hidden());

        state.load_slices();
        state.snap_to_anchor(false, now);
        assert!(state.is_hidden());
        assert!(state.is_animating());

        state.step_animations(now + Duration::from_millis(400));
        assert_eq!(state.scale(), 0.0);

        // a later commit must not toggle again
        state.rotate_to(1, false, now);
        assert!(state.is_hidden());
        assert!(!state.is_animating());
    }

    #[test]
    fn test_deferred_toggle_runs_on_disabled_chart() {
        let (mut state, _rx) = laid_out(&[0.5, 0.5]);
        state.set_enabled(false);
        let now = Instant::now();

        assert_eq!(state.toggle(now), ToggleOutcome::Deferred);
        state.load_slices();
        state.settle_after_load(now);
        assert!(state.is_hidden());

        state.step_animations(now + Duration::from_millis(400));
        assert_eq!(state.scale(), 0.0);

        // runs once only
        state.set_enabled(true);
        assert!(state.rotate_to(1, false, now));
        assert!(state.is_hidden());
        assert!(!state.is_animating());
    }

    #[test]
    fn test_aligned_snap_commits_without_animation() {
        let (mut state, rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        state.set_rotation(45.0);

        assert!(state.snap_to_anchor(true, Instant::now()));
        assert!(!state.is_animating());
        assert_eq!(state.current_index(), 0);
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_toggle_reveals_with_overshoot() {
        let (mut state, _rx) = laid_out(&[1.0]);
        state.load_slices();
        let now = Instant::now();

        assert_eq!(state.toggle(now), ToggleOutcome::Hidden);
        state.step_animations(now + Duration::from_millis(400));
        assert_eq!(state.toggle(now), ToggleOutcome::Showing);

        let mid = now + Duration::from_millis(300);
        state.step_animations(mid);
        assert!(state.scale() > 1.0);
        state.step_animations(now + Duration::from_millis(400));
        assert_eq!(state.scale(), 1.0);
    }

    #[test]
    fn test_hidden_chart_has_no_hits() {
        let (mut state, _rx) = laid_out(&[0.5, 0.5]);
        state.load_slices();
        let center = Point::new(200.0, 200.0);
        assert!(state.in_circle(center));

        state.toggle(Instant::now());
        assert!(!state.in_circle(center));
        assert_eq!(state.slice_index_at(Point::new(200.0, 300.0)), None);
    }

    #[test]
    fn test_geometric_fallback_without_raster() {
        let (mut state, _rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        assert!(state.hit_raster().is_none());

        assert_eq!(state.slice_index_at(Point::new(300.0, 250.0)), Some(0));
        assert_eq!(state.slice_index_at(Point::new(100.0, 250.0)), Some(1));
        assert_eq!(state.slice_index_at(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn test_raster_lookup_matches_slice_colors() {
        let (mut state, _rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        state.set_rotation(45.0);
        state.rebuild_raster().unwrap();
        assert!(state.hit_raster().is_some());

        assert_eq!(state.slice_index_at(Point::new(200.0, 350.0)), Some(0));
        assert_eq!(state.slice_index_at(Point::new(50.0, 200.0)), Some(1));
        assert_eq!(state.slice_index_at(Point::new(200.0, 50.0)), Some(2));

        state.set_rotation(46.0);
        assert!(state.hit_raster().is_none());
    }

    #[test]
    fn test_data_change_waits_for_animation() {
        let (mut state, _rx) = laid_out(&[0.5, 0.5]);
        state.load_slices();
        let now = Instant::now();

        state.rotate_to(1, true, now);
        state.on_data_changed(None);
        assert!(state.is_loaded());

        state.step_animations(now + Duration::from_millis(300));
        assert!(!state.is_loaded());
        assert!(state.needs_load());
    }

    #[test]
    fn test_saved_state_is_restored_on_load() {
        let (mut state, _rx) = laid_out(&[0.25; 4]);
        state.load_slices();
        state.on_data_changed(Some(SavedState {
            rotation: 315.0,
            current_index: 1,
        }));
        assert!(!state.is_loaded());

        state.load_slices();
        assert_eq!(state.rotation(), 315.0);
        assert_eq!(state.current_index(), 1);

        // applied once only
        state.reset();
        state.set_rotation(0.0);
        state.load_slices();
        assert_eq!(state.rotation(), 0.0);
    }
}
