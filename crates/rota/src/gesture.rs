use crate::geometry::{Point, pointer_angle};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use strum::Display as StrumDisplay;

const HISTORY_SIZE: usize = 20;

/// Only samples this recent contribute to the release velocity.
const HORIZON: Duration = Duration::from_millis(100);

/// A gap this long between samples means the pointer had stopped.
const ASSUME_STOPPED: Duration = Duration::from_millis(40);

/// Jumps larger than this between two rotations are a wrap across 0/360.
const WRAP_THRESHOLD: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum TouchState {
    Resting,
    /// Pointer is down but has not moved past the slop; release is a tap.
    Pressed,
    Rotating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub position: Point,
    pub time: Instant,
}

impl PointerEvent {
    pub fn new(action: PointerAction, position: Point, time: Instant) -> Self {
        Self {
            action,
            position,
            time,
        }
    }
}

/// Two-axis pointer velocity over the most recent samples.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    samples: VecDeque<(Instant, Point)>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, time: Instant, position: Point) {
        if self.samples.len() == HISTORY_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back((time, position));
    }

    /// Pixels per second on each axis. Zero without at least two samples
    /// inside the horizon.
    pub fn velocity(&self) -> (f64, f64) {
        let Some(&(newest_time, newest)) = self.samples.back() else {
            return (0.0, 0.0);
        };

        let (mut oldest_time, mut oldest) = (newest_time, newest);
        for &(time, position) in self.samples.iter().rev().skip(1) {
            if newest_time.saturating_duration_since(time) > HORIZON
                || oldest_time.saturating_duration_since(time) > ASSUME_STOPPED
            {
                break;
            }
            (oldest_time, oldest) = (time, position);
        }

        let dt = newest_time
            .saturating_duration_since(oldest_time)
            .as_secs_f64();
        if dt <= 0.0 {
            return (0.0, 0.0);
        }
        ((newest.x - oldest.x) / dt, (newest.y - oldest.y) / dt)
    }
}

/// Touch state machine: tracks press, drag and release, and turns pointer
/// motion into chart rotation.
#[derive(Debug, Clone)]
pub struct GestureController {
    state: TouchState,
    touch_slop: f64,
    pixel_density: f64,
    start: Point,
    press_rotation: f64,
    drag_start_angle: f64,
    clockwise: bool,
    tracker: Option<VelocityTracker>,
}

impl GestureController {
    pub fn new(touch_slop: f64, pixel_density: f64) -> Self {
        Self {
            state: TouchState::Resting,
            touch_slop,
            pixel_density: if pixel_density > 0.0 {
                pixel_density
            } else {
                1.0
            },
            start: Point::default(),
            press_rotation: 0.0,
            drag_start_angle: 0.0,
            clockwise: false,
            tracker: None,
        }
    }

    pub fn state(&self) -> TouchState {
        self.state
    }

    pub fn is_clockwise(&self) -> bool {
        self.clockwise
    }

    pub fn press(&mut self, event: &PointerEvent, rotation: f64) {
        self.start = event.position;
        self.press_rotation = rotation;

        let mut tracker = VelocityTracker::new();
        tracker.add(event.time, event.position);
        self.tracker = Some(tracker);

        self.state = TouchState::Pressed;
    }

    /// Moves from `Pressed` to `Rotating` once the pointer leaves the slop
    /// box. Returns `true` on that transition.
    pub fn start_drag_if_needed(&mut self, position: Point, center: Point, enabled: bool) -> bool {
        if self.state != TouchState::Pressed || !enabled {
            return false;
        }

        let slop = self.touch_slop;
        let escaped = position.x < self.start.x - slop
            || position.x > self.start.x + slop
            || position.y < self.start.y - slop
            || position.y > self.start.y + slop;

        if escaped {
            self.state = TouchState::Rotating;
            self.drag_start_angle = pointer_angle(center, position);
        }
        escaped
    }

    pub fn track(&mut self, event: &PointerEvent) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.add(event.time, event.position);
        }
    }

    /// Rotation for the pointer at `position`, measured from the rotation at
    /// press time so the chart never jumps under the finger.
    pub fn drag_rotation(&self, position: Point, center: Point) -> f64 {
        self.press_rotation + pointer_angle(center, position) - self.drag_start_angle
    }

    /// Updates the direction from two successive normalized rotations.
    pub fn classify(&mut self, previous: f64, current: f64) {
        let change = current - previous;
        self.clockwise = (change > 0.0 && change.abs() < WRAP_THRESHOLD)
            || (change.abs() > WRAP_THRESHOLD && self.clockwise);
    }

    /// Signed release speed in degrees per second, positive when clockwise.
    pub fn release_velocity(&self) -> f64 {
        let (vx, vy) = self
            .tracker
            .as_ref()
            .map(VelocityTracker::velocity)
            .unwrap_or_default();
        let (vx, vy) = (vx / self.pixel_density, vy / self.pixel_density);
        let direction = if self.clockwise { 1.0 } else { -1.0 };
        vx.hypot(vy) * direction / 2.0
    }

    /// Returns to `Resting`, yielding the state the gesture ended in.
    pub fn release(&mut self) -> TouchState {
        self.tracker = None;
        std::mem::replace(&mut self.state, TouchState::Resting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t0: Instant, ms: u64, action: PointerAction, x: f64, y: f64) -> PointerEvent {
        PointerEvent::new(action, Point::new(x, y), t0 + Duration::from_millis(ms))
    }

    #[test]
    fn test_velocity_over_recent_samples() {
        let t0 = Instant::now();
        let mut tracker = VelocityTracker::new();
        for (ms, y) in [(0, 0.0), (10, 10.0), (20, 20.0), (30, 30.0)] {
            tracker.add(t0 + Duration::from_millis(ms), Point::new(0.0, y));
        }
        let (vx, vy) = tracker.velocity();
        assert_eq!(vx, 0.0);
        assert!((vy - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_velocity_is_zero_after_a_pause() {
        let t0 = Instant::now();
        let mut tracker = VelocityTracker::new();
        tracker.add(t0, Point::new(0.0, 0.0));
        tracker.add(t0 + Duration::from_millis(60), Point::new(0.0, 50.0));
        assert_eq!(tracker.velocity(), (0.0, 0.0));
    }

    #[test]
    fn test_slop_gates_the_drag() {
        let t0 = Instant::now();
        let center = Point::new(100.0, 100.0);
        let mut gesture = GestureController::new(8.0, 1.0);

        gesture.press(&at(t0, 0, PointerAction::Down, 150.0, 100.0), 30.0);
        assert_eq!(gesture.state(), TouchState::Pressed);

        assert!(!gesture.start_drag_if_needed(Point::new(155.0, 105.0), center, true));
        assert!(!gesture.start_drag_if_needed(Point::new(150.0, 120.0), center, false));
        assert_eq!(gesture.state(), TouchState::Pressed);

        assert!(gesture.start_drag_if_needed(Point::new(150.0, 110.0), center, true));
        assert_eq!(gesture.state(), TouchState::Rotating);
        assert!((gesture.drag_rotation(Point::new(150.0, 110.0), center) - 30.0).abs() < 1e-9);

        assert_eq!(gesture.release(), TouchState::Rotating);
        assert_eq!(gesture.state(), TouchState::Resting);
    }

    #[test]
    fn test_direction_classification() {
        let mut gesture = GestureController::new(8.0, 1.0);

        gesture.classify(10.0, 20.0);
        assert!(gesture.is_clockwise());

        // wrap from 359 to 1 keeps the previous direction
        gesture.classify(1.0, 359.0);
        assert!(gesture.is_clockwise());

        gesture.classify(20.0, 10.0);
        assert!(!gesture.is_clockwise());

        gesture.classify(359.0, 1.0);
        assert!(!gesture.is_clockwise());

        gesture.classify(10.0, 10.0);
        assert!(!gesture.is_clockwise());
    }

    #[test]
    fn test_release_velocity_sign_and_scale() {
        let t0 = Instant::now();
        let mut gesture = GestureController::new(8.0, 2.0);
        gesture.press(&at(t0, 0, PointerAction::Down, 0.0, 0.0), 0.0);
        gesture.track(&at(t0, 10, PointerAction::Move, 30.0, 40.0));

        // 50 px in 10 ms, halved by density and by the drag factor
        gesture.classify(0.0, 5.0);
        assert!((gesture.release_velocity() - 1250.0).abs() < 1e-6);

        gesture.classify(5.0, 0.0);
        assert!((gesture.release_velocity() + 1250.0).abs() < 1e-6);
    }
}
