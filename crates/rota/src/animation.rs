use std::f64::consts::PI;
use std::time::{Duration, Instant};

pub const DEFAULT_OVERSHOOT_TENSION: f64 = 2.0;

/// Maps linear progress in `[0, 1]` onto an eased progress value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    AccelerateDecelerate,
    /// Runs past the end value and settles back onto it.
    Overshoot { tension: f64 },
}

impl Easing {
    pub fn interpolate(self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::AccelerateDecelerate => ((t + 1.0) * PI).cos() / 2.0 + 0.5,
            Self::Overshoot { tension } => {
                let t = t - 1.0;
                t * t * ((tension + 1.0) * t + tension) + 1.0
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub value: f64,
    pub finished: bool,
}

/// Interpolates a value between two endpoints over a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueAnimator {
    from: f64,
    to: f64,
    duration: Duration,
    easing: Easing,
    started: Instant,
    running: bool,
}

impl ValueAnimator {
    pub fn start(from: f64, to: f64, duration: Duration, easing: Easing, now: Instant) -> Self {
        Self {
            from,
            to,
            duration,
            easing,
            started: now,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn value_at(&self, now: Instant) -> f64 {
        let progress = self.progress(now);
        if progress >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * self.easing.interpolate(progress)
    }

    /// Samples the animator and stops it once the duration has elapsed. The
    /// final frame carries exactly the end value.
    pub fn step(&mut self, now: Instant) -> AnimationFrame {
        let value = self.value_at(now);
        let finished = self.progress(now) >= 1.0;
        if finished {
            self.running = false;
        }
        AnimationFrame { value, finished }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easings_hit_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::AccelerateDecelerate,
            Easing::Overshoot {
                tension: DEFAULT_OVERSHOOT_TENSION,
            },
        ] {
            assert!(easing.interpolate(0.0).abs() < 1e-9, "{easing:?}");
            assert!((easing.interpolate(1.0) - 1.0).abs() < 1e-9, "{easing:?}");
        }
    }

    #[test]
    fn test_overshoot_passes_the_end() {
        let easing = Easing::Overshoot {
            tension: DEFAULT_OVERSHOOT_TENSION,
        };
        let peak = (1..100)
            .map(|i| easing.interpolate(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_step_finishes_on_target() {
        let t0 = Instant::now();
        let mut animator = ValueAnimator::start(
            10.0,
            50.0,
            Duration::from_millis(300),
            Easing::AccelerateDecelerate,
            t0,
        );

        let mid = animator.step(t0 + Duration::from_millis(150));
        assert!(!mid.finished);
        assert!((mid.value - 30.0).abs() < 1e-9);
        assert!(animator.is_running());

        let end = animator.step(t0 + Duration::from_millis(301));
        assert!(end.finished);
        assert_eq!(end.value, 50.0);
        assert!(!animator.is_running());
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let t0 = Instant::now();
        let mut animator = ValueAnimator::start(0.0, 1.0, Duration::ZERO, Easing::Linear, t0);
        let frame = animator.step(t0);
        assert!(frame.finished);
        assert_eq!(frame.value, 1.0);
    }
}
