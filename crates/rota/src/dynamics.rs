use crate::error::ChartError;
use std::time::Instant;

/// A one-dimensional motion model advanced by wall-clock time.
pub trait Dynamics {
    fn set_state(&mut self, position: f64, velocity: f64, now: Instant);

    /// Advances the model to `now`.
    fn update(&mut self, now: Instant);

    fn position(&self) -> f64;

    fn velocity(&self) -> f64;

    fn is_at_rest(&self, tolerance: f64) -> bool {
        self.velocity().abs() <= tolerance
    }
}

/// Position in degrees, velocity in degrees per second. Velocity is scaled by
/// the friction factor once per `update` call, so the decay rate depends on
/// how often the model is stepped.
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionDynamics {
    friction: f64,
    position: f64,
    velocity: f64,
    last_update: Option<Instant>,
}

impl FrictionDynamics {
    pub fn new(friction: f64) -> Result<Self, ChartError> {
        if !(friction > 0.0 && friction <= 1.0) {
            return Err(ChartError::Friction(friction));
        }
        Ok(Self {
            friction,
            position: 0.0,
            velocity: 0.0,
            last_update: None,
        })
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }
}

impl Dynamics for FrictionDynamics {
    fn set_state(&mut self, position: f64, velocity: f64, now: Instant) {
        self.position = position;
        self.velocity = velocity;
        self.last_update = Some(now);
    }

    fn update(&mut self, now: Instant) {
        let dt_ms = self
            .last_update
            .map(|last| now.saturating_duration_since(last).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        self.last_update = Some(now);

        self.position += self.velocity * dt_ms / 1000.0;
        self.velocity *= self.friction;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn velocity(&self) -> f64 {
        self.velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_out_of_range_friction() {
        assert!(FrictionDynamics::new(0.0).is_err());
        assert!(FrictionDynamics::new(1.5).is_err());
        assert!(FrictionDynamics::new(f64::NAN).is_err());
        assert!(FrictionDynamics::new(1.0).is_ok());
    }

    #[test]
    fn test_integrates_elapsed_time() {
        let t0 = Instant::now();
        let mut dynamics = FrictionDynamics::new(0.5).unwrap();
        dynamics.set_state(10.0, 100.0, t0);

        dynamics.update(t0 + Duration::from_millis(500));
        assert!((dynamics.position() - 60.0).abs() < 1e-9);
        assert!((dynamics.velocity() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_decays_to_rest() {
        let t0 = Instant::now();
        let mut dynamics = FrictionDynamics::new(0.98).unwrap();
        dynamics.set_state(0.0, -1500.0, t0);

        let mut previous = dynamics.velocity().abs();
        let mut steps = 0;
        while !dynamics.is_at_rest(40.0) {
            steps += 1;
            dynamics.update(t0 + Duration::from_millis(8 * steps));
            let current = dynamics.velocity().abs();
            assert!(current < previous);
            previous = current;
            assert!(steps < 10_000, "never came to rest");
        }
        assert!(dynamics.position() < 0.0);
    }

    #[test]
    fn test_decay_is_per_call() {
        let t0 = Instant::now();
        let mut dynamics = FrictionDynamics::new(0.9).unwrap();
        dynamics.set_state(0.0, 100.0, t0);

        dynamics.update(t0);
        dynamics.update(t0);
        assert!((dynamics.velocity() - 81.0).abs() < 1e-9);
        assert_eq!(dynamics.position(), 0.0);
    }
}
