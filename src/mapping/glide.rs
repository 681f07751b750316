//! Glide (per-tick slew) limiting
//!
//! Moves a control value toward its target by at most a fixed step each
//! tick so downstream consumers never see a discontinuous jump.

/// Move `origin` toward `destination` by at most `max_step`.
///
/// Snaps to `destination` when it is within reach, so the value lands on
/// the target exactly and never overshoots. A `max_step` of zero freezes
/// the value.
pub fn step(origin: f64, destination: f64, max_step: f64) -> f64 {
    let distance = (destination - origin).abs();

    if distance <= max_step {
        return destination;
    }

    let sign = if destination > origin { 1.0 } else { -1.0 };
    origin + sign * max_step
}

/// Glide limiter with a fixed maximum step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlideLimiter {
    max_step: f64,
}

impl GlideLimiter {
    pub fn new(max_step: f64) -> Self {
        Self { max_step }
    }

    pub fn max_step(&self) -> f64 {
        self.max_step
    }

    pub fn step(&self, origin: f64, destination: f64) -> f64 {
        step(origin, destination, self.max_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_converges_without_overshoot() {
        let mut value = 0.0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            value = step(value, 10.0, 3.0);
            seen.push(value);
        }
        assert_eq!(seen, vec![3.0, 6.0, 9.0, 10.0]);

        // Stays put once arrived
        assert_eq!(step(value, 10.0, 3.0), 10.0);
    }

    #[test]
    fn test_step_downward() {
        assert_eq!(step(10.0, 0.0, 4.0), 6.0);
        assert_eq!(step(6.0, 0.0, 4.0), 2.0);
        assert_eq!(step(2.0, 0.0, 4.0), 0.0);
    }

    #[test]
    fn test_step_same_point() {
        for max_step in [0.0, 0.5, 127.0] {
            assert_eq!(step(42.0, 42.0, max_step), 42.0);
        }
    }

    #[test]
    fn test_step_frozen() {
        let mut value = 0.0;
        for _ in 0..100 {
            value = step(value, 1.0, 0.0);
        }
        assert_eq!(value, 0.0);
        assert_eq!(GlideLimiter::new(0.0).step(5.0, 100.0), 5.0);
    }

    #[test]
    fn test_limiter_monotonic() {
        let limiter = GlideLimiter::new(7.5);
        let mut value = 100.0;
        let mut previous_distance = (value - 20.0f64).abs();

        while value != 20.0 {
            let next = limiter.step(value, 20.0);
            assert!((value - next).abs() <= 7.5);
            let distance = (next - 20.0f64).abs();
            assert!(distance < previous_distance);
            previous_distance = distance;
            value = next;
        }
    }
}
