//! Shared clamping helpers

/// Values closer than this are treated as unchanged by the dispatcher.
pub const CHANGE_EPSILON: f64 = 1e-9;

/// Bound `value` to `[start, finish]`.
///
/// Unlike `f64::clamp` this never panics when `start > finish`; the lower
/// bound wins, matching a plain "below start / above finish" check.
pub fn bound_to(start: f64, finish: f64, value: f64) -> f64 {
    if value < start {
        start
    } else if value > finish {
        finish
    } else {
        value
    }
}

/// Bound `value` to the closed interval spanned by `a` and `b`, in either order.
pub fn bound_between(a: f64, b: f64, value: f64) -> f64 {
    bound_to(a.min(b), a.max(b), value)
}

/// True when `a` and `b` differ by no more than [`CHANGE_EPSILON`].
pub fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= CHANGE_EPSILON
}
