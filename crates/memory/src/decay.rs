//! Time decay for retrieval scoring.

/// Weight of a memory that is `age_days` old: exponential decay with the
/// given half-life, floored at `min_weight`.
///
/// Negative ages (clock skew) count as brand new.
pub fn time_decay_weight(age_days: f64, half_life_days: f64, min_weight: f64) -> f64 {
    let age = age_days.max(0.0);
    0.5_f64.powf(age / half_life_days).max(min_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_memory_has_full_weight() {
        assert!((time_decay_weight(0.0, 7.0, 0.1) - 1.0).abs() < 1e-9);
        assert!((time_decay_weight(-3.0, 7.0, 0.1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn one_half_life_halves_the_weight() {
        assert!((time_decay_weight(7.0, 7.0, 0.1) - 0.5).abs() < 1e-9);
        assert!((time_decay_weight(14.0, 7.0, 0.1) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn weight_is_non_increasing_and_floored() {
        let mut previous = f64::MAX;
        for day in 0..365 {
            let w = time_decay_weight(day as f64, 7.0, 0.1);
            assert!(w <= previous);
            assert!(w >= 0.1);
            previous = w;
        }
        assert!((time_decay_weight(1000.0, 7.0, 0.1) - 0.1).abs() < 1e-9);
    }
}
