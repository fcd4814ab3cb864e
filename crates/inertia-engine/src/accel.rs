//! Acceleration curve: hold count to next repeat interval.
//!
//! The curve has nine discrete steps selected by how many synthetic repeats
//! have been emitted in the current hold. Each step divides the base
//! interval further; the configured [`MaxSpeed`](crate::MaxSpeed) floor caps
//! the result. Everything here is pure and lock-free.

use std::time::Duration;

use crate::Config;

/// Hold counts at which the curve moves to the next step.
pub const ACCELERATION_TABLE: [u32; 8] = [7, 12, 17, 21, 24, 26, 28, 30];

/// Highest step, reached once the hold count passes the last threshold.
pub const MAX_STEP: u32 = ACCELERATION_TABLE.len() as u32 + 1;

/// Interval at step one with `accel_rate == 1.0` (roughly the macOS default repeat).
pub const BASE_REPEAT_INTERVAL_MS: f64 = 35.0;

/// 1-based acceleration step for `hold_count`, in `1..=MAX_STEP`.
pub fn step(hold_count: u32) -> u32 {
    ACCELERATION_TABLE
        .iter()
        .position(|&threshold| threshold > hold_count)
        .map_or(MAX_STEP, |idx| idx as u32 + 1)
}

/// Interval in milliseconds before the next synthetic repeat.
///
/// `base / (step * accel_rate)`, clamped below by the speed floor and
/// truncated to whole milliseconds. A non-positive `accel_rate` is not
/// corrected: zero yields an effectively infinite interval and a negative
/// rate collapses to the floor.
pub fn interval_ms(hold_count: u32, config: &Config) -> u64 {
    let raw = BASE_REPEAT_INTERVAL_MS / (f64::from(step(hold_count)) * config.accel_rate);
    let floor = config.max_speed.floor_ms() as f64;
    let clamped = if raw < floor { floor } else { raw };
    // Float to int casts saturate, so an infinite interval becomes u64::MAX.
    clamped as u64
}

/// [`interval_ms`] as a [`Duration`].
pub fn next_interval(hold_count: u32, config: &Config) -> Duration {
    Duration::from_millis(interval_ms(hold_count, config))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::MaxSpeed;

    fn cfg(max_speed: MaxSpeed, accel_rate: f64) -> Config {
        Config {
            enabled: true,
            max_speed,
            threshold_ms: 200,
            accel_rate,
        }
    }

    #[test]
    fn step_boundaries() {
        let cases = [
            (0, 1),
            (1, 1),
            (6, 1),
            (7, 2),
            (8, 2),
            (11, 2),
            (12, 3),
            (17, 4),
            (21, 5),
            (24, 6),
            (26, 7),
            (28, 8),
            (30, 9),
            (31, 9),
            (1000, 9),
        ];
        for (count, want) in cases {
            assert_eq!(step(count), want, "hold_count={count}");
        }
    }

    #[test]
    fn table_is_strictly_ascending() {
        assert_eq!(ACCELERATION_TABLE.len(), 8);
        assert!(ACCELERATION_TABLE.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn intervals_for_known_configs() {
        let cases = [
            (0, MaxSpeed::Fast, 1.0, 35),
            (0, MaxSpeed::Fast, 2.0, 17),
            (7, MaxSpeed::Fast, 1.0, 17),
            (10, MaxSpeed::Fast, 2.0, 12),
            (100, MaxSpeed::UltraFast, 1.0, 7),
            (100, MaxSpeed::VeryFast, 1.0, 8),
            (100, MaxSpeed::Fast, 1.0, 12),
            (100, MaxSpeed::Medium, 1.0, 20),
            (100, MaxSpeed::Slow, 1.0, 50),
            (21, MaxSpeed::UltraFast, 3.0, 7),
            (0, MaxSpeed::Fast, 0.5, 70),
        ];
        for (count, speed, rate, want) in cases {
            assert_eq!(
                next_interval(count, &cfg(speed, rate)),
                Duration::from_millis(want),
                "hold_count={count} speed={speed} rate={rate}"
            );
        }
    }

    #[test]
    fn unknown_speed_name_matches_fast() {
        let unknown = cfg(MaxSpeed::from_name("unknown"), 1.0);
        let fast = cfg(MaxSpeed::Fast, 1.0);
        for count in [0, 7, 100] {
            assert_eq!(next_interval(count, &unknown), next_interval(count, &fast));
        }
    }

    #[test]
    fn zero_accel_rate_is_unbounded_not_a_panic() {
        assert_eq!(interval_ms(0, &cfg(MaxSpeed::Fast, 0.0)), u64::MAX);
        assert_eq!(interval_ms(0, &cfg(MaxSpeed::Fast, -1.0)), 12);
    }

    proptest! {
        #[test]
        fn step_is_bounded_and_monotone(a in 0u32..10_000, b in 0u32..10_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!((1..=MAX_STEP).contains(&step(lo)));
            prop_assert!(step(lo) <= step(hi));
        }

        #[test]
        fn interval_never_increases_and_respects_floor(
            a in 0u32..500,
            b in 0u32..500,
            speed in 0usize..MaxSpeed::ALL.len(),
            rate in 0.05f64..10.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let c = cfg(MaxSpeed::ALL[speed], rate);
            prop_assert!(next_interval(hi, &c) <= next_interval(lo, &c));
            prop_assert!(interval_ms(lo, &c) >= c.max_speed.floor_ms());
        }
    }
}
