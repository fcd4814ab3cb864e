//! The `curve` subcommand: print the repeat schedule for a config.

use inertia_engine::{Config, accel};

/// Render one line per repeat: hold count, step, interval and rate.
pub fn render(config: &Config, count: u32) -> String {
    let mut out = format!(
        "max_speed={} accel_rate={} threshold_ms={}\n",
        config.max_speed, config.accel_rate, config.threshold_ms
    );
    out.push_str(&format!(
        "{:>6} {:>5} {:>12} {:>9}\n",
        "repeat", "step", "interval_ms", "keys/sec"
    ));
    for hold_count in 1..=count {
        let interval = accel::interval_ms(hold_count, config);
        let rate = if interval == 0 || interval == u64::MAX {
            0.0
        } else {
            1000.0 / interval as f64
        };
        out.push_str(&format!(
            "{:>6} {:>5} {:>12} {:>9.1}\n",
            hold_count,
            accel::step(hold_count),
            interval,
            rate
        ));
    }
    out
}
