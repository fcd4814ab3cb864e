//! Engine configuration snapshot.
//!
//! A [`Config`] is immutable once handed to the engine; updates replace the
//! whole snapshot. The serialized form uses snake_case speed names so the
//! same values work in RON settings files and in persisted key/value stores.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Default delay before the first synthetic repeat.
pub const DEFAULT_THRESHOLD_MS: u64 = 200;
/// Default acceleration multiplier.
pub const DEFAULT_ACCEL_RATE: f64 = 1.0;

/// Upper bound on repeat speed, expressed as a minimum interval floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaxSpeed {
    /// 7 ms floor (~140 keys/sec).
    UltraFast,
    /// 8 ms floor (~125 keys/sec).
    VeryFast,
    /// 12 ms floor (~83 keys/sec).
    #[default]
    Fast,
    /// 20 ms floor (~50 keys/sec).
    Medium,
    /// 50 ms floor (~20 keys/sec).
    Slow,
}

impl MaxSpeed {
    /// Every speed, fastest first.
    pub const ALL: [Self; 5] = [
        Self::UltraFast,
        Self::VeryFast,
        Self::Fast,
        Self::Medium,
        Self::Slow,
    ];

    /// Minimum repeat interval in milliseconds for this speed.
    pub const fn floor_ms(self) -> u64 {
        match self {
            Self::UltraFast => 7,
            Self::VeryFast => 8,
            Self::Fast => 12,
            Self::Medium => 20,
            Self::Slow => 50,
        }
    }

    /// Settings name (`ultra_fast`, `very_fast`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::UltraFast => "ultra_fast",
            Self::VeryFast => "very_fast",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        }
    }

    /// Parse a settings name. Unknown or empty names fall back to [`MaxSpeed::Fast`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or_default()
    }
}

impl fmt::Display for MaxSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MaxSpeed {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for MaxSpeed {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<MaxSpeed> for String {
    fn from(s: MaxSpeed) -> Self {
        s.name().to_string()
    }
}

/// Inertia configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch. A disabled engine never starts and passes every event through.
    pub enabled: bool,
    /// Repeat speed cap.
    pub max_speed: MaxSpeed,
    /// Delay after the initial press before synthetic repeats begin.
    pub threshold_ms: u64,
    /// Multiplier applied to the acceleration curve. Must be positive.
    pub accel_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            max_speed: MaxSpeed::Fast,
            threshold_ms: DEFAULT_THRESHOLD_MS,
            accel_rate: DEFAULT_ACCEL_RATE,
        }
    }
}

/// A configuration value the acceleration model cannot give a meaningful answer for.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `accel_rate` is zero, negative or not finite.
    #[error("accel_rate must be a positive finite number, got {0}")]
    AccelRate(f64),
    /// `threshold_ms` is zero.
    #[error("threshold_ms must be greater than zero")]
    Threshold,
}

impl Config {
    /// An enabled configuration with default tuning.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Report every invalid field.
    ///
    /// The engine never calls this: degenerate values flow through the
    /// acceleration model unchanged. Hosts use it to reject bad settings.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errs = Vec::new();
        if !(self.accel_rate.is_finite() && self.accel_rate > 0.0) {
            errs.push(ConfigError::AccelRate(self.accel_rate));
        }
        if self.threshold_ms == 0 {
            errs.push(ConfigError::Threshold);
        }
        errs
    }
}
