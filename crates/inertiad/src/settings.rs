//! Persisted settings: a RON file mapped onto the engine [`Config`].
//!
//! Parsing is lenient. Missing fields take their defaults, a non-positive
//! threshold or acceleration rate falls back to the default with a warning,
//! and an unknown speed name means `fast`.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use inertia_engine::{Config, DEFAULT_ACCEL_RATE, DEFAULT_THRESHOLD_MS, MaxSpeed};
use ron::ser::PrettyConfig;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Settings file path relative to `$HOME`.
const DEFAULT_RELATIVE_PATH: &str = ".config/inertia/settings.ron";

/// On-disk shape, wide enough to hold values the engine would reject.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSettings {
    /// Whether repeats are active.
    enabled: bool,
    /// Speed cap name.
    max_speed: String,
    /// Delay before the first repeat, in milliseconds.
    threshold_ms: i64,
    /// Acceleration multiplier.
    accel_rate: f64,
}

impl Default for RawSettings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            enabled: config.enabled,
            max_speed: config.max_speed.name().to_string(),
            threshold_ms: config.threshold_ms as i64,
            accel_rate: config.accel_rate,
        }
    }
}

impl RawSettings {
    /// Resolve into an engine config, applying fallbacks.
    fn into_config(self) -> Config {
        let threshold_ms = if self.threshold_ms > 0 {
            self.threshold_ms as u64
        } else {
            warn!(
                threshold_ms = self.threshold_ms,
                "settings_threshold_invalid_using_default"
            );
            DEFAULT_THRESHOLD_MS
        };
        let accel_rate = if self.accel_rate > 0.0 && self.accel_rate.is_finite() {
            self.accel_rate
        } else {
            warn!(
                accel_rate = self.accel_rate,
                "settings_accel_rate_invalid_using_default"
            );
            DEFAULT_ACCEL_RATE
        };
        Config {
            enabled: self.enabled,
            max_speed: MaxSpeed::from_name(&self.max_speed),
            threshold_ms,
            accel_rate,
        }
    }
}

/// Default settings location, `~/.config/inertia/settings.ron`.
pub fn default_path() -> Result<PathBuf> {
    let home = env::var_os("HOME").ok_or(Error::NoHome)?;
    Ok(PathBuf::from(home).join(DEFAULT_RELATIVE_PATH))
}

/// Resolve an optional `--config` override against the default location.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => default_path(),
    }
}

/// Parse settings text.
pub fn parse(text: &str, path: &Path) -> Result<Config> {
    let raw: RawSettings = ron::from_str(text).map_err(|source| Error::SettingsParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw.into_config())
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load(path: &Path) -> Result<Config> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let config = parse(&text, path)?;
            debug!(path = %path.display(), ?config, "settings_loaded");
            Ok(config)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings_missing_using_defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Render a config as pretty RON.
pub fn render(config: &Config) -> Result<String> {
    Ok(ron::ser::to_string_pretty(config, PrettyConfig::default())?)
}

/// Write `config` to `path`, creating parent directories.
pub fn write(path: &Path, config: &Config, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::SettingsExist(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(config)?)?;
    Ok(())
}
