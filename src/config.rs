//! Settings for the CLI front-end, read from a TOML file and the environment.
//!
//! Lookup order for the file: explicit path, then `DAYTODAY_CONFIG`, then
//! `daytoday/daytoday.toml` under the platform config directory. A missing
//! default file means defaults; a missing explicit file is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::anchor::AnchorError;
use crate::render::PercentStyle;
use crate::store::JsonFileStore;
use crate::{ANCHOR_HOUR, ANCHOR_MINUTE, BusinessHourAnchor, LIVE_TICK_MS, ProgressCalculator, TimeBasis};

const CONFIG_FILE: &str = "daytoday.toml";
const CONFIG_ENV_VAR: &str = "DAYTODAY_CONFIG";
const STORE_ENV_VAR: &str = "DAYTODAY_STORE";
const TICK_ENV_VAR: &str = "DAYTODAY_TICK_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error(transparent)]
    Anchor(#[from] AnchorError),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Preferences file; the platform data directory when unset
    pub store_path:          Option<PathBuf>,
    pub anchor_hour:         u32,
    pub anchor_minute:       u32,
    pub manual_basis:        TimeBasis,
    pub live_basis:          TimeBasis,
    pub tick_interval_ms:    u64,
    pub percent_style:       PercentStyle,
    /// Theme used when none has been saved yet
    pub system_prefers_dark: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path:          None,
            anchor_hour:         ANCHOR_HOUR,
            anchor_minute:       ANCHOR_MINUTE,
            manual_basis:        TimeBasis::Local,
            live_basis:          TimeBasis::Utc,
            tick_interval_ms:    LIVE_TICK_MS,
            percent_style:       PercentStyle::Precise,
            system_prefers_dark: false,
        }
    }
}

impl Config {
    /// Loads the config file (if any) and applies environment overrides.
    ///
    /// # Errors
    /// Returns `ConfigError` if a file exists but cannot be read or parsed,
    /// if an explicit path is missing, or if a value is out of range.
    #[instrument]
    pub fn load(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match resolve_path(path_override) {
            Some((path, required)) => match fs::read_to_string(&path) {
                Ok(text) => {
                    info!(config = %path.display(), "loading config");
                    Self::from_toml_str(&text).map_err(|source| ConfigError::Parse { path, source })?
                },
                Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                    debug!(config = %path.display(), "no config file; using defaults");
                    Self::default()
                },
                Err(source) => return Err(ConfigError::Io { path, source }),
            },
            None => Self::default(),
        };

        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns the TOML error for malformed input or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies `DAYTODAY_STORE` and `DAYTODAY_TICK_MS` from `lookup`.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for a non-numeric tick interval.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(store) = lookup(STORE_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            debug!(store = %store, "store path from environment");
            self.store_path = Some(PathBuf::from(store.trim()));
        }
        if let Some(raw) = lookup(TICK_ENV_VAR) {
            self.tick_interval_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key:   TICK_ENV_VAR,
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError` for a zero tick interval or an invalid anchor time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key:   "tick_interval_ms",
                value: "0".to_owned(),
            });
        }
        self.calculator().map(|_| ())
    }

    /// Calculator with the configured anchor time on each basis
    ///
    /// # Errors
    /// Returns `ConfigError::Anchor` if the anchor time is invalid.
    pub fn calculator(&self) -> Result<ProgressCalculator, ConfigError> {
        let manual = BusinessHourAnchor::new(self.manual_basis, self.anchor_hour, self.anchor_minute)?;
        let live = BusinessHourAnchor::new(self.live_basis, self.anchor_hour, self.anchor_minute)?;
        Ok(ProgressCalculator::new(manual, live))
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Configured preferences file, else the platform default
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_path.clone().or_else(JsonFileStore::default_path)
    }
}

/// The config file to read and whether its absence is an error.
fn resolve_path(path_override: Option<&Path>) -> Option<(PathBuf, bool)> {
    if let Some(path) = path_override {
        return Some((path.to_path_buf(), true));
    }
    if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some((PathBuf::from(trimmed), true));
        }
    }
    dirs::config_dir().map(|dir| (dir.join("daytoday").join(CONFIG_FILE), false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.anchor_hour, 10);
        assert_eq!(cfg.anchor_minute, 30);
        assert_eq!(cfg.manual_basis, TimeBasis::Local);
        assert_eq!(cfg.live_basis, TimeBasis::Utc);
        assert_eq!(cfg.tick_interval(), Duration::from_millis(100));
        assert_eq!(cfg.calculator().expect("default anchors"), ProgressCalculator::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let cfg = Config::from_toml_str(
            r#"
            anchor_hour = 9
            manual_basis = "+02:00"
            percent_style = "compact"
            "#,
        )
        .expect("valid toml");

        assert_eq!(cfg.anchor_hour, 9);
        assert_eq!(cfg.anchor_minute, 30);
        assert_eq!(cfg.manual_basis, "+02:00".parse().expect("offset"));
        assert_eq!(cfg.percent_style, PercentStyle::Compact);
        assert_eq!(cfg.tick_interval_ms, 100);
    }

    #[test]
    fn test_from_toml_rejects_unknown_and_bad_values() {
        assert!(Config::from_toml_str("colour = \"red\"").is_err());
        assert!(Config::from_toml_str("live_basis = \"mars\"").is_err());
        assert!(Config::from_toml_str("percent_style = \"fancy\"").is_err());
    }

    #[test]
    fn test_validate() {
        let cfg = Config {
            anchor_hour: 25,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Anchor(_))));

        let cfg = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_apply_env() {
        let env: HashMap<&str, &str> = HashMap::from([(STORE_ENV_VAR, "/tmp/prefs.json"), (TICK_ENV_VAR, "250")]);
        let mut cfg = Config::default();
        cfg.apply_env(|key| env.get(key).map(|v| (*v).to_owned()))
            .expect("valid env");

        assert_eq!(cfg.store_path(), Some(PathBuf::from("/tmp/prefs.json")));
        assert_eq!(cfg.tick_interval(), Duration::from_millis(250));

        let mut cfg = Config::default();
        let err = cfg
            .apply_env(|key| (key == TICK_ENV_VAR).then(|| "fast".to_owned()))
            .expect_err("non-numeric tick");
        assert_eq!(err.to_string(), "invalid value for DAYTODAY_TICK_MS: fast");
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let err = Config::load(Some(Path::new("/nonexistent/daytoday.toml"))).expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
