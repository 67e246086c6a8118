//! Best-effort key-value persistence of the last dates, theme and live flag.
//!
//! Storage may be missing, read-only or corrupt. [`Preferences`] logs such
//! failures at debug level and carries on as if nothing had been stored.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::prelude::*;
use crate::{DATES_KEY, DateInputs, LIVE_KEY, THEME_KEY};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// String key-value storage, in the manner of browser local storage.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// In-process store; lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// A JSON object of string values in a single file.
///
/// Every write replaces the whole file through a sibling temp file, so
/// readers never see a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `daytoday/preferences.json` under the platform data directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("daytoday").join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<BTreeMap<String, String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir
            },
            None => Path::new("."),
        };
        debug!(count = entries.len(), "saving preferences atomically");

        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(entries)?;
        writeln!(temp, "{serialized}")?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        // A corrupt document is replaced rather than blocking every later
        // write; a file that cannot be read at all is left alone.
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Serialization(err)) => {
                debug!(error = %err, "discarding corrupt preferences file");
                BTreeMap::new()
            },
            Err(err) => return Err(err),
        };
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }
}

/// Colour scheme of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    #[display(fmt = "light")]
    Light,
    #[display(fmt = "dark")]
    Dark,
}

impl Theme {
    pub const fn toggle(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub const fn from_dark(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid theme: {0} (expected 'light' or 'dark')")]
pub struct ThemeError(String);

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(ThemeError(s.to_owned())),
        }
    }
}

/// Typed, failure-tolerant access to the persisted preferences.
#[derive(Debug)]
pub struct Preferences<S> {
    store: S,
}

impl<S: PreferenceStore> Preferences<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|err| {
            debug!(key, error = %err, "preference read failed");
            None
        })
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            debug!(key, error = %err, "preference write failed");
        }
    }

    /// The last saved date record, if every field of it is filled in
    pub fn load_dates(&self) -> Option<DateInputs> {
        let raw = self.read(DATES_KEY)?;
        match serde_json::from_str::<DateInputs>(&raw) {
            Ok(inputs) if inputs.is_filled() => Some(inputs),
            Ok(_) => None,
            Err(err) => {
                debug!(error = %err, "ignoring malformed date record");
                None
            },
        }
    }

    pub fn save_dates(&self, inputs: &DateInputs) {
        match serde_json::to_string(inputs) {
            Ok(json) => self.write(DATES_KEY, &json),
            Err(err) => debug!(error = %err, "could not encode date record"),
        }
    }

    /// The saved theme, else the system preference
    pub fn load_theme(&self, system_prefers_dark: bool) -> Theme {
        self.read(THEME_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| Theme::from_dark(system_prefers_dark))
    }

    pub fn save_theme(&self, theme: Theme) {
        self.write(THEME_KEY, &theme.to_string());
    }

    /// `"1"` or `"true"` enable live mode; anything else, or nothing, disables it
    pub fn load_live(&self) -> bool {
        matches!(self.read(LIVE_KEY).as_deref(), Some("1" | "true"))
    }

    pub fn save_live(&self, live: bool) {
        self.write(LIVE_KEY, if live { "1" } else { "0" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A store whose every operation fails.
    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Io(io::Error::other("storage unavailable")))
        }

        fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Io(io::Error::other("quota exceeded")))
        }
    }

    #[test]
    fn test_json_store_replaces_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get(THEME_KEY), Err(StoreError::Serialization(_))));
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_json_store_keeps_unreadable_file() {
        // A directory in place of the file reads as an io error, not as corrupt JSON.
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("prefs.json")).unwrap();

        let store = JsonFileStore::new(dir.path().join("prefs.json"));
        assert!(matches!(store.set(THEME_KEY, "dark"), Err(StoreError::Io(_))));
        assert!(dir.path().join("prefs.json").is_dir());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_owned()));
    }

    #[test]
    fn test_dates_round_trip() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.load_dates(), None);

        let inputs = DateInputs::new("2024-01-01", "2024-01-11", "2024-01-21");
        prefs.save_dates(&inputs);
        assert_eq!(prefs.load_dates(), Some(inputs));
        assert_eq!(
            prefs.store().get(DATES_KEY).unwrap().as_deref(),
            Some(r#"{"start":"2024-01-01","today":"2024-01-11","end":"2024-01-21"}"#)
        );
    }

    #[test]
    fn test_partial_or_malformed_dates_ignored() {
        let prefs = Preferences::new(MemoryStore::new());

        prefs.save_dates(&DateInputs::new("2024-01-01", "", "2024-01-21"));
        assert_eq!(prefs.load_dates(), None);

        prefs.store().set(DATES_KEY, "not json").unwrap();
        assert_eq!(prefs.load_dates(), None);
    }

    #[test]
    fn test_theme_cases() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.load_theme(false), Theme::Light);
        assert_eq!(prefs.load_theme(true), Theme::Dark);

        prefs.save_theme(Theme::Dark);
        assert_eq!(prefs.load_theme(false), Theme::Dark);
        assert_eq!(prefs.store().get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        prefs.store().set(THEME_KEY, "sepia").unwrap();
        assert_eq!(prefs.load_theme(true), Theme::Dark);
        assert_eq!(prefs.load_theme(false), Theme::Light);
    }

    #[test]
    fn test_theme_toggle_and_parse() {
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("Dark!".parse::<Theme>().is_err());
    }

    #[test]
    fn test_live_flag_cases() {
        struct TestCase {
            stored:   Option<&'static str>,
            expected: bool,
        }

        let cases = [
            TestCase {
                stored:   None,
                expected: false,
            },
            TestCase {
                stored:   Some("1"),
                expected: true,
            },
            TestCase {
                stored:   Some("true"),
                expected: true,
            },
            TestCase {
                stored:   Some("0"),
                expected: false,
            },
            TestCase {
                stored:   Some("yes"),
                expected: false,
            },
        ];

        for case in &cases {
            let prefs = Preferences::new(MemoryStore::new());
            if let Some(value) = case.stored {
                prefs.store().set(LIVE_KEY, value).unwrap();
            }
            assert_eq!(prefs.load_live(), case.expected, "stored {:?}", case.stored);
        }
    }

    #[test]
    fn test_save_live_writes_flag() {
        let prefs = Preferences::new(MemoryStore::new());
        prefs.save_live(true);
        assert_eq!(prefs.store().get(LIVE_KEY).unwrap().as_deref(), Some("1"));
        prefs.save_live(false);
        assert_eq!(prefs.store().get(LIVE_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_failures_are_swallowed() {
        let prefs = Preferences::new(BrokenStore);

        prefs.save_dates(&DateInputs::new("2024-01-01", "2024-01-11", "2024-01-21"));
        prefs.save_theme(Theme::Dark);
        prefs.save_live(true);

        assert_eq!(prefs.load_dates(), None);
        assert_eq!(prefs.load_theme(true), Theme::Dark);
        assert!(!prefs.load_live());
    }
}
