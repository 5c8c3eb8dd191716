//! File-backed key-value storage.
//!
//! Two areas live side by side in the data directory: `local.json` holds the
//! current page snapshot, chat history and error state; `sync.json` holds the
//! user's settings. Each area is a flat JSON object. Writes are plain
//! read-modify-write cycles with no locking, so a single front end is
//! expected.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::chat::ChatHistory;
use crate::error::{Error, Result};
use crate::provider::ProviderKind;

/// Environment variable overriding the stored provider.
pub const PROVIDER_ENV: &str = "PAGE_DIGEST_PROVIDER";
/// Environment variable overriding the stored API key.
pub const API_KEY_ENV: &str = "PAGE_DIGEST_API_KEY";

/// A storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    /// Page snapshot, chat history, error state.
    Local,
    /// User settings.
    Sync,
}

impl Area {
    fn file_name(self) -> &'static str {
        match self {
            Self::Local => "local.json",
            Self::Sync => "sync.json",
        }
    }
}

/// Stored keys.
pub mod keys {
    pub const CURRENT_CONTENT: &str = "currentContent";
    pub const CURRENT_URL: &str = "currentUrl";
    pub const CURRENT_TITLE: &str = "currentTitle";
    pub const EXTRACTED_AT: &str = "extractedAt";
    pub const IS_PROCESSING: &str = "isProcessing";
    pub const LAST_ERROR: &str = "lastError";
    pub const ERROR_TIMESTAMP: &str = "errorTimestamp";
    pub const CHAT_HISTORY: &str = "chatHistory";
    pub const API_KEY: &str = "apiKey";
}

/// User settings kept in the sync area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: String::new(),
            max_tokens: 200,
            temperature: 0.3,
        }
    }
}

impl Settings {
    /// Whether a non-blank API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Apply overrides from a variable lookup.
    ///
    /// An unknown provider name is ignored with a warning.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(PROVIDER_ENV) {
            match raw.parse::<ProviderKind>() {
                Ok(kind) => self.provider = kind,
                Err(e) => warn!(value = %raw, "Ignoring {PROVIDER_ENV}: {e}"),
            }
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = key;
        }
        self
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Clamp numeric fields into ranges the providers accept.
    pub fn validate(&mut self) {
        self.temperature = self.temperature.clamp(0.0, 2.0);
        if self.max_tokens == 0 {
            self.max_tokens = Self::default().max_tokens;
        }
    }
}

/// The page being summarized or discussed, plus error state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_title: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<i64>,
    pub is_processing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_timestamp: Option<i64>,
}

impl PageSnapshot {
    /// A fresh snapshot of extracted content, stamped now.
    #[must_use]
    pub fn new(content: impl Into<String>, url: Option<String>, title: Option<String>) -> Self {
        Self {
            current_content: Some(content.into()),
            current_url: url,
            current_title: title,
            extracted_at: Some(Utc::now().timestamp_millis()),
            ..Self::default()
        }
    }

    /// Stored content, if any and not blank.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.current_content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Dump of both areas for troubleshooting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub local: Map<String, Value>,
    pub sync: Map<String, Value>,
    /// Serialized size in bytes of the local area.
    pub local_size: usize,
    /// Serialized size in bytes of the sync area.
    pub sync_size: usize,
    pub timestamp: DateTime<Utc>,
}

/// Key-value store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open a store in `dir`, creating it when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(default_data_dir()?)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, area: Area) -> PathBuf {
        self.dir.join(area.file_name())
    }

    fn read_area(&self, area: Area) -> Result<Map<String, Value>> {
        let path = self.path(area);
        if !path.exists() {
            return Ok(Map::new());
        }
        let json = fs::read_to_string(&path)?;
        if json.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&json)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::Storage(format!("{} is not a JSON object", path.display()))),
        }
    }

    fn write_area(&self, area: Area, map: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(map)?;
        fs::write(self.path(area), json)?;
        Ok(())
    }

    /// Values for `keys`; absent keys are left out.
    pub fn get(&self, area: Area, keys: &[&str]) -> Result<Map<String, Value>> {
        let mut all = self.read_area(area)?;
        all.retain(|k, _| keys.contains(&k.as_str()));
        Ok(all)
    }

    /// Every key in `area`.
    pub fn get_all(&self, area: Area) -> Result<Map<String, Value>> {
        self.read_area(area)
    }

    /// Merge `values` into `area`.
    pub fn set(&self, area: Area, values: Map<String, Value>) -> Result<()> {
        let mut all = self.read_area(area)?;
        debug!(?area, keys = values.len(), "Storage set");
        all.extend(values);
        self.write_area(area, &all)
    }

    pub fn remove(&self, area: Area, keys: &[&str]) -> Result<()> {
        let mut all = self.read_area(area)?;
        let before = all.len();
        all.retain(|k, _| !keys.contains(&k.as_str()));
        if all.len() != before {
            self.write_area(area, &all)?;
        }
        Ok(())
    }

    pub fn clear(&self, area: Area) -> Result<()> {
        debug!(?area, "Storage cleared");
        self.write_area(area, &Map::new())
    }

    /// Stored settings with defaults filled in and environment overrides applied.
    pub fn load_settings(&self) -> Result<Settings> {
        Ok(self.load_stored_settings()?.with_env_overrides())
    }

    /// Stored settings without environment overrides.
    pub fn load_stored_settings(&self) -> Result<Settings> {
        let mut settings: Settings = serde_json::from_value(Value::Object(self.get_all(Area::Sync)?))?;
        settings.validate();
        Ok(settings)
    }

    /// Save settings, refusing a blank API key.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSettings`] when the key is blank, storage errors otherwise.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        if !settings.has_api_key() {
            return Err(Error::InvalidSettings("Please enter an API key".to_string()));
        }
        let mut settings = settings.clone();
        settings.api_key = settings.api_key.trim().to_string();
        settings.validate();
        self.set(Area::Sync, to_map(&settings)?)
    }

    pub fn load_snapshot(&self) -> Result<PageSnapshot> {
        Ok(serde_json::from_value(Value::Object(self.get_all(Area::Local)?))?)
    }

    /// Replace the page fields of the snapshot and drop the conversation
    /// about the previous page. Other local keys are left alone.
    pub fn save_snapshot(&self, snapshot: &PageSnapshot) -> Result<()> {
        self.remove(
            Area::Local,
            &[
                keys::CURRENT_CONTENT,
                keys::CURRENT_URL,
                keys::CURRENT_TITLE,
                keys::EXTRACTED_AT,
                keys::CHAT_HISTORY,
            ],
        )?;
        self.set(Area::Local, to_map(snapshot)?)
    }

    /// Store an error for the front end to show.
    pub fn record_error(&self, message: &str) -> Result<()> {
        let mut values = Map::new();
        values.insert(keys::LAST_ERROR.to_string(), Value::from(message));
        values.insert(
            keys::ERROR_TIMESTAMP.to_string(),
            Value::from(Utc::now().timestamp_millis()),
        );
        self.set(Area::Local, values)
    }

    /// Remove and return the stored error, so it is shown only once.
    pub fn take_last_error(&self) -> Result<Option<String>> {
        let stored = self.get(Area::Local, &[keys::LAST_ERROR])?;
        let message = stored
            .get(keys::LAST_ERROR)
            .and_then(Value::as_str)
            .map(str::to_string);
        if message.is_some() {
            self.remove(Area::Local, &[keys::LAST_ERROR, keys::ERROR_TIMESTAMP])?;
        }
        Ok(message)
    }

    pub fn set_processing(&self, processing: bool) -> Result<()> {
        let mut values = Map::new();
        values.insert(keys::IS_PROCESSING.to_string(), Value::Bool(processing));
        self.set(Area::Local, values)
    }

    pub fn load_chat_history(&self) -> Result<ChatHistory> {
        let stored = self.get(Area::Local, &[keys::CHAT_HISTORY])?;
        match stored.get(keys::CHAT_HISTORY) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(ChatHistory::default()),
        }
    }

    pub fn save_chat_history(&self, history: &ChatHistory) -> Result<()> {
        let mut values = Map::new();
        values.insert(keys::CHAT_HISTORY.to_string(), serde_json::to_value(history)?);
        self.set(Area::Local, values)
    }

    /// Clear both areas.
    pub fn clear_all(&self) -> Result<()> {
        self.clear(Area::Local)?;
        self.clear(Area::Sync)
    }

    /// Both areas with their serialized sizes.
    ///
    /// The API key is masked.
    pub fn debug_info(&self) -> Result<DebugInfo> {
        let local = self.get_all(Area::Local)?;
        let mut sync = self.get_all(Area::Sync)?;
        let local_size = serde_json::to_string(&local)?.len();
        let sync_size = serde_json::to_string(&sync)?.len();

        if let Some(Value::String(key)) = sync.get_mut(keys::API_KEY) {
            *key = mask_key(key);
        }

        Ok(DebugInfo {
            local,
            sync,
            local_size,
            sync_size,
            timestamp: Utc::now(),
        })
    }
}

/// Platform data directory for page-digest.
pub fn default_data_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("com", "page-digest", "page-digest")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| Error::Storage("No home directory found".to_string()))
}

fn to_map<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Storage("Expected a JSON object".to_string())),
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "*".repeat(key.chars().count())
    } else {
        format!("{visible}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn settings_defaults_when_empty() {
        let (_dir, store) = store();
        let settings = store.load_stored_settings().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.provider, ProviderKind::OpenAi);
        assert_eq!(settings.max_tokens, 200);
    }

    #[test]
    fn settings_stored_in_camel_case() {
        let (_dir, store) = store();
        let settings = Settings {
            provider: ProviderKind::Gemini,
            api_key: "  key-123  ".to_string(),
            ..Settings::default()
        };
        store.save_settings(&settings).unwrap();

        let raw = store.get(Area::Sync, &["apiKey", "provider"]).unwrap();
        assert_eq!(raw["apiKey"], "key-123");
        assert_eq!(raw["provider"], "gemini");
        assert_eq!(store.load_stored_settings().unwrap().provider, ProviderKind::Gemini);
    }

    #[test]
    fn blank_api_key_rejected() {
        let (_dir, store) = store();
        let err = store.save_settings(&Settings::default()).unwrap_err();
        assert_eq!(err.to_string(), "Please enter an API key");
    }

    #[test]
    fn overrides_apply() {
        let settings = Settings::default().with_overrides(|name| match name {
            PROVIDER_ENV => Some("anthropic".to_string()),
            API_KEY_ENV => Some("sk-ant-env".to_string()),
            _ => None,
        });
        assert_eq!(settings.provider, ProviderKind::Anthropic);
        assert_eq!(settings.api_key, "sk-ant-env");

        let unchanged = Settings::default().with_overrides(|name| {
            (name == PROVIDER_ENV).then(|| "mistral".to_string())
        });
        assert_eq!(unchanged.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn validate_clamps() {
        let mut settings = Settings {
            temperature: 7.5,
            max_tokens: 0,
            ..Settings::default()
        };
        settings.validate();
        assert!((settings.temperature - 2.0).abs() < f32::EPSILON);
        assert_eq!(settings.max_tokens, 200);
    }

    #[test]
    fn last_error_is_taken_once() {
        let (_dir, store) = store();
        store.record_error("boom").unwrap();
        assert_eq!(store.take_last_error().unwrap().as_deref(), Some("boom"));
        assert_eq!(store.take_last_error().unwrap(), None);
        assert!(store.get_all(Area::Local).unwrap().is_empty());
    }

    #[test]
    fn mask_short_and_long_keys() {
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("sk-abcdefghij"), "sk-a…");
    }
}
