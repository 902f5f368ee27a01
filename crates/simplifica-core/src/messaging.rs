//! API-key messages and the durable settings store behind them.
//!
//! Two requests cross the process boundary as JSON:
//!
//! ```json
//! {"action": "getApiKey"}                       -> {"apiKey": "sk-or-..."}
//! {"action": "updateApiKey", "apiKey": "..."}   -> {"success": true}
//! ```
//!
//! An accepted update is saved and then broadcast to every subscribed
//! analysis context, so a new key takes effect without a reload.

use std::sync::mpsc::{self, Receiver, Sender};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::config::user_data_dir;
use crate::error::{ConfigError, ConfigResult};

/// Prefix every accepted key must carry.
pub const API_KEY_PREFIX: &str = "sk-or-";

/// File name of the settings store inside the user data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Ask for the stored key.
    GetApiKey,
    /// Replace the stored key and notify listeners.
    UpdateApiKey {
        /// The new key.
        #[serde(rename = "apiKey")]
        api_key: String,
    },
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// The stored key, if any.
    ApiKey {
        /// Stored key.
        #[serde(rename = "apiKey")]
        api_key: Option<String>,
    },
    /// Outcome of an update or of a malformed request.
    Status {
        /// Whether the request was honoured.
        success: bool,
        /// Reason for failure.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
}

impl Response {
    fn ok() -> Self {
        Self::Status {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl std::fmt::Display) -> Self {
        Self::Status {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Broadcast sent to analysis contexts when the key changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUpdate {
    /// The new key; `None` when it was cleared.
    pub api_key: Option<String>,
}

/// Persisted user settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Language-model provider key.
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Durable key-value storage for [`Settings`].
pub trait SettingsStore {
    /// Read the stored settings; a store that was never written yields defaults.
    fn load(&self) -> ConfigResult<Settings>;

    /// Persist `settings`.
    fn save(&mut self, settings: &Settings) -> ConfigResult<()>;
}

/// Settings kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: Utf8PathBuf,
}

impl FileStore {
    /// A store backed by `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store in the platform's user data directory.
    pub fn in_user_data_dir() -> Option<Self> {
        user_data_dir().map(|dir| Self::new(dir.join(SETTINGS_FILE)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl SettingsStore for FileStore {
    fn load(&self) -> ConfigResult<Settings> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(source) => {
                return Err(ConfigError::SettingsIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::SettingsFormat {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&mut self, settings: &Settings) -> ConfigResult<()> {
        let io_err = |source| ConfigError::SettingsIo {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(|source| {
            ConfigError::SettingsFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(io_err)?;
        tracing::debug!(path = %self.path, "saved settings");
        Ok(())
    }
}

/// Settings kept in memory, for hosts without durable storage and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Settings,
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> ConfigResult<Settings> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &Settings) -> ConfigResult<()> {
        self.settings = settings.clone();
        Ok(())
    }
}

/// Check a key before storing it. Returns the trimmed key.
pub fn validate_api_key(key: &str) -> ConfigResult<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::InvalidApiKey {
            reason: "key is empty",
        });
    }
    if !key.starts_with(API_KEY_PREFIX) {
        return Err(ConfigError::InvalidApiKey {
            reason: "expected a key starting with sk-or-",
        });
    }
    Ok(key.to_string())
}

/// Answers key requests against a store and fans updates out to listeners.
#[derive(Debug)]
pub struct Broker<S> {
    store: S,
    listeners: Vec<Sender<KeyUpdate>>,
}

impl<S: SettingsStore> Broker<S> {
    /// A broker over `store` with no listeners.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Register a listener. Dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> Receiver<KeyUpdate> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    /// Number of live listeners as of the last broadcast.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The stored key.
    pub fn api_key(&self) -> ConfigResult<Option<String>> {
        Ok(self.store.load()?.api_key)
    }

    /// Validate, store and broadcast a new key.
    #[tracing::instrument(skip_all)]
    pub fn update_api_key(&mut self, key: &str) -> ConfigResult<()> {
        let key = validate_api_key(key)?;
        let mut settings = self.store.load()?;
        settings.api_key = Some(key.clone());
        self.store.save(&settings)?;
        self.broadcast(&KeyUpdate { api_key: Some(key) });
        Ok(())
    }

    /// Remove the stored key and broadcast its absence.
    pub fn clear_api_key(&mut self) -> ConfigResult<()> {
        let mut settings = self.store.load()?;
        settings.api_key = None;
        self.store.save(&settings)?;
        self.broadcast(&KeyUpdate { api_key: None });
        Ok(())
    }

    fn broadcast(&mut self, update: &KeyUpdate) {
        self.listeners.retain(|tx| tx.send(update.clone()).is_ok());
        tracing::info!(listeners = self.listeners.len(), "broadcast API key update");
    }

    /// Answer one request. Failures become an unsuccessful response.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::GetApiKey => match self.api_key() {
                Ok(api_key) => Response::ApiKey { api_key },
                Err(e) => {
                    tracing::warn!(error = %e, "could not read settings");
                    Response::ApiKey { api_key: None }
                }
            },
            Request::UpdateApiKey { api_key } => match self.update_api_key(&api_key) {
                Ok(()) => Response::ok(),
                Err(e) => Response::failed(e),
            },
        }
    }

    /// Answer one JSON-encoded request with a JSON-encoded response.
    pub fn handle_json(&mut self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request),
            Err(e) => Response::failed(format!("unrecognised message: {e}")),
        };
        serde_json::to_string(&response).unwrap_or_else(|_| r#"{"success":false}"#.to_string())
    }
}
