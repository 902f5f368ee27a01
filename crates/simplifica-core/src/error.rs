//! Error types for simplifica-core.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,

    /// The API key was rejected before being stored.
    #[error("invalid API key: {reason}")]
    InvalidApiKey {
        /// Why the key was rejected.
        reason: &'static str,
    },

    /// The settings store could not be read or written.
    #[error("settings store {path}: {source}")]
    SettingsIo {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file exists but is not valid JSON.
    #[error("settings store {path} is corrupt: {source}")]
    SettingsFormat {
        /// Path of the settings file.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors reported by an editable surface when writing text back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// None of the replacement strategies found the old text.
    #[error("text not found in surface: {0:?}")]
    TextNotFound(String),

    /// A rendered document had no focused editable element to route the edit to.
    #[error("no focused editable element to route the edit through")]
    NoFocusedEditor,

    /// The old or new text was empty.
    #[error("replacement text must not be empty")]
    EmptyReplacement,
}

/// Result type alias using [`SurfaceError`].
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Errors from the suggestion service.
#[derive(Error, Debug)]
pub enum SuggestError {
    /// No API key is configured; no request was attempted.
    #[error("API key not configured")]
    MissingCredential,

    /// The provider answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body text, as returned by the provider.
        body: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected chat-completion shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type alias using [`SuggestError`].
pub type SuggestResult<T> = Result<T, SuggestError>;

/// Errors from applying a suggestion to the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No known surface contained the old text.
    #[error("could not find the original text; click inside the editor and try again")]
    NotFound,

    /// The old or new text was empty.
    #[error("replacement text must not be empty")]
    EmptyReplacement,
}
