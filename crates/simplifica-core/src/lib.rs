//! Core library for simplifica.
//!
//! Scores Portuguese prose with the Flesch reading-ease formula adapted
//! for Portuguese, finds hard sentences inside editable surfaces of a
//! document, highlights them, and asks a language model for simpler
//! rewrites.
//!
//! # Modules
//!
//! - [`readability`] - Flesch score, tiers and bands
//! - [`text`] - Sentence segmentation
//! - [`tree`] - Document model with layout, focus and events
//! - [`surface`] - Editable surface detection, text extraction and replacement
//! - [`locator`] - Finding a sentence inside a surface's text nodes
//! - [`overlay`] - Highlight markers and hit testing
//! - [`orchestrator`] - Discovery, debounced analysis and suggestion apply
//! - [`scheduler`] - Virtual-time timers
//! - [`suggest`] - Suggestion prompt, client and response parsing
//! - [`menu`] - Suggestion panel state
//! - [`messaging`] - API key storage and settings messages
//! - [`markdown`] - Markdown and plain text as documents
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```
//! use simplifica_core::readability;
//!
//! let result = readability::score("O gato dorme no sofá.").unwrap();
//! assert!(result.score > 70.0);
//! ```
#![deny(unsafe_code)]

pub mod config;
pub mod dictionaries;
pub mod error;
pub mod locator;
pub mod markdown;
pub mod menu;
pub mod messaging;
pub mod orchestrator;
pub mod overlay;
pub mod readability;
pub mod scheduler;
pub mod suggest;
pub mod surface;
pub mod text;
pub mod tree;

pub use config::{Config, ConfigLoader, DEFAULT_MAX_INPUT_BYTES, LogLevel};

pub use error::{
    ApplyError, ConfigError, ConfigResult, SuggestError, SuggestResult, SurfaceError,
    SurfaceResult,
};
