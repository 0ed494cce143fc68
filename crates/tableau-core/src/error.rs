//! Error types for tableau-core

use thiserror::Error;

/// Core error type
///
/// Only startup registration and document/config parsing fail with an error.
/// Lookups that miss at runtime return `Option` or a default value instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate behavior registration: {0}")]
    DuplicateBehavior(String),

    #[error("Duplicate {kind} registration: {name}")]
    DuplicateRuleElement { kind: &'static str, name: String },

    #[error("Duplicate bridge receiver: {0}")]
    DuplicateBridgeReceiver(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
