//! Error types for schema derivation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema derivation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A `default`, `example` or `examples` annotation is not valid data for
    /// the field's type, neither as raw JSON nor as a plain string.
    #[error("fail to load tag on field {field}: value of {tag} tag is invalid: {reason}")]
    InvalidTag {
        field: String,
        tag: String,
        reason: String,
    },

    #[error("invalid enum values for {name}: {reason}")]
    InvalidEnum { name: String, reason: String },

    #[error("type is not defined: {0}")]
    NotDefined(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}
