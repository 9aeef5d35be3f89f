//! Error type for configuration loading and validation.

use std::path::PathBuf;

/// Errors produced by polystatus-core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// One or more values failed validation. Each entry is one problem.
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    ConfigValidation(Vec<String>),
}

pub type Result<T> = std::result::Result<T, Error>;
