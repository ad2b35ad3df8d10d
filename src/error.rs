//! Error types for the startup pipeline

use thiserror::Error;

/// Fatal startup failures.
///
/// Anything not listed here (a missing override env file, a malformed config
/// fragment, an unknown time zone) degrades gracefully and is only logged.
#[derive(Debug, Error)]
pub enum Error {
    /// The process time zone variable could not be written.
    #[error("failed to set {var}={value:?}: {reason}")]
    EnvWrite { var: &'static str, value: String, reason: String },

    /// The embedded default env file is missing or malformed.
    #[error("failed to load embedded env file {path}: {reason}")]
    EmbeddedEnv { path: String, reason: String },

    /// The merged key/value state does not fit the destination type.
    #[error("failed to bind merged configuration: {0}")]
    Unmarshal(Box<figment::Error>),

    #[error("unsupported config type '{0}' (expected one of: json, toml, yaml, yml, dotenv, env)")]
    UnsupportedConfigType(String),

    #[error("initialization cancelled before step '{step}'")]
    Cancelled { step: String },
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Unmarshal(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
