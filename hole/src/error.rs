use std::path::PathBuf;

use thiserror::Error;

use crate::common::StatusCode;

#[derive(Debug, Error)]
pub enum HoleError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unrecognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("handler already exists: {0}")]
    HandlerAlreadyExists(String),

    #[error("entry not found: {0}")]
    EntryNotFound(u32),

    #[error("key does not exist: {0}")]
    KeyNotFound(String),

    #[error("key does not exist in the key set: {0}")]
    IllegalKey(String),

    #[error("config level does not exist: {0}")]
    LevelNotFound(String),

    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    #[error("unsupported config file, expected JSON: {}", .0.display())]
    UnsupportedConfigFile(PathBuf),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HoleError>;

impl HoleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HoleError::UnrecognizedCommand(_) => StatusCode::InvalidCommand,
            HoleError::InvalidArgument(_) => StatusCode::InvalidArgument,
            _ => StatusCode::Failure,
        }
    }

    /// Process exit status for this error; never zero.
    pub fn exit_code(&self) -> i32 {
        self.status_code().code()
    }
}
