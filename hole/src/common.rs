//! Values shared by every handler: the outcome status and the per-invocation bundle.

use std::{env, path::PathBuf};

/// Outcome of an invocation; doubles as the process exit status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Not executed yet.
    #[default]
    Null,
    Success,
    /// No handler for the given command.
    InvalidCommand,
    /// Wrong number or shape of arguments.
    InvalidArgument,
    Failure,
}

impl StatusCode {
    const ALL: [StatusCode; 5] = [
        StatusCode::Null,
        StatusCode::Success,
        StatusCode::InvalidCommand,
        StatusCode::InvalidArgument,
        StatusCode::Failure,
    ];

    pub fn code(&self) -> i32 {
        match self {
            StatusCode::Null => -1,
            StatusCode::Success => 0,
            StatusCode::InvalidCommand => 1,
            StatusCode::InvalidArgument => 2,
            StatusCode::Failure => 3,
        }
    }

    /// Returns `Null` for unknown codes.
    pub fn from_code(code: i32) -> StatusCode {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .unwrap_or(StatusCode::Null)
    }
}

/// Properties of the machine the invocation runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    pub dir: PathBuf,
}

impl Env {
    pub fn current() -> Self {
        let dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { dir }
    }
}

/// State carried through one invocation: environment, status and output buffer.
#[derive(Debug)]
pub struct Bundle {
    env: Env,
    pub status_code: StatusCode,
    pub buffer: String,
}

impl Bundle {
    pub fn new(env: Env) -> Self {
        Self {
            env,
            status_code: StatusCode::Null,
            buffer: String::new(),
        }
    }

    pub fn create() -> Self {
        Self::new(Env::current())
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// The buffer without surrounding whitespace; what gets printed.
    pub fn message(&self) -> &str {
        self.buffer.trim()
    }
}
