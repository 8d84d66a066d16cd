use std::{io, path::PathBuf};

use thiserror::Error;

pub type KitResult<T> = std::result::Result<T, KitError>;

#[derive(Debug, Error)]
pub enum KitError {
    #[error("containers still running after stop: {}", .0.join(", "))]
    StillRunning(Vec<String>),

    #[error("command `{command}` failed with status {}: {stderr}", display_code(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to start `{0}`: {1}")]
    Spawn(String, io::Error),

    #[error("io error {0}: {1}")]
    IoError(PathBuf, io::Error),

    #[error("console error: {0}")]
    Console(io::Error),

    #[error("another run holds the lock {0}")]
    LockBusy(PathBuf),

    #[error("lock error: {0}")]
    LockError(io::Error),

    #[error("cannot parse runtime output {0:?}: {1}")]
    Parse(String, serde_json::Error),

    #[error("aborted by operator")]
    Aborted,
}

impl KitError {
    /// Process exit status for this error. A failed required command hands
    /// its own exit code through.
    pub fn exit_code(&self) -> i32 {
        match self {
            KitError::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
