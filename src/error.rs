// ABOUTME: Application-wide error types for rexec.
// ABOUTME: Uses thiserror; every variant maps to the infrastructure-failure exit code.

use crate::runner::{Phase, RunError};
use thiserror::Error;

/// Process exit code for anything other than a remote command reporting its status.
///
/// Same value `ssh(1)` uses for its own failures.
pub const INFRASTRUCTURE_FAILURE: u8 = 255;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Phase of the remote run that failed, if the error came from one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Run(e) => Some(e.phase()),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        INFRASTRUCTURE_FAILURE
    }
}

pub type Result<T> = std::result::Result<T, Error>;
