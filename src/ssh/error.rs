// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, channel and command execution failures.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("authentication timed out after {0:?}")]
    AuthenticationTimeout(Duration),

    #[error("authentication failed: password rejected for user {0}")]
    AuthenticationFailed(String),

    #[error("failed to open channel: {0}")]
    ChannelOpen(String),

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("remote command killed by signal {signal}")]
    KilledBySignal { signal: String },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
