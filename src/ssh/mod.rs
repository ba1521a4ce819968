// ABOUTME: SSH client module for remote command execution.
// ABOUTME: Password authentication with known_hosts verification and trust on first use.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
