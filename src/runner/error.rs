// ABOUTME: Runner error types with SNAFU pattern.
// ABOUTME: Tags infrastructure failures with the phase of the run that failed.

use crate::ssh;
use snafu::Snafu;
use std::fmt;

/// Infrastructure failure: the remote command did not run to a reported exit status.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    #[snafu(display("could not connect to {address}: {source}"))]
    Connect { address: String, source: ssh::Error },

    #[snafu(display("remote execution failed: {source}"))]
    Execute { source: ssh::Error },
}

/// Step of the run sequence, for reporting which one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// TCP connect and SSH handshake.
    Connect,
    /// Password authentication.
    Authenticate,
    /// Opening the session channel.
    OpenChannel,
    /// Running the command and collecting its output.
    Run,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connect => "connect",
            Phase::Authenticate => "authenticate",
            Phase::OpenChannel => "open channel",
            Phase::Run => "run",
        };
        f.write_str(name)
    }
}

impl RunError {
    /// Returns the phase that failed.
    pub fn phase(&self) -> Phase {
        match self {
            RunError::Connect { source, .. } => match source {
                // Protocol errors after the handshake come from the auth exchange.
                ssh::Error::AuthenticationFailed(_)
                | ssh::Error::AuthenticationTimeout(_)
                | ssh::Error::Protocol(_) => Phase::Authenticate,
                _ => Phase::Connect,
            },
            RunError::Execute { source } => match source {
                ssh::Error::ChannelOpen(_) => Phase::OpenChannel,
                _ => Phase::Run,
            },
        }
    }
}
