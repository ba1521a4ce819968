// ABOUTME: Immutable run configuration assembled from command-line flags.
// ABOUTME: Validates the target, login and command before any connection is made.

mod password;
mod target;

pub use password::{PASSWORD_ENV, resolve_password};
pub use target::{DEFAULT_PORT, Target};

use crate::error::{Error, Result};
use crate::ssh::SessionConfig;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed for one invocation: where to connect, as whom, and what to run.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: Target,
    pub login: String,
    pub password: SecretString,
    /// Passed verbatim to the remote shell.
    pub command: String,
    pub command_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub known_hosts_path: Option<PathBuf>,
    pub trust_first_connection: bool,
}

impl Config {
    pub fn new(
        target: Target,
        login: impl Into<String>,
        password: SecretString,
        command: impl Into<String>,
    ) -> Result<Self> {
        let login = login.into();
        if login.trim().is_empty() {
            return Err(Error::InvalidConfig("login cannot be empty".to_string()));
        }
        let command = command.into();
        if command.trim().is_empty() {
            return Err(Error::InvalidConfig("command cannot be empty".to_string()));
        }

        Ok(Self {
            target,
            login,
            password,
            command,
            command_timeout: None,
            connect_timeout: None,
            known_hosts_path: None,
            trust_first_connection: true,
        })
    }

    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }

    pub fn trust_first_connection(mut self, trust: bool) -> Self {
        self.trust_first_connection = trust;
        self
    }

    /// Session settings for the SSH layer.
    pub fn ssh_session_config(&self) -> SessionConfig {
        let session = SessionConfig::new(&self.target.host, &self.login, self.password.clone())
            .port(self.target.port)
            .trust_on_first_use(self.trust_first_connection)
            .connect_timeout(self.connect_timeout)
            .command_timeout(self.command_timeout);

        match &self.known_hosts_path {
            Some(path) => session.known_hosts_path(path),
            None => session,
        }
    }
}
