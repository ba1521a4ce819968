// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, password authentication, and one-shot command execution.

use super::error::{Error, Result};
use russh::client::{self, Config, Handle, Msg};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::ssh_key;
use russh::{Channel, ChannelMsg, Disconnect, Sig};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for establishing an SSH session.
#[derive(Debug)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Password for authentication.
    pub password: SecretString,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Bound on TCP connect, handshake and authentication. None waits forever.
    pub connect_timeout: Option<Duration>,
    /// Bound on command execution. None waits for the command however long it runs.
    pub command_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            password,
            trust_on_first_use: true,
            known_hosts_path: None,
            connect_timeout: None,
            command_timeout: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output, exactly as the remote command wrote it.
    pub stdout: Vec<u8>,
    /// Standard error, exactly as the remote command wrote it.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) => {
                if !self.trust_on_first_use {
                    tracing::warn!(
                        "host key for {}:{} is not in known_hosts",
                        self.host,
                        self.port
                    );
                    return Ok(false);
                }
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!(
                    "host key for {}:{} does not match known_hosts",
                    self.host,
                    self.port
                );
                Ok(false)
            }
            Err(e) => {
                // Unreadable known_hosts: same policy as an unknown host
                tracing::debug!("known_hosts check failed: {}", e);
                Ok(self.trust_on_first_use)
            }
        }
    }
}

/// An established, authenticated SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    /// Connect to the remote host and authenticate with the configured password.
    ///
    /// `connect_timeout` is one budget shared by the handshake and the
    /// password exchange; the error names the step that ran out of it.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let deadline = config
            .connect_timeout
            .map(|limit| (Instant::now() + limit, limit));

        // The whole run is bounded by the caller, not by russh idling out.
        let russh_config = Config {
            inactivity_timeout: None,
            ..Default::default()
        };

        let handler = SshHandler::new(&config);

        tracing::debug!("connecting to {}:{}", config.host, config.port);
        let connecting = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        );
        let mut handle = within(deadline, connecting, Error::ConnectTimeout)
            .await?
            .map_err(|e| match e {
                russh::Error::UnknownKey => Error::Connection(format!(
                    "host key verification failed for {}:{}",
                    config.host, config.port
                )),
                e if e.to_string().contains("Connection refused") => Error::Connection(format!(
                    "connection refused to {}:{}",
                    config.host, config.port
                )),
                e => Error::Connection(e.to_string()),
            })?;

        tracing::debug!("authenticating as {}", config.user);
        let authenticating = handle
            .authenticate_password(config.user.as_str(), config.password.expose_secret().as_str());
        let auth = within(deadline, authenticating, Error::AuthenticationTimeout)
            .await?
            .map_err(Error::Protocol)?;
        if !auth.success() {
            return Err(Error::AuthenticationFailed(config.user.clone()));
        }

        Ok(Self { config, handle })
    }

    /// Execute a command on the remote host, honouring the configured command timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    /// Execute a command with an explicit timeout.
    ///
    /// The channel opened for the command is closed before returning, whether
    /// the command completed, failed or timed out.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::ChannelOpen(e.to_string()))?;

        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, run_on_channel(&mut channel, command))
                .await
                .unwrap_or_else(|_| Err(Error::CommandTimeout(limit))),
            None => run_on_channel(&mut channel, command).await,
        };

        if let Err(e) = channel.close().await {
            // Already closed by the server once the command has finished.
            tracing::debug!("channel close: {}", e);
        }

        result
    }

    /// Disconnect the session.
    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        Ok(())
    }
}

/// Await `fut`, giving up at `deadline` with the error built from the configured limit.
async fn within<F: Future>(
    deadline: Option<(Instant, Duration)>,
    fut: F,
    elapsed: fn(Duration) -> Error,
) -> Result<F::Output> {
    match deadline {
        Some((at, limit)) => tokio::time::timeout_at(at, fut)
            .await
            .map_err(|_| elapsed(limit)),
        None => Ok(fut.await),
    }
}

async fn run_on_channel(channel: &mut Channel<Msg>, command: &str) -> Result<CommandOutput> {
    channel
        .exec(true, command)
        .await
        .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))?;

    let mut capture = Capture::default();
    while let Some(msg) = channel.wait().await {
        if capture.absorb(msg) {
            break;
        }
    }
    capture.finish()
}

/// Accumulates what the remote side sends on an exec channel.
#[derive(Debug, Default)]
struct Capture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: Option<u32>,
    exit_signal: Option<Sig>,
    got_eof: bool,
}

impl Capture {
    /// Feed one channel message. Returns true once nothing more is expected.
    fn absorb(&mut self, msg: ChannelMsg) -> bool {
        match msg {
            ChannelMsg::Data { data } => {
                self.stdout.extend_from_slice(&data);
                false
            }
            ChannelMsg::ExtendedData { data, ext } => {
                if ext == 1 {
                    // stderr
                    self.stderr.extend_from_slice(&data);
                }
                false
            }
            ChannelMsg::ExitStatus { exit_status } => {
                self.exit_status = Some(exit_status);
                self.got_eof
            }
            ChannelMsg::ExitSignal { signal_name, .. } => {
                self.exit_signal = Some(signal_name);
                self.got_eof
            }
            ChannelMsg::Eof => {
                self.got_eof = true;
                self.exited()
            }
            ChannelMsg::Close => true,
            _ => false,
        }
    }

    fn exited(&self) -> bool {
        self.exit_status.is_some() || self.exit_signal.is_some()
    }

    fn finish(self) -> Result<CommandOutput> {
        let exit_code = match (self.exit_status, self.exit_signal) {
            (Some(status), _) => status,
            (None, Some(signal)) => match signal_number(&signal) {
                Some(n) => 128 + n,
                None => {
                    return Err(Error::KilledBySignal {
                        signal: signal_label(&signal),
                    });
                }
            },
            // Closed without an exit status: abnormal termination, not success.
            (None, None) => return Err(Error::ChannelClosed),
        };

        Ok(CommandOutput {
            exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        })
    }
}

/// POSIX signal number, as a shell would report it in `$? - 128`.
fn signal_number(signal: &Sig) -> Option<u32> {
    match signal {
        Sig::HUP => Some(1),
        Sig::INT => Some(2),
        Sig::QUIT => Some(3),
        Sig::ILL => Some(4),
        Sig::ABRT => Some(6),
        Sig::FPE => Some(8),
        Sig::KILL => Some(9),
        Sig::USR1 => Some(10),
        Sig::SEGV => Some(11),
        Sig::PIPE => Some(13),
        Sig::ALRM => Some(14),
        Sig::TERM => Some(15),
        _ => None,
    }
}

fn signal_label(signal: &Sig) -> String {
    match signal {
        Sig::Custom(name) => name.clone(),
        other => format!("{:?}", other),
    }
}
