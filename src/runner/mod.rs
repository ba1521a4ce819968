// ABOUTME: Runs one command on one remote host and produces an execution report.
// ABOUTME: Sequences connect, exec and disconnect; no retries at any step.

mod error;
mod report;

pub use error::{ConnectSnafu, ExecuteSnafu, Phase, RunError};
pub use report::ExecutionReport;

use crate::config::Config;
use crate::ssh::{self, CommandOutput, Session, SessionConfig};
use async_trait::async_trait;
use snafu::ResultExt;

/// An authenticated connection able to run commands.
#[async_trait]
pub trait RemoteShell: Send + Sync + Sized {
    /// Run a command to completion, capturing its output and exit status.
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput>;

    /// Close the connection.
    async fn disconnect(self) -> ssh::Result<()>;
}

/// Opens authenticated connections.
#[async_trait]
pub trait Connector: Send + Sync {
    type Shell: RemoteShell;

    async fn connect(&self, config: SessionConfig) -> ssh::Result<Self::Shell>;
}

/// Connector backed by a real SSH session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    type Shell = Session;

    async fn connect(&self, config: SessionConfig) -> ssh::Result<Session> {
        Session::connect(config).await
    }
}

#[async_trait]
impl RemoteShell for Session {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        Session::exec(self, command).await
    }

    async fn disconnect(self) -> ssh::Result<()> {
        Session::disconnect(self).await
    }
}

/// Run the configured command and report what it printed and returned.
///
/// A remote command exiting non-zero is a normal report. Anything that keeps
/// the command from reporting an exit status is a [`RunError`].
pub async fn run<C: Connector>(connector: &C, config: &Config) -> Result<ExecutionReport, RunError> {
    let address = config.target.address();

    tracing::info!("connecting to {} as {}", address, config.login);
    let shell = connector
        .connect(config.ssh_session_config())
        .await
        .context(ConnectSnafu { address: &address })?;

    tracing::debug!("executing: {}", config.command);
    let result = shell.exec(&config.command).await;

    // Disconnect on every path; a failed disconnect does not change the outcome.
    if let Err(e) = shell.disconnect().await {
        tracing::warn!("SSH disconnect failed for {}: {}", address, e);
    }

    let report = ExecutionReport::from(result.context(ExecuteSnafu)?);
    if u32::from(report.exit_code()) != report.exit_status {
        tracing::warn!(
            "exit status {} is outside 0-255, reporting {}",
            report.exit_status,
            report.exit_code()
        );
    }
    tracing::info!("command finished with exit status {}", report.exit_status);

    Ok(report)
}
