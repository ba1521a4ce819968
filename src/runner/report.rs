// ABOUTME: Execution report produced by one remote command run.
// ABOUTME: Holds captured stdout/stderr bytes and the exit status, clamped for process exit.

use crate::ssh::CommandOutput;

/// What the remote command printed and returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Status as reported by the server.
    pub exit_status: u32,
}

impl ExecutionReport {
    /// Status usable as a process exit code. Anything above 255 becomes 255.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.exit_status).unwrap_or(u8::MAX)
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

impl From<CommandOutput> for ExecutionReport {
    fn from(output: CommandOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_status: output.exit_code,
        }
    }
}
