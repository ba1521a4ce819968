// ABOUTME: Output formatting for the execution report and failures.
// ABOUTME: Supports the fixed text layout and a single-line JSON mode.

use crate::error::{Error, Result};
use crate::runner::ExecutionReport;
use serde::Serialize;
use std::io::Write;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Labelled text blocks for humans
    Text,
    /// One JSON object per invocation for scripting
    Json,
}

const STDOUT_HEADER: &str = "#### STDOUT ####";
const STDERR_HEADER: &str = "#### STDERR ####";
const BLOCK_FOOTER: &str = "################";

/// Writes reports and errors according to the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Write the execution report.
    ///
    /// In text mode the captured stdout bytes are written unchanged between
    /// the STDOUT header and footer, followed by one line break. Captured
    /// stderr, if any, goes to `err` so the stdout layout never changes.
    /// JSON mode decodes both streams lossily as UTF-8.
    pub fn report(
        &self,
        out: &mut impl Write,
        err: &mut impl Write,
        command: &str,
        report: &ExecutionReport,
    ) -> Result<()> {
        match self.mode {
            OutputMode::Text => {
                writeln!(out, "-> Executing Command:  {command}")?;
                writeln!(out, "{STDOUT_HEADER}")?;
                out.write_all(&report.stdout)?;
                writeln!(out)?;
                writeln!(out, "{BLOCK_FOOTER}")?;
                writeln!(out, "-> ExitCode:  {}", report.exit_code())?;

                if !report.stderr.is_empty() {
                    writeln!(err, "{STDERR_HEADER}")?;
                    err.write_all(&report.stderr)?;
                    writeln!(err)?;
                    writeln!(err, "{BLOCK_FOOTER}")?;
                }
            }
            OutputMode::Json => {
                let stdout = String::from_utf8_lossy(&report.stdout);
                let stderr = String::from_utf8_lossy(&report.stderr);
                let json = JsonReport {
                    command,
                    stdout: &stdout,
                    stderr: &stderr,
                    exit_code: report.exit_code(),
                };
                serde_json::to_writer(&mut *out, &json)?;
                writeln!(out)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Write an infrastructure failure. Nothing goes to stdout.
    ///
    /// Failures of the remote run are prefixed with the phase that failed.
    pub fn error(&self, err: &mut impl Write, error: &Error) -> Result<()> {
        match self.mode {
            OutputMode::Text => match error.phase() {
                Some(phase) => writeln!(err, "Error: {phase} failed: {error}")?,
                None => writeln!(err, "Error: {error}")?,
            },
            OutputMode::Json => {
                let phase = error.phase().map(|p| p.to_string());
                let message = error.to_string();
                let event = JsonEvent {
                    event: "error",
                    phase: phase.as_deref(),
                    message: &message,
                    exit_code: error.exit_code(),
                };
                serde_json::to_writer(&mut *err, &event)?;
                writeln!(err)?;
            }
        }
        err.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    command: &'a str,
    stdout: &'a str,
    stderr: &'a str,
    exit_code: u8,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'a str>,
    message: &'a str,
    exit_code: u8,
}
