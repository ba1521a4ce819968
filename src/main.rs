// ABOUTME: Entry point for the rexec CLI application.
// ABOUTME: Parses flags, runs the remote command, and exits with its status.

mod cli;

use clap::Parser;
use cli::{Cli, normalize_args};
use rexec::error::{INFRASTRUCTURE_FAILURE, Result};
use rexec::output::{Output, OutputMode};
use rexec::runner::{self, SshConnector};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            init_tracing(false);
            if let Err(print_err) = e.print() {
                tracing::error!("failed to write usage error: {}", print_err);
            }
            return ExitCode::from(INFRASTRUCTURE_FAILURE);
        }
    };

    init_tracing(cli.verbose);

    let output = Output::new(if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    });

    match run(&cli, &output).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::debug!("run failed: {:?}", e);
            if let Err(write_err) = output.error(&mut io::stderr(), &e) {
                tracing::error!("failed to write error: {}", write_err);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// Log to stderr; `verbose` overrides `RUST_LOG` with debug.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

/// Run the configured command, print its report, and return its exit code.
async fn run(cli: &Cli, output: &Output) -> Result<u8> {
    let config = cli.to_config()?;

    let report = runner::run(&SshConnector, &config).await?;

    output.report(
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
        &config.command,
        &report,
    )?;

    Ok(report.exit_code())
}
