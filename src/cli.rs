// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Accepts both -flag and --flag spellings and builds the run configuration.

use clap::Parser;
use rexec::config::{Config, DEFAULT_PORT, Target, resolve_password};
use rexec::error::Result;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "rexec")]
#[command(about = "Run one command on a remote host over SSH and exit with its status")]
#[command(version)]
#[command(
    after_help = "Exit status is the remote command's exit status (0-255).\n\
                  255 is also used when rexec itself fails (bad usage, connect, \
                  authentication, channel or timeout); then an `Error:` line is \
                  written to stderr and no report is printed."
)]
pub struct Cli {
    /// Remote host name or IP address
    #[arg(long, default_value = "")]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Login user
    #[arg(long, default_value = "")]
    pub login: String,

    /// Login password (falls back to $REXEC_PASSWORD when empty)
    #[arg(long, default_value = "", hide_default_value = true)]
    pub pwd: String,

    /// Command to run on the remote server
    #[arg(long, default_value = "")]
    pub cmd: String,

    /// Give up on the command after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Give up on connecting and authenticating after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: Option<u64>,

    /// known_hosts file to verify the server key against
    #[arg(long, value_name = "PATH")]
    pub known_hosts: Option<PathBuf>,

    /// Refuse hosts whose key is not already in known_hosts
    #[arg(long)]
    pub strict_host_keys: bool,

    /// Print the report as a single JSON object
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Collect the parsed flags into an immutable configuration.
    pub fn to_config(&self) -> Result<Config> {
        let target = Target::new(&self.host, self.port)?;
        let config = Config::new(target, &self.login, resolve_password(&self.pwd), &self.cmd)?
            .command_timeout(self.timeout.map(Duration::from_secs))
            .connect_timeout(self.connect_timeout.map(Duration::from_secs))
            .known_hosts_path(self.known_hosts.clone())
            .trust_first_connection(!self.strict_host_keys);
        Ok(config)
    }
}

/// Long flags that take a value.
const VALUE_FLAGS: &[&str] = &[
    "host",
    "port",
    "login",
    "pwd",
    "cmd",
    "timeout",
    "connect-timeout",
    "known-hosts",
];

/// Long flags that take no value.
const SWITCH_FLAGS: &[&str] = &["strict-host-keys", "json", "verbose", "help", "version"];

/// Rewrite single-dash long flags (`-host x`, `-port=2222`) to clap's `--host`.
///
/// Values are never rewritten, so `-cmd -host` runs the command `-host`.
pub fn normalize_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut expecting_value = false;
    let mut passthrough = false;

    for (index, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if index == 0 || passthrough || expecting_value {
            expecting_value = false;
            normalized.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };

        if text == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let long = text
            .strip_prefix("--")
            .or_else(|| text.strip_prefix('-'));
        let Some(long) = long else {
            normalized.push(arg);
            continue;
        };

        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };

        if VALUE_FLAGS.contains(&name) {
            expecting_value = !inline_value;
            normalized.push(OsString::from(format!("--{long}")));
        } else if SWITCH_FLAGS.contains(&name) {
            normalized.push(OsString::from(format!("--{long}")));
        } else {
            normalized.push(arg);
        }
    }

    normalized
}
