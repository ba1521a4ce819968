// ABOUTME: Password resolution for password authentication.
// ABOUTME: Prefers the command-line value and falls back to an environment variable.

use secrecy::SecretString;

/// Environment variable consulted when no password is given on the command line.
pub const PASSWORD_ENV: &str = "REXEC_PASSWORD";

/// Resolve the login password.
///
/// A non-empty flag value wins. Otherwise `REXEC_PASSWORD` is used if set,
/// and an empty password if not.
pub fn resolve_password(flag: &str) -> SecretString {
    if !flag.is_empty() {
        return SecretString::new(flag.to_string());
    }
    match std::env::var(PASSWORD_ENV) {
        Ok(value) => {
            tracing::debug!("using password from {}", PASSWORD_ENV);
            SecretString::new(value)
        }
        Err(_) => SecretString::new(String::new()),
    }
}
