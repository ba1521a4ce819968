// ABOUTME: Library root for rexec - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod error;
pub mod output;
pub mod runner;
pub mod ssh;
