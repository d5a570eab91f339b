//! CLI module for Noema
//!
//! Provides command-line access to:
//! - validate: check an operator chain and describe the set it defines
//! - execute: run a chain against a sources file
//! - audit: advisory validation of an events file
//! - gate: events visible under one horizon
//! - verify: restrictivity check for a parent/child horizon pair

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, DEFAULT_CONFIG_PATH};
pub use commands::{audit, execute, gate, run, run_command, validate, verify, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
