//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code. Errors raised
//! by the engine keep their own code inside the message.

use std::fmt;
use std::io;

use crate::epistemic::EpistemicError;
use crate::executor::ExecutorError;
use crate::horizon::HorizonError;
use crate::operator::OperatorError;
use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// An input file could not be decoded
    InputError,
    /// The engine refused or failed the command
    CommandFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "NOEMA_CLI_CONFIG_ERROR",
            Self::IoError => "NOEMA_CLI_IO_ERROR",
            Self::InputError => "NOEMA_CLI_INPUT_ERROR",
            Self::CommandFailed => "NOEMA_CLI_COMMAND_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn command_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::CommandFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::input_error(e.to_string())
    }
}

impl From<EpistemicError> for CliError {
    fn from(e: EpistemicError) -> Self {
        Self::command_failed(e.to_string())
    }
}

impl From<OperatorError> for CliError {
    fn from(e: OperatorError) -> Self {
        Self::command_failed(e.to_string())
    }
}

impl From<ExecutorError> for CliError {
    fn from(e: ExecutorError) -> Self {
        Self::command_failed(e.to_string())
    }
}

impl From<HorizonError> for CliError {
    fn from(e: HorizonError) -> Self {
        Self::command_failed(format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
