//! Error types for the vaultutil-credentials crate

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for credential brokering operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The external command ran but exited unsuccessfully
    #[error("exit code {exit_code} running command {command}: {output}")]
    #[diagnostic(code(vaultutil::process::failed))]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Exit code of the process, `-1` when it was terminated by a signal
        exit_code: i32,
        /// Trimmed combined stdout and stderr
        output: String,
    },

    /// The external command could not be started
    #[error("failed to start {program}: {source}")]
    #[diagnostic(
        code(vaultutil::process::spawn),
        help("Make sure the vault binary is installed and on PATH")
    )]
    Spawn {
        /// Program that was being started
        program: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The backend answered with something that is not the expected JSON shape
    #[error("malformed response from vault: {message}")]
    #[diagnostic(code(vaultutil::backend::malformed_response))]
    MalformedResponse {
        /// Decoder error message
        message: String,
        /// The raw payload that failed to decode
        payload: String,
    },

    /// A required credential field was empty
    #[error("cannot set env: {field} was empty")]
    #[diagnostic(code(vaultutil::credential::empty_field))]
    EmptyField {
        /// Human readable name of the field
        field: &'static str,
    },

    /// The backend session token is about to expire
    #[error("vault token will expire in less than 30 seconds (ttl: {ttl}s)")]
    #[diagnostic(
        code(vaultutil::backend::expiring_token),
        help("Run `vaultutil login` to refresh the vault session")
    )]
    ExpiringToken {
        /// Remaining token lifetime in seconds
        ttl: i64,
    },

    /// A cached credential could not be read back from the environment
    #[error("error reading {variable} from environment: {message}")]
    #[diagnostic(code(vaultutil::cache::read))]
    EnvironmentRead {
        /// Environment variable that was being read
        variable: &'static str,
        /// Description of the failure
        message: String,
    },

    /// The operation is not available for this credential kind
    #[error("{operation} is not supported for {kind} credentials")]
    #[diagnostic(code(vaultutil::credential::unsupported_kind))]
    UnsupportedKind {
        /// Operation that was requested
        operation: &'static str,
        /// Credential kind name
        kind: &'static str,
    },

    /// Building an AWS console sign-in link failed
    #[error("console login failed: {message}")]
    #[diagnostic(code(vaultutil::console::failed))]
    Console {
        /// Description of the failure
        message: String,
    },
}

impl Error {
    /// Create a command failure from the command line, exit code and raw output
    pub fn command_failed(command: impl Into<String>, exit_code: i32, output: &str) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            output: output.trim().to_string(),
        }
    }

    /// Create a spawn error for a program that failed to start
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Create a decode error carrying the raw payload for diagnostics
    pub fn malformed(message: impl std::fmt::Display, payload: &[u8]) -> Self {
        Self::MalformedResponse {
            message: message.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    /// Create an environment read error
    pub fn environment_read(variable: &'static str, message: impl Into<String>) -> Self {
        Self::EnvironmentRead {
            variable,
            message: message.into(),
        }
    }

    /// Create a console login error
    pub fn console(message: impl Into<String>) -> Self {
        Self::Console {
            message: message.into(),
        }
    }
}

/// Result type for credential brokering operations
pub type Result<T> = std::result::Result<T, Error>;
