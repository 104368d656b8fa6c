//! Argument parsing, exit codes and error rendering

use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;
use vaultutil_credentials::backend::DEFAULT_VAULT_BINARY;
use vaultutil_credentials::config::DEFAULT_BUFFER_SECS;
use vaultutil_credentials::{Config, CredentialKind};

use crate::tracing::{TracingConfig, TracingFormat};

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Usage or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Vault or runtime failure exit code
pub const EXIT_BACKEND: i32 = 3;

/// CLI error with exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Usage or configuration error (exit code 2)
    #[error("configuration error: {message}")]
    #[diagnostic(code(vaultutil::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Vault refused or failed a request (exit code 3)
    #[error("vault error: {message}")]
    #[diagnostic(code(vaultutil::cli::backend))]
    Backend {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Anything else (exit code 3)
    #[error("unexpected error: {message}")]
    #[diagnostic(code(vaultutil::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a backend error
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            help: None,
        }
    }

    /// Create an unexpected error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Attach help text
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Backend { message, .. } => Self::Backend { message, help },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Backend { .. } => "backend",
            Self::Other { .. } => "other",
        }
    }
}

/// Map library errors onto CLI categories.
///
/// Problems the user can fix locally (nothing cached, wrong kind, no
/// partition) are configuration errors; everything vault reports is a
/// backend error.
impl From<vaultutil_credentials::Error> for CliError {
    fn from(err: vaultutil_credentials::Error) -> Self {
        use vaultutil_credentials::Error;

        let message = err.to_string();
        match err {
            Error::EnvironmentRead { .. } | Error::EmptyField { .. } => Self::config(message)
                .with_help("Export credentials first, e.g. `eval \"$(vaultutil aws)\"`"),
            Error::UnsupportedKind { .. } => Self::config(message),
            Error::Console { .. } => Self::config(message)
                .with_help("Console links need --partition aws or --partition gov"),
            Error::ExpiringToken { .. } => {
                Self::backend(message).with_help("Run `vaultutil login` to refresh the vault session")
            }
            Error::Spawn { .. } => Self::backend(message)
                .with_help("Check that vault is installed, or pass --vault-bin"),
            Error::CommandFailed { .. } | Error::MalformedResponse { .. } => {
                Self::backend(message)
            }
        }
    }
}

/// Map CLI error to its exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Backend { .. } | CliError::Other { .. } => EXIT_BACKEND,
    }
}

/// Render an error on stderr, or as a JSON envelope on stdout
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": err.to_string(),
        }));

        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Always "ok"
    pub status: &'static str,
    /// The payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Wrap a payload
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Always "error"
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Wrap error details
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Broker short-lived AWS and Azure credentials through the Vault CLI.
///
/// Credential commands print `export` lines meant for `eval "$(vaultutil aws)"`.
#[derive(Parser, Debug)]
#[command(name = "vaultutil")]
#[command(about = "Broker short-lived AWS and Azure credentials through the Vault CLI")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    /// Log output format; `--json` forces json
    #[arg(
        long,
        global = true,
        env = "VAULTUTIL_LOG_FORMAT",
        value_enum,
        help = "Log output format"
    )]
    pub log_format: Option<TracingFormat>,

    /// Filter directive replacing `--level` and `RUST_LOG`
    #[arg(
        long,
        global = true,
        env = "VAULTUTIL_LOG_FILTER",
        help = "Tracing filter directive, e.g. vaultutil_credentials=trace"
    )]
    pub log_filter: Option<String>,

    /// Emit JSON logs and JSON envelopes
    #[arg(long, global = true, help = "Emit JSON logs and JSON envelopes")]
    pub json: bool,

    /// Vault binary to run
    #[arg(
        long,
        global = true,
        env = "VAULTUTIL_VAULT_BIN",
        default_value = DEFAULT_VAULT_BINARY,
        help = "Path or name of the vault binary"
    )]
    pub vault_bin: String,
}

impl Cli {
    /// Logging setup selected by the global flags
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        let mut config = TracingConfig {
            level: self.level.into(),
            filter: self.log_filter.clone(),
            ..TracingConfig::default()
        };
        if self.json {
            config.format = TracingFormat::Json;
        } else if let Some(format) = self.log_format {
            config.format = format;
        }
        config
    }
}

/// Where and how credentials are issued
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CredentialArgs {
    /// Mount path of the secrets engine
    #[arg(long, env = "VAULTUTIL_PATH")]
    pub path: String,

    /// Role to request credentials for
    #[arg(long, env = "VAULTUTIL_ROLE")]
    pub role: String,

    /// AWS partition (aws or gov) used for console links
    #[arg(long, env = "VAULTUTIL_PARTITION", default_value = "aws")]
    pub partition: String,

    /// Seconds before expiry at which cached credentials are renewed
    #[arg(long, env = "VAULTUTIL_BUFFER_SECONDS", default_value_t = DEFAULT_BUFFER_SECS)]
    pub buffer: i64,
}

impl CredentialArgs {
    /// Library configuration for these arguments
    #[must_use]
    pub fn config(&self) -> Config {
        Config::new(&self.partition, &self.role, &self.path, self.buffer)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print AWS credentials as shell exports
    #[command(about = "Print AWS credentials as shell exports")]
    Aws(CredentialArgs),

    /// Print Azure credentials as shell exports
    #[command(about = "Print Azure credentials as shell exports")]
    Azure(CredentialArgs),

    /// Revoke the lease of credentials exported in this shell
    #[command(about = "Revoke exported credentials and print unset lines")]
    Revoke {
        /// Credential kind (aws or azure)
        #[arg(value_parser = parse_kind)]
        kind: CredentialKind,
    },

    /// Print an AWS console sign-in URL
    #[command(about = "Print an AWS console sign-in URL")]
    Console(CredentialArgs),

    /// Log in to vault interactively
    #[command(about = "Log in to vault interactively")]
    Login {
        /// Authentication method passed to `vault login -method`
        #[arg(long, default_value = "oidc")]
        method: String,
    },

    /// Check that the vault session token is still usable
    #[command(about = "Check the remaining lifetime of the vault token")]
    Token,

    /// Show version information
    #[command(about = "Show version information")]
    Version,
}

impl Commands {
    /// Subcommand name used in logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Aws(_) => "aws",
            Self::Azure(_) => "azure",
            Self::Revoke { .. } => "revoke",
            Self::Console(_) => "console",
            Self::Login { .. } => "login",
            Self::Token => "token",
            Self::Version => "version",
        }
    }
}

fn parse_kind(value: &str) -> Result<CredentialKind, String> {
    value.parse()
}

/// Parse the process arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
