//! Subcommand implementations
//!
//! Every command returns the text destined for stdout; `main` prints it.
//! Logs and interactive vault output go to stderr.

pub mod console;
pub mod credentials;
pub mod session;
pub mod version;

use crate::cli::{CliError, Commands, CredentialArgs};
use vaultutil_credentials::config::DEFAULT_BUFFER_SECS;
use vaultutil_credentials::{Config, CredentialKind, CredentialManager, ProcessEnv, VaultClient};

/// Settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct Context {
    /// Vault binary to run
    pub vault_bin: String,
    /// Render JSON envelopes instead of shell text
    pub json: bool,
}

impl Context {
    /// A vault client for the configured binary
    #[must_use]
    pub fn client(&self) -> VaultClient {
        VaultClient::new().with_binary(&self.vault_bin)
    }

    /// A manager over the real process environment
    #[must_use]
    pub fn manager(&self, args: &CredentialArgs) -> CredentialManager {
        CredentialManager::new(args.config(), self.client(), ProcessEnv)
    }

    /// A manager for commands that only touch exported credentials
    #[must_use]
    pub fn lease_manager(&self) -> CredentialManager {
        let config = Config::new("", "", "", DEFAULT_BUFFER_SECS);
        CredentialManager::new(config, self.client(), ProcessEnv)
    }
}

/// Run one subcommand.
///
/// # Errors
///
/// Returns the library error mapped onto a [`CliError`].
pub fn execute(command: &Commands, ctx: &Context) -> Result<String, CliError> {
    match command {
        Commands::Aws(args) => {
            credentials::export(&mut ctx.manager(args), CredentialKind::Aws, ctx.json)
        }
        Commands::Azure(args) => {
            credentials::export(&mut ctx.manager(args), CredentialKind::Azure, ctx.json)
        }
        Commands::Revoke { kind } => {
            credentials::revoke(&mut ctx.lease_manager(), *kind, ctx.json)
        }
        Commands::Console(args) => console::execute(&ctx.manager(args), ctx.json),
        Commands::Login { method } => session::login(&ctx.client(), method, ctx.json),
        Commands::Token => session::token(&ctx.client(), ctx.json),
        Commands::Version => Ok(version::execute(ctx.json)),
    }
}

/// Serialize `data` inside an ok envelope
pub(crate) fn json_envelope<T: serde::Serialize>(data: T) -> Result<String, CliError> {
    serde_json::to_string_pretty(&crate::cli::OkEnvelope::new(data))
        .map_err(|e| CliError::other(format!("cannot serialize output: {e}")))
}
