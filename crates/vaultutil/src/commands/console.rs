//! `console`: AWS console sign-in link

use super::json_envelope;
use crate::cli::CliError;
use serde::Serialize;
use vaultutil_credentials::{
    CommandRunner, ConsoleClient, CredentialKind, CredentialManager, EnvStore,
};

#[derive(Debug, Serialize)]
struct ConsoleLink {
    url: String,
}

/// Print a sign-in URL for the AWS console of the configured partition.
///
/// # Errors
///
/// Fails without a known partition, when vault cannot issue AWS credentials,
/// or when the federation endpoint rejects them.
pub fn execute<R: CommandRunner, S: EnvStore>(
    manager: &CredentialManager<R, S>,
    json: bool,
) -> Result<String, CliError> {
    let console = ConsoleClient::new(manager.config())?;
    let credential = manager.get_credential(CredentialKind::Aws)?;
    let url = console.login_url(&credential)?.to_string();

    if json {
        return json_envelope(ConsoleLink { url });
    }
    Ok(format!("{url}\n"))
}
