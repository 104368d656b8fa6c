//! `login` and `token`: the vault session itself

use super::json_envelope;
use crate::cli::CliError;
use serde::Serialize;
use vaultutil_credentials::{CommandRunner, VaultClient};

#[derive(Debug, Serialize)]
struct Session<'a> {
    method: Option<&'a str>,
    valid: bool,
}

/// Log in to vault. Prompts and output go straight to the terminal.
///
/// # Errors
///
/// Fails when `vault login` exits unsuccessfully.
pub fn login<R: CommandRunner>(
    client: &VaultClient<R>,
    method: &str,
    json: bool,
) -> Result<String, CliError> {
    client.login(method)?;
    tracing::info!(method, "Logged in to vault");

    if json {
        return json_envelope(Session {
            method: Some(method),
            valid: true,
        });
    }
    Ok(String::new())
}

/// Check the remaining lifetime of the vault token.
///
/// # Errors
///
/// Fails when the token lookup fails or the token is about to expire.
pub fn token<R: CommandRunner>(client: &VaultClient<R>, json: bool) -> Result<String, CliError> {
    client.check_session_token()?;

    if json {
        return json_envelope(Session {
            method: None,
            valid: true,
        });
    }
    Ok("vault token is valid\n".to_string())
}
