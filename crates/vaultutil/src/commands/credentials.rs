//! `aws`, `azure` and `revoke`: print shell lines that load or drop credentials

use super::json_envelope;
use crate::cli::CliError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use vaultutil_credentials::{CommandRunner, Credential, CredentialKind, CredentialManager, EnvStore};

#[derive(Debug, Serialize)]
struct Exported<'a> {
    kind: CredentialKind,
    lease_id: &'a str,
    expires_at: Option<DateTime<Utc>>,
    env: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct Revoked<'a> {
    kind: CredentialKind,
    lease_id: &'a str,
    unset: Vec<&'static str>,
}

/// Get credentials of `kind`, keep them in the manager's store and render
/// them as `export` lines.
///
/// # Errors
///
/// Fails when vault cannot issue credentials.
pub fn export<R: CommandRunner, S: EnvStore>(
    manager: &mut CredentialManager<R, S>,
    kind: CredentialKind,
    json: bool,
) -> Result<String, CliError> {
    let credential = manager.export(kind)?;
    render_exports(&credential, json)
}

/// Render a credential for `eval` or as a JSON envelope
///
/// # Errors
///
/// Fails for incomplete credentials.
pub fn render_exports(credential: &Credential, json: bool) -> Result<String, CliError> {
    let env = credential.to_env_map()?;
    if json {
        return json_envelope(Exported {
            kind: credential.kind(),
            lease_id: credential.lease_id(),
            expires_at: credential.expires_at(),
            env,
        });
    }

    let mut output = String::new();
    for (key, value) in &env {
        let _ = writeln!(&mut output, "export {key}=\"{}\"", escape_shell_value(value));
    }
    Ok(output)
}

/// Revoke the lease of the credential cached in the manager's store and
/// render `unset` lines for its variables.
///
/// # Errors
///
/// Fails when nothing complete is cached or vault refuses the revocation.
pub fn revoke<R: CommandRunner, S: EnvStore>(
    manager: &mut CredentialManager<R, S>,
    kind: CredentialKind,
    json: bool,
) -> Result<String, CliError> {
    let credential = manager.revoke(kind)?;

    let unset: Vec<&'static str> = kind.descriptor().env_vars().collect();
    if json {
        return json_envelope(Revoked {
            kind,
            lease_id: credential.lease_id(),
            unset,
        });
    }
    Ok(format!("unset {}\n", unset.join(" ")))
}

/// Escape a value for use inside double quotes in POSIX shells
fn escape_shell_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`")
}
