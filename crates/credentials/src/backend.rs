//! Vault CLI client
//!
//! Builds the `vault` invocations for issuing, revoking and inspecting
//! credentials and decodes their JSON output.

use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::kind::CredentialKind;
use crate::process::{CommandRunner, InteractiveOutput, SystemRunner};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

/// Default name of the vault binary
pub const DEFAULT_VAULT_BINARY: &str = "vault";

/// Minimum remaining session token lifetime, in seconds
pub const MIN_TOKEN_TTL_SECS: i64 = 30;

/// The JSON envelope vault wraps around leased secrets
#[derive(Debug, Clone, Deserialize)]
pub struct LeaseEnvelope {
    /// Request id assigned by vault
    #[serde(default)]
    pub request_id: String,
    /// Lease id, used for revocation
    #[serde(default)]
    pub lease_id: String,
    /// Lease duration in seconds
    #[serde(default)]
    pub lease_duration: i64,
    /// Whether the lease can be renewed
    #[serde(default)]
    pub renewable: bool,
    /// Provider specific secret data
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Warnings attached to the response; not interpreted
    #[serde(default)]
    pub warnings: Value,
}

impl LeaseEnvelope {
    /// Turn the envelope into a credential of `kind` issued now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyField`] if a secret field or the lease id is
    /// missing from the response.
    pub fn into_credential(self, kind: CredentialKind) -> Result<Credential> {
        let secrets: Vec<String> = kind
            .descriptor()
            .fields
            .iter()
            .map(|field| {
                self.data
                    .get(field.response_key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();

        let credential = Credential::new(
            kind,
            secrets,
            Utc::now(),
            self.lease_duration,
            self.lease_id,
        );
        credential.to_env_map()?;
        Ok(credential)
    }
}

/// Missing fields read as a zero ttl
#[derive(Debug, Deserialize)]
struct TokenLookup {
    #[serde(default)]
    data: TokenData,
}

#[derive(Debug, Default, Deserialize)]
struct TokenData {
    #[serde(default)]
    ttl: i64,
}

/// Client for the vault command line tool
#[derive(Debug, Clone)]
pub struct VaultClient<R = SystemRunner> {
    runner: R,
    binary: String,
}

impl VaultClient<SystemRunner> {
    /// Create a client that runs the `vault` binary from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(SystemRunner::new())
    }
}

impl Default for VaultClient<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> VaultClient<R> {
    /// Create a client that runs commands through `runner`
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            binary: DEFAULT_VAULT_BINARY.to_string(),
        }
    }

    /// Use a different vault binary
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// The vault binary this client invokes
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// The backend endpoint that issues credentials of `kind` for `role`
    #[must_use]
    pub fn endpoint(kind: CredentialKind, path: &str, role: &str) -> String {
        format!("{path}/{}/{role}", kind.descriptor().endpoint_segment)
    }

    /// Ask vault for a new credential.
    ///
    /// # Errors
    ///
    /// Propagates command failures, returns [`Error::MalformedResponse`] when
    /// the output is not a lease envelope and [`Error::EmptyField`] when the
    /// envelope lacks a required value.
    #[instrument(skip(self), fields(binary = %self.binary))]
    pub fn issue_credential(
        &self,
        kind: CredentialKind,
        path: &str,
        role: &str,
    ) -> Result<Credential> {
        let endpoint = Self::endpoint(kind, path, role);
        let verb = kind.descriptor().issue_verb;
        tracing::debug!(%endpoint, verb, "Requesting credentials from vault");

        let output = self
            .runner
            .capture(&self.binary, &[verb, &endpoint, "-format=json"])?;

        let envelope: LeaseEnvelope = serde_json::from_slice(output.bytes())
            .map_err(|e| Error::malformed(e, output.bytes()))?;
        tracing::debug!(
            request_id = %envelope.request_id,
            lease_id = %envelope.lease_id,
            lease_duration = envelope.lease_duration,
            renewable = envelope.renewable,
            "Vault issued a lease"
        );

        envelope.into_credential(kind)
    }

    /// Revoke a lease.
    ///
    /// # Errors
    ///
    /// Propagates the failure of the revoke command unchanged.
    #[instrument(skip(self))]
    pub fn revoke_lease(&self, lease_id: &str) -> Result<()> {
        self.runner
            .capture(&self.binary, &["lease", "revoke", lease_id])?;
        tracing::debug!("Lease revoked");
        Ok(())
    }

    /// Make sure the current vault session token is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpiringToken`] when the token has fewer than
    /// [`MIN_TOKEN_TTL_SECS`] seconds left, [`Error::MalformedResponse`] when
    /// the lookup output cannot be decoded, or the command failure.
    #[instrument(skip(self))]
    pub fn check_session_token(&self) -> Result<()> {
        let output = self
            .runner
            .capture(&self.binary, &["token", "lookup", "-format=json"])?;
        let token: TokenLookup = serde_json::from_slice(output.bytes())
            .map_err(|e| Error::malformed(e, output.bytes()))?;

        tracing::debug!(ttl = token.data.ttl, "Vault token lookup");
        if token.data.ttl < MIN_TOKEN_TTL_SECS {
            return Err(Error::ExpiringToken {
                ttl: token.data.ttl,
            });
        }
        Ok(())
    }

    /// Log in to vault interactively with the given auth method.
    ///
    /// # Errors
    ///
    /// Returns the failure of the login command.
    #[instrument(skip(self))]
    pub fn login(&self, method: &str) -> Result<InteractiveOutput> {
        self.runner
            .interactive(&self.binary, &["login", "-method", method])
    }
}
