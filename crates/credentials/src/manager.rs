//! Credential manager: cache first, backend on a miss

use crate::backend::VaultClient;
use crate::cache::{self, EnvStore, ProcessEnv};
use crate::config::Config;
use crate::credential::Credential;
use crate::error::Result;
use crate::kind::CredentialKind;
use crate::process::{CommandRunner, SystemRunner};
use tracing::instrument;

/// Hands out credentials, reusing cached ones while they are still fresh
#[derive(Debug)]
pub struct CredentialManager<R = SystemRunner, S = ProcessEnv> {
    config: Config,
    client: VaultClient<R>,
    store: S,
}

impl CredentialManager<SystemRunner, ProcessEnv> {
    /// Create a manager over the `vault` binary and the process environment
    #[must_use]
    pub fn system(config: Config) -> Self {
        Self::new(config, VaultClient::new(), ProcessEnv)
    }
}

impl<R: CommandRunner, S: EnvStore> CredentialManager<R, S> {
    /// Create a manager from its collaborators
    pub fn new(config: Config, client: VaultClient<R>, store: S) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Return a usable credential of `kind`.
    ///
    /// A credential cached in the store is returned as-is while it is not
    /// expired (taking the configured buffer into account). Otherwise, or if
    /// nothing usable is cached, a new one is issued by the backend.
    ///
    /// # Errors
    ///
    /// Backend failures are returned unchanged; there is no retry.
    #[instrument(skip(self), fields(path = %self.config.path(), role = %self.config.role()))]
    pub fn get_credential(&self, kind: CredentialKind) -> Result<Credential> {
        match cache::load(kind, &self.store) {
            Ok(cached) => {
                tracing::debug!("Credentials found in environment - checking expiration");
                if cached.is_expired(self.config.buffer_secs()) {
                    tracing::debug!("Credentials were expired - getting new ones");
                } else {
                    tracing::debug!("Credentials were valid - returning them");
                    return Ok(cached);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "No usable credentials in environment - getting new ones");
            }
        }

        self.client
            .issue_credential(kind, self.config.path(), self.config.role())
    }

    /// Get a credential and write it back into the store.
    ///
    /// # Errors
    ///
    /// Fails like [`get_credential`](Self::get_credential).
    pub fn export(&mut self, kind: CredentialKind) -> Result<Credential> {
        let credential = self.get_credential(kind)?;
        cache::save(&credential, &mut self.store)?;
        Ok(credential)
    }

    /// Revoke the cached credential of `kind` and drop it from the store.
    ///
    /// Returns the revoked credential so callers can report on it.
    ///
    /// # Errors
    ///
    /// Fails if no complete credential is cached or the backend refuses to
    /// revoke the lease; the store is left untouched in both cases.
    #[instrument(skip(self))]
    pub fn revoke(&mut self, kind: CredentialKind) -> Result<Credential> {
        let credential = cache::load(kind, &self.store)?;
        credential.revoke(&self.client)?;
        cache::clear(kind, &mut self.store);
        tracing::info!(lease_id = %credential.lease_id(), "Revoked credentials");
        Ok(credential)
    }

    /// The configuration this manager was built with
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The backend client
    #[must_use]
    pub fn client(&self) -> &VaultClient<R> {
        &self.client
    }

    /// The environment store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
