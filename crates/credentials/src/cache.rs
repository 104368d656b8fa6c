//! Environment-variable credential cache
//!
//! Credentials are cached in environment variables so that repeated
//! invocations from the same shell can reuse a lease instead of asking the
//! backend again. The store is injected through [`EnvStore`]; use
//! [`ProcessEnv`] for the real environment and [`MemoryEnv`] anywhere the
//! process environment must not be touched.

use crate::credential::Credential;
use crate::error::Result;
use crate::kind::CredentialKind;
use std::collections::BTreeMap;

/// A key-value store of environment variables
pub trait EnvStore {
    /// Look up a variable
    fn get(&self, name: &str) -> Option<String>;

    /// Set a variable
    fn set(&mut self, name: &str, value: &str);

    /// Remove a variable
    fn remove(&mut self, name: &str);
}

/// The environment of the current process.
///
/// Writes are only sound while no other thread reads or writes the process
/// environment; this crate performs all of its work on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    #[allow(unsafe_code)]
    fn set(&mut self, name: &str, value: &str) {
        // SAFETY: the broker is single threaded and nothing else in the
        // process mutates the environment concurrently.
        unsafe { std::env::set_var(name, value) };
    }

    #[allow(unsafe_code)]
    fn remove(&mut self, name: &str) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(name) };
    }
}

/// An in-memory environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All variables currently set
    #[must_use]
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnv {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    fn remove(&mut self, name: &str) {
        self.vars.remove(name);
    }
}

/// Read a cached credential of `kind` from `store`.
///
/// # Errors
///
/// Fails the same way as [`Credential::from_environment`].
pub fn load<S: EnvStore + ?Sized>(kind: CredentialKind, store: &S) -> Result<Credential> {
    Credential::from_environment(kind, |name| store.get(name))
}

/// Write `credential` into `store`.
///
/// Nothing is written when the credential is incomplete.
///
/// # Errors
///
/// Returns [`crate::Error::EmptyField`] for incomplete credentials.
pub fn save<S: EnvStore + ?Sized>(credential: &Credential, store: &mut S) -> Result<()> {
    for (name, value) in credential.to_env_map()? {
        store.set(&name, &value);
    }
    tracing::debug!(kind = %credential.kind(), "Cached credentials in environment");
    Ok(())
}

/// Remove every variable owned by `kind` from `store`
pub fn clear<S: EnvStore + ?Sized>(kind: CredentialKind, store: &mut S) {
    for name in kind.descriptor().env_vars() {
        store.remove(name);
    }
}
