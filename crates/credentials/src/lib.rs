//! Short-lived cloud credentials brokered through the Vault CLI
//!
//! This crate shells out to the `vault` binary to obtain leased AWS and Azure
//! credentials, caches them in environment variables, renews them before
//! they run out and revokes them on request.
//!
//! # Lifecycle
//!
//! 1. [`CredentialManager::get_credential`] first looks for a cached
//!    credential in its [`EnvStore`].
//! 2. A cached credential is reused while it is outside the renewal buffer.
//! 3. Otherwise [`VaultClient::issue_credential`] asks vault for a new lease.
//! 4. Callers export [`Credential::to_env_map`] into the environment of the
//!    tools that need it, and eventually [`Credential::revoke`] the lease.
//!
//! ```ignore
//! use vaultutil_credentials::{Config, CredentialKind, CredentialManager};
//!
//! let config = Config::new("aws", "admin", "aws-account", 120);
//! let manager = CredentialManager::system(config);
//! let credential = manager.get_credential(CredentialKind::Aws)?;
//! for (name, value) in credential.to_env_map()? {
//!     println!("export {name}={value}");
//! }
//! ```
//!
//! All operations are synchronous and block while `vault` runs. There is no
//! timeout: a hung `vault` process blocks the caller until it exits.

pub mod backend;
pub mod cache;
pub mod config;
pub mod console;
pub mod credential;
mod error;
pub mod expiry;
pub mod kind;
pub mod manager;
pub mod process;

pub use backend::{LeaseEnvelope, VaultClient};
pub use cache::{EnvStore, MemoryEnv, ProcessEnv};
pub use config::{Config, Partition};
pub use console::{ConsoleClient, ConsoleSession};
pub use credential::Credential;
pub use error::{Error, Result};
pub use kind::{CredentialKind, ProviderDescriptor, SecretField};
pub use manager::CredentialManager;
pub use process::{CapturedOutput, CommandRunner, InteractiveOutput, SystemRunner};
