//! The leased credential entity and its environment encoding

use crate::backend::VaultClient;
use crate::error::{Error, Result};
use crate::expiry;
use crate::kind::{CredentialKind, LEASE_ID_LABEL};
use crate::process::CommandRunner;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;

/// A short-lived credential issued by the secrets backend.
///
/// Secret values are held in [`SecretString`] and never appear in `Debug`
/// output. The environment encoding is not stored; [`Credential::to_env_map`]
/// recomputes it from the fields every time it is called.
#[derive(Clone)]
pub struct Credential {
    kind: CredentialKind,
    secrets: Vec<SecretString>,
    created: DateTime<Utc>,
    duration_secs: i64,
    lease_id: String,
}

impl Credential {
    /// Create a credential from its parts.
    ///
    /// `secrets` follows the field order of the kind's descriptor; missing
    /// trailing values are treated as empty and rejected by
    /// [`to_env_map`](Self::to_env_map).
    pub fn new<I, S>(
        kind: CredentialKind,
        secrets: I,
        created: DateTime<Utc>,
        duration_secs: i64,
        lease_id: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field_count = kind.descriptor().fields.len();
        let mut secrets: Vec<SecretString> = secrets
            .into_iter()
            .take(field_count)
            .map(|value| SecretString::from(value.into()))
            .collect();
        secrets.resize_with(field_count, || SecretString::from(String::new()));

        Self {
            kind,
            secrets,
            created,
            duration_secs,
            lease_id: lease_id.into(),
        }
    }

    /// Rebuild a credential from its own environment encoding.
    ///
    /// `get` looks up a variable by name. The start and duration variables
    /// must be present and numeric; the remaining fields are validated the
    /// same way [`to_env_map`](Self::to_env_map) validates them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvironmentRead`] when the start or duration variable
    /// is missing or not an integer, and [`Error::EmptyField`] when a secret
    /// field or the lease id is empty.
    pub fn from_environment<F>(kind: CredentialKind, get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let descriptor = kind.descriptor();
        let created_secs = read_integer(&get, descriptor.start_var)?;
        let duration_secs = read_integer(&get, descriptor.duration_var)?;
        let created = Utc
            .timestamp_opt(created_secs, 0)
            .single()
            .ok_or_else(|| {
                Error::environment_read(descriptor.start_var, "timestamp out of range")
            })?;

        let secrets = descriptor
            .fields
            .iter()
            .map(|field| get(field.env_vars[0]).unwrap_or_default());
        let lease_id = get(descriptor.lease_var).unwrap_or_default();

        let credential = Self::new(kind, secrets, created, duration_secs, lease_id);
        credential.validate()?;
        Ok(credential)
    }

    /// Compute the environment variables that export this credential.
    ///
    /// The result is deterministic: the same credential always yields the
    /// same map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyField`] naming the first empty secret field, or
    /// the lease id, without producing a partial map.
    pub fn to_env_map(&self) -> Result<BTreeMap<String, String>> {
        self.validate()?;
        let descriptor = self.kind.descriptor();

        let mut env = BTreeMap::new();
        for (field, value) in descriptor.fields.iter().zip(&self.secrets) {
            for name in field.env_vars {
                env.insert((*name).to_string(), value.expose_secret().to_string());
            }
        }
        env.insert(descriptor.lease_var.to_string(), self.lease_id.clone());
        env.insert(
            descriptor.duration_var.to_string(),
            self.duration_secs.to_string(),
        );
        env.insert(
            descriptor.start_var.to_string(),
            self.created.timestamp().to_string(),
        );

        tracing::trace!(
            kind = %self.kind,
            variables = ?env.keys().collect::<Vec<_>>(),
            "Built credential environment"
        );
        Ok(env)
    }

    fn validate(&self) -> Result<()> {
        let descriptor = self.kind.descriptor();
        for (field, value) in descriptor.fields.iter().zip(&self.secrets) {
            if value.expose_secret().is_empty() {
                return Err(Error::EmptyField { field: field.label });
            }
        }
        if self.lease_id.is_empty() {
            return Err(Error::EmptyField {
                field: LEASE_ID_LABEL,
            });
        }
        Ok(())
    }

    /// Whether the credential is expired now, renewing `buffer_secs` early
    #[must_use]
    pub fn is_expired(&self, buffer_secs: i64) -> bool {
        expiry::is_expired(self.created, self.duration_secs, buffer_secs)
    }

    /// Whether the credential is expired at `now`, renewing `buffer_secs` early
    #[must_use]
    pub fn is_expired_at(&self, buffer_secs: i64, now: DateTime<Utc>) -> bool {
        expiry::is_expired_at(self.created, self.duration_secs, buffer_secs, now)
    }

    /// Revoke the backend lease behind this credential.
    ///
    /// The credential itself stays usable as a value; callers should discard
    /// it once the lease is gone.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the backend revoke command.
    pub fn revoke<R: CommandRunner>(&self, client: &VaultClient<R>) -> Result<()> {
        client.revoke_lease(&self.lease_id)
    }

    /// The credential kind
    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// The value of the secret field with the given label, if the kind has one
    #[must_use]
    pub fn secret(&self, label: &str) -> Option<&str> {
        self.kind
            .descriptor()
            .fields
            .iter()
            .position(|field| field.label == label)
            .map(|index| self.secrets[index].expose_secret())
    }

    /// Issue time
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Validity window in seconds, as reported by the backend
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        self.duration_secs
    }

    /// Backend lease id
    #[must_use]
    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }

    /// The moment the lease runs out, ignoring any renewal buffer.
    ///
    /// `None` when the duration reaches past the range of [`DateTime`].
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.duration_secs)
            .and_then(|duration| self.created.checked_add_signed(duration))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("secrets", &"[REDACTED]")
            .field("created", &self.created)
            .field("duration_secs", &self.duration_secs)
            .field("lease_id", &self.lease_id)
            .finish()
    }
}

fn read_integer<F>(get: &F, variable: &'static str) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get(variable).ok_or_else(|| Error::environment_read(variable, "not set"))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|e| Error::environment_read(variable, format!("invalid integer {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn aws(access: &str, secret: &str, token: &str, lease: &str) -> Credential {
        Credential::new(
            CredentialKind::Aws,
            [access, secret, token],
            Utc.timestamp_opt(1, 0).unwrap(),
            30,
            lease,
        )
    }

    fn azure(id: &str, secret: &str, lease: &str) -> Credential {
        Credential::new(
            CredentialKind::Azure,
            [id, secret],
            Utc.timestamp_opt(1, 0).unwrap(),
            30,
            lease,
        )
    }

    fn lookup(env: &BTreeMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
        move |name| env.get(name).cloned()
    }

    #[test]
    fn test_aws_env_map() {
        let env = aws("SOMEACCESSKEYID", "supersecret", "token", "vaultleaseid")
            .to_env_map()
            .unwrap();
        let expected: BTreeMap<String, String> = [
            ("AWS_ACCESS_KEY_ID", "SOMEACCESSKEYID"),
            ("AWS_SECRET_ACCESS_KEY", "supersecret"),
            ("AWS_SESSION_TOKEN", "token"),
            ("AWS_SECURITY_TOKEN", "token"),
            ("AWS_SESSION_START", "1"),
            ("AWS_SESSION_VAULT_LEASE_ID", "vaultleaseid"),
            ("AWS_SESSION_DURATION", "30"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(env, expected);
    }

    #[test]
    fn test_aws_empty_fields_are_named() {
        let cases = [
            (aws("", "supersecret", "token", "lease"), "access key id"),
            (aws("AK", "", "token", "lease"), "secret access key"),
            (aws("AK", "supersecret", "", "lease"), "session token"),
            (aws("AK", "supersecret", "token", ""), "lease id"),
        ];
        for (credential, expected) in cases {
            match credential.to_env_map() {
                Err(Error::EmptyField { field }) => assert_eq!(field, expected),
                other => panic!("expected empty {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_azure_env_map() {
        let env = azure("id", "supersecret", "vaultleaseid").to_env_map().unwrap();
        assert_eq!(env.len(), 5);
        assert_eq!(env["ARM_CLIENT_ID"], "id");
        assert_eq!(env["ARM_CLIENT_SECRET"], "supersecret");
        assert_eq!(env["ARM_SESSION_START"], "1");
        assert_eq!(env["ARM_SESSION_DURATION"], "30");
        assert_eq!(env["ARM_SESSION_VAULT_LEASE_ID"], "vaultleaseid");
    }

    #[test]
    fn test_azure_empty_fields_are_named() {
        let cases = [
            (azure("", "supersecret", "lease"), "client id"),
            (azure("id", "", "lease"), "client secret"),
            (azure("id", "supersecret", ""), "lease id"),
        ];
        for (credential, expected) in cases {
            assert!(matches!(
                credential.to_env_map(),
                Err(Error::EmptyField { field }) if field == expected
            ));
        }
    }

    #[test]
    fn test_missing_secrets_are_padded_and_rejected() {
        let credential = Credential::new(
            CredentialKind::Aws,
            ["AK"],
            Utc::now(),
            30,
            "lease",
        );
        assert!(matches!(
            credential.to_env_map(),
            Err(Error::EmptyField {
                field: "secret access key"
            })
        ));
    }

    #[test]
    fn test_env_map_is_deterministic() {
        let credential = aws("AK", "SK", "TOK", "L1");
        assert_eq!(credential.to_env_map().unwrap(), credential.to_env_map().unwrap());
    }

    #[test]
    fn test_round_trip_through_environment() {
        let created = Utc.timestamp_opt(1_700_000_123, 0).unwrap();
        let original = Credential::new(CredentialKind::Aws, ["AK", "SK", "TOK"], created, 900, "L1");
        let env = original.to_env_map().unwrap();

        let restored = Credential::from_environment(CredentialKind::Aws, lookup(&env)).unwrap();
        assert_eq!(restored.created(), created);
        assert_eq!(restored.duration_secs(), 900);
        assert_eq!(restored.lease_id(), "L1");
        assert_eq!(restored.secret("session token"), Some("TOK"));
        assert_eq!(restored.to_env_map().unwrap(), env);
    }

    #[test]
    fn test_from_environment_missing_start() {
        let env = BTreeMap::from([("AWS_SESSION_DURATION".to_string(), "30".to_string())]);
        match Credential::from_environment(CredentialKind::Aws, lookup(&env)) {
            Err(Error::EnvironmentRead { variable, .. }) => {
                assert_eq!(variable, "AWS_SESSION_START");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_environment_non_numeric_duration() {
        let env = BTreeMap::from([
            ("ARM_SESSION_START".to_string(), "1".to_string()),
            ("ARM_SESSION_DURATION".to_string(), "soon".to_string()),
        ]);
        assert!(matches!(
            Credential::from_environment(CredentialKind::Azure, lookup(&env)),
            Err(Error::EnvironmentRead {
                variable: "ARM_SESSION_DURATION",
                ..
            })
        ));
    }

    #[test]
    fn test_from_environment_missing_secret() {
        let mut env = azure("id", "secret", "lease").to_env_map().unwrap();
        env.remove("ARM_CLIENT_SECRET");
        assert!(matches!(
            Credential::from_environment(CredentialKind::Azure, lookup(&env)),
            Err(Error::EmptyField {
                field: "client secret"
            })
        ));
    }

    #[test]
    fn test_expiry_delegates_to_policy() {
        let created = Utc.timestamp_opt(10_000, 0).unwrap();
        let credential =
            Credential::new(CredentialKind::Azure, ["id", "secret"], created, 100, "lease");
        assert!(!credential.is_expired_at(30, created));
        assert!(!credential.is_expired_at(30, created + Duration::seconds(70)));
        assert!(credential.is_expired_at(30, created + Duration::seconds(71)));
        assert_eq!(credential.expires_at(), Some(created + Duration::seconds(100)));
    }

    #[test]
    fn test_unbounded_duration_has_no_expiry_instant() {
        let env: BTreeMap<String, String> = [
            ("ARM_CLIENT_ID", "id"),
            ("ARM_CLIENT_SECRET", "secret"),
            ("ARM_SESSION_START", "1700000000"),
            ("ARM_SESSION_DURATION", "9223372036854775807"),
            ("ARM_SESSION_VAULT_LEASE_ID", "lease"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let credential =
            Credential::from_environment(CredentialKind::Azure, lookup(&env)).unwrap();
        assert_eq!(credential.expires_at(), None);
        assert!(!credential.is_expired(120));

        let negative = Credential::new(
            CredentialKind::Azure,
            ["id", "secret"],
            Utc::now(),
            i64::MIN,
            "lease",
        );
        assert_eq!(negative.expires_at(), None);
        assert!(negative.is_expired(0));
    }

    #[test]
    fn test_fresh_credential_not_expired() {
        let credential =
            Credential::new(CredentialKind::Azure, ["id", "secret"], Utc::now(), 100, "lease");
        assert!(!credential.is_expired(10));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", aws("AKIAEXAMPLE", "hunter2", "tok", "lease"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("AKIAEXAMPLE"));
    }

    #[test]
    fn test_secret_lookup_by_label() {
        let credential = azure("id", "secret", "lease");
        assert_eq!(credential.secret("client id"), Some("id"));
        assert_eq!(credential.secret("session token"), None);
    }
}
