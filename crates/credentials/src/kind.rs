//! Credential kinds and the descriptors that drive them
//!
//! Both supported providers share one lifecycle. What differs between them is
//! captured in a static [`ProviderDescriptor`]: which secret fields exist,
//! which environment variables they map to, and how the backend is asked for
//! a new lease.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One secret field of a credential kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretField {
    /// Human readable label, used in error messages
    pub label: &'static str,
    /// Key of the field inside the backend response `data` object
    pub response_key: &'static str,
    /// Environment variables populated with this field's value
    pub env_vars: &'static [&'static str],
}

/// Static description of how a credential kind is issued and exported
#[derive(Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Short provider name
    pub name: &'static str,
    /// Backend verb used to issue a credential (`write` or `read`)
    pub issue_verb: &'static str,
    /// Path segment between the secrets path and the role
    pub endpoint_segment: &'static str,
    /// Secret fields in export order
    pub fields: &'static [SecretField],
    /// Variable holding the issue time in unix seconds
    pub start_var: &'static str,
    /// Variable holding the lease duration in seconds
    pub duration_var: &'static str,
    /// Variable holding the backend lease id
    pub lease_var: &'static str,
}

impl ProviderDescriptor {
    /// Every environment variable a credential of this kind owns
    pub fn env_vars(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .flat_map(|field| field.env_vars.iter().copied())
            .chain([self.start_var, self.duration_var, self.lease_var])
    }
}

/// Label used for the revocation handle in validation errors
pub const LEASE_ID_LABEL: &str = "lease id";

static AWS: ProviderDescriptor = ProviderDescriptor {
    name: "aws",
    issue_verb: "write",
    endpoint_segment: "sts",
    fields: &[
        SecretField {
            label: "access key id",
            response_key: "access_key",
            env_vars: &["AWS_ACCESS_KEY_ID"],
        },
        SecretField {
            label: "secret access key",
            response_key: "secret_key",
            env_vars: &["AWS_SECRET_ACCESS_KEY"],
        },
        SecretField {
            label: "session token",
            response_key: "security_token",
            env_vars: &["AWS_SESSION_TOKEN", "AWS_SECURITY_TOKEN"],
        },
    ],
    start_var: "AWS_SESSION_START",
    duration_var: "AWS_SESSION_DURATION",
    lease_var: "AWS_SESSION_VAULT_LEASE_ID",
};

static AZURE: ProviderDescriptor = ProviderDescriptor {
    name: "azure",
    issue_verb: "read",
    endpoint_segment: "creds",
    fields: &[
        SecretField {
            label: "client id",
            response_key: "client_id",
            env_vars: &["ARM_CLIENT_ID"],
        },
        SecretField {
            label: "client secret",
            response_key: "client_secret",
            env_vars: &["ARM_CLIENT_SECRET"],
        },
    ],
    start_var: "ARM_SESSION_START",
    duration_var: "ARM_SESSION_DURATION",
    lease_var: "ARM_SESSION_VAULT_LEASE_ID",
};

/// Supported credential kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// AWS STS credentials (dynamic secret, issued with `vault write`)
    Aws,
    /// Azure service principal credentials (leased secret, issued with `vault read`)
    Azure,
}

impl CredentialKind {
    /// All supported kinds
    pub const ALL: [Self; 2] = [Self::Aws, Self::Azure];

    /// The descriptor for this kind
    #[must_use]
    pub fn descriptor(self) -> &'static ProviderDescriptor {
        match self {
            Self::Aws => &AWS,
            Self::Azure => &AZURE,
        }
    }

    /// Short provider name
    #[must_use]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "azure" | "arm" => Ok(Self::Azure),
            _ => Err(format!("Unknown credential kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("aws".parse::<CredentialKind>().unwrap(), CredentialKind::Aws);
        assert_eq!("AZURE".parse::<CredentialKind>().unwrap(), CredentialKind::Azure);
        assert_eq!("arm".parse::<CredentialKind>().unwrap(), CredentialKind::Azure);
        assert!("gcp".parse::<CredentialKind>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in CredentialKind::ALL {
            assert_eq!(kind.to_string().parse::<CredentialKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_aws_env_vars() {
        let vars: Vec<_> = CredentialKind::Aws.descriptor().env_vars().collect();
        assert_eq!(
            vars,
            [
                "AWS_ACCESS_KEY_ID",
                "AWS_SECRET_ACCESS_KEY",
                "AWS_SESSION_TOKEN",
                "AWS_SECURITY_TOKEN",
                "AWS_SESSION_START",
                "AWS_SESSION_DURATION",
                "AWS_SESSION_VAULT_LEASE_ID",
            ]
        );
    }

    #[test]
    fn test_azure_env_vars() {
        let vars: Vec<_> = CredentialKind::Azure.descriptor().env_vars().collect();
        assert_eq!(
            vars,
            [
                "ARM_CLIENT_ID",
                "ARM_CLIENT_SECRET",
                "ARM_SESSION_START",
                "ARM_SESSION_DURATION",
                "ARM_SESSION_VAULT_LEASE_ID",
            ]
        );
    }

    #[test]
    fn test_issue_verbs() {
        assert_eq!(CredentialKind::Aws.descriptor().issue_verb, "write");
        assert_eq!(CredentialKind::Azure.descriptor().issue_verb, "read");
    }
}
