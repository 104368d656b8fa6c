//! Broker configuration

use std::fmt;
use std::str::FromStr;

/// Base URL for the standard AWS partition
pub const BASE_URL_DEFAULT: &str = "aws.amazon.com";

/// Base URL for AWS GovCloud
pub const BASE_URL_GOV_CLOUD: &str = "amazonaws-us-gov.com";

/// Default number of seconds to renew before a lease runs out
pub const DEFAULT_BUFFER_SECS: i64 = 120;

/// AWS partition, which decides the console base URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    /// The standard commercial partition
    Aws,
    /// AWS GovCloud
    Gov,
    /// Anything else; no console endpoint is known
    Other(String),
}

impl Partition {
    /// The console base URL for this partition, if one is known
    #[must_use]
    pub fn base_url(&self) -> Option<&'static str> {
        match self {
            Self::Aws => Some(BASE_URL_DEFAULT),
            Self::Gov => Some(BASE_URL_GOV_CLOUD),
            Self::Other(_) => None,
        }
    }
}

impl FromStr for Partition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "aws" => Self::Aws,
            "gov" => Self::Gov,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aws => f.write_str("aws"),
            Self::Gov => f.write_str("gov"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Immutable settings shared by every credential operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    aws_base_url: Option<String>,
    path: String,
    role: String,
    buffer_secs: i64,
}

impl Config {
    /// Create a configuration.
    ///
    /// `partition` selects the AWS console base URL: `"aws"` and `"gov"` are
    /// recognised, anything else leaves it unset.
    #[must_use]
    pub fn new(
        partition: &str,
        role: impl Into<String>,
        path: impl Into<String>,
        buffer_secs: i64,
    ) -> Self {
        let Ok(partition) = partition.parse::<Partition>();
        Self {
            aws_base_url: partition.base_url().map(str::to_string),
            path: path.into(),
            role: role.into(),
            buffer_secs,
        }
    }

    /// Base URL used to build AWS console links
    #[must_use]
    pub fn aws_base_url(&self) -> Option<&str> {
        self.aws_base_url.as_deref()
    }

    /// Secrets engine mount path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Backend role name
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Seconds before expiry at which credentials are renewed
    #[must_use]
    pub fn buffer_secs(&self) -> i64 {
        self.buffer_secs
    }
}
