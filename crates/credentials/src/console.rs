//! AWS console sign-in links
//!
//! Exchanges temporary AWS credentials for a federation sign-in token and
//! turns that into a URL that opens the AWS console in a browser.

use crate::config::Config;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::kind::CredentialKind;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Issuer reported to the federation endpoint
pub const ISSUER: &str = "https://github.com/vaultutil/vaultutil";

/// The session document the federation endpoint expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSession {
    /// Access key id
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Secret access key
    #[serde(rename = "sessionKey")]
    pub session_key: String,
    /// Session token
    #[serde(rename = "sessionToken")]
    pub session_token: String,
}

impl TryFrom<&Credential> for ConsoleSession {
    type Error = Error;

    fn try_from(credential: &Credential) -> Result<Self> {
        if credential.kind() != CredentialKind::Aws {
            return Err(Error::UnsupportedKind {
                operation: "console login",
                kind: credential.kind().name(),
            });
        }

        let field = |label: &'static str| {
            credential
                .secret(label)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or(Error::EmptyField { field: label })
        };

        Ok(Self {
            session_id: field("access key id")?,
            session_key: field("secret access key")?,
            session_token: field("session token")?,
        })
    }
}

/// The federation endpoint for a partition base URL
#[must_use]
pub fn federation_url(base_url: &str) -> String {
    format!("https://signin.{base_url}/federation")
}

/// URL that exchanges `session` for a sign-in token.
///
/// # Errors
///
/// Returns [`Error::Console`] if the session cannot be encoded or the base
/// URL does not form a valid URL.
pub fn signin_token_request_url(base_url: &str, session: &ConsoleSession) -> Result<Url> {
    let session = serde_json::to_string(session)
        .map_err(|e| Error::console(format!("cannot encode session: {e}")))?;
    Url::parse_with_params(
        &federation_url(base_url),
        [("Action", "getSigninToken"), ("Session", session.as_str())],
    )
    .map_err(|e| Error::console(format!("invalid federation url: {e}")))
}

/// Extract the `SigninToken` from a federation endpoint response.
///
/// # Errors
///
/// Returns [`Error::Console`] if the body is not JSON or has no token.
pub fn parse_signin_token(body: &str) -> Result<String> {
    let parsed: HashMap<String, String> = serde_json::from_str(body)
        .map_err(|e| Error::console(format!("cannot decode signin token response: {e}")))?;
    parsed
        .get("SigninToken")
        .cloned()
        .ok_or_else(|| Error::console("could not get signin token from body"))
}

/// The console login URL for a sign-in token.
///
/// # Errors
///
/// Returns [`Error::Console`] if the base URL does not form a valid URL.
pub fn signin_url(base_url: &str, token: &str) -> Result<Url> {
    let destination = format!("https://console.{base_url}/");
    Url::parse_with_params(
        &federation_url(base_url),
        [
            ("Action", "login"),
            ("Issuer", ISSUER),
            ("Destination", destination.as_str()),
            ("SigninToken", token),
        ],
    )
    .map_err(|e| Error::console(format!("invalid federation url: {e}")))
}

/// Talks to the AWS federation endpoint of one partition
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ConsoleClient {
    /// Create a client for the partition selected in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Console`] when the configuration has no AWS base URL
    /// or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .aws_base_url()
            .ok_or_else(|| Error::console("no AWS partition configured"))?
            .to_string();
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::console(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    /// Exchange `session` for a sign-in token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Console`] on transport errors, non-200 responses or
    /// bodies without a token.
    pub fn fetch_signin_token(&self, session: &ConsoleSession) -> Result<String> {
        let url = signin_token_request_url(&self.base_url, session)?;
        tracing::debug!(endpoint = %federation_url(&self.base_url), "Requesting signin token");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| Error::console(format!("get signin token failed: {e}")))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::console(format!(
                "get signin token failed with code: {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .map_err(|e| Error::console(format!("cannot read signin token response: {e}")))?;
        parse_signin_token(&body)
    }

    /// Build a console login URL for an AWS credential.
    ///
    /// # Errors
    ///
    /// Fails for non-AWS or incomplete credentials and for any federation
    /// endpoint error.
    pub fn login_url(&self, credential: &Credential) -> Result<Url> {
        let session = ConsoleSession::try_from(credential)?;
        let token = self.fetch_signin_token(&session)?;
        signin_url(&self.base_url, &token)
    }
}
