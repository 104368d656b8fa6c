//! `version`

use serde::Serialize;

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

const INFO: VersionInfo = VersionInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
};

/// Render version information
#[must_use]
pub fn execute(json: bool) -> String {
    if json {
        // A struct of two static strings always serializes
        return super::json_envelope(INFO).unwrap_or_default();
    }
    format!("{} {}\n", INFO.name, INFO.version)
}
