//! End-to-end runs of the vaultutil binary against a fake `vault` script

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_VAULT: &str = r##"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
case "$1" in
  write)
    cat <<'JSON'
{"request_id":"r1","lease_id":"aws/sts/admin/L1","lease_duration":3600,"renewable":false,
 "data":{"access_key":"AK","secret_key":"SK","security_token":"TOK"},"warnings":null}
JSON
    ;;
  read)
    echo '{"lease_id":"azure/creds/reader/L2","lease_duration":3600,"data":{"client_id":"cid","client_secret":"csecret"}}'
    ;;
  lease)
    echo "Success! Revoked lease: $3"
    ;;
  token)
    echo '{"data":{"ttl":15}}'
    ;;
  *)
    echo "unexpected command: $1" >&2
    exit 2
    ;;
esac
"##;

const DENIED_VAULT: &str = "#!/bin/sh
echo 'Error writing data to aws/sts/admin: permission denied' >&2
exit 2
";

const CREDENTIAL_VARS: [&str; 12] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_SECURITY_TOKEN",
    "AWS_SESSION_START",
    "AWS_SESSION_DURATION",
    "AWS_SESSION_VAULT_LEASE_ID",
    "ARM_CLIENT_ID",
    "ARM_CLIENT_SECRET",
    "ARM_SESSION_START",
    "ARM_SESSION_DURATION",
    "ARM_SESSION_VAULT_LEASE_ID",
];

fn install_vault(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("vault");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn vaultutil(vault: &Path) -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("vaultutil");
    for name in CREDENTIAL_VARS {
        cmd.env_remove(name);
    }
    cmd.env_remove("RUST_LOG")
        .env_remove("VAULTUTIL_LOG_FORMAT")
        .env_remove("VAULTUTIL_LOG_FILTER")
        .env_remove("VAULTUTIL_PATH")
        .env_remove("VAULTUTIL_ROLE")
        .env("VAULTUTIL_VAULT_BIN", vault);
    cmd
}

fn calls(dir: &Path) -> String {
    fs::read_to_string(dir.join("calls.log")).unwrap_or_default()
}

#[test]
fn aws_prints_shell_exports() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), FAKE_VAULT);

    vaultutil(&vault)
        .args(["aws", "--path", "aws", "--role", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export AWS_ACCESS_KEY_ID=\"AK\"\n"))
        .stdout(predicate::str::contains(
            "export AWS_SESSION_VAULT_LEASE_ID=\"aws/sts/admin/L1\"\n",
        ));

    assert_eq!(calls(dir.path()), "write aws/sts/admin -format=json\n");
}

#[test]
fn azure_json_envelope() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), FAKE_VAULT);

    let output = vaultutil(&vault)
        .args(["--json", "azure", "--path", "azure", "--role", "reader"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["data"]["lease_id"], "azure/creds/reader/L2");
    assert_eq!(value["data"]["env"]["ARM_CLIENT_SECRET"], "csecret");
}

#[test]
fn fresh_exported_credentials_skip_vault() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), DENIED_VAULT);
    let now = chrono::Utc::now().timestamp().to_string();

    vaultutil(&vault)
        .args(["aws", "--path", "aws", "--role", "admin"])
        .env("AWS_ACCESS_KEY_ID", "cached-ak")
        .env("AWS_SECRET_ACCESS_KEY", "cached-sk")
        .env("AWS_SESSION_TOKEN", "cached-tok")
        .env("AWS_SESSION_START", &now)
        .env("AWS_SESSION_DURATION", "3600")
        .env("AWS_SESSION_VAULT_LEASE_ID", "cached-lease")
        .assert()
        .success()
        .stdout(predicate::str::contains("export AWS_ACCESS_KEY_ID=\"cached-ak\""));
}

#[test]
fn vault_failure_exits_with_backend_code() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), DENIED_VAULT);

    vaultutil(&vault)
        .args(["aws", "--path", "aws", "--role", "admin"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("denied"));
}

#[test]
fn json_mode_reports_error_envelope() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), DENIED_VAULT);

    vaultutil(&vault)
        .args(["--json", "aws", "--path", "aws", "--role", "admin"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains(r#""status":"error""#))
        .stdout(predicate::str::contains(r#""code":"backend""#));
}

#[test]
fn revoke_uses_exported_lease() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), FAKE_VAULT);

    vaultutil(&vault)
        .args(["revoke", "azure"])
        .env("ARM_CLIENT_ID", "cid")
        .env("ARM_CLIENT_SECRET", "csecret")
        .env("ARM_SESSION_START", "1700000000")
        .env("ARM_SESSION_DURATION", "3600")
        .env("ARM_SESSION_VAULT_LEASE_ID", "azure/creds/reader/L2")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("unset ARM_CLIENT_ID "));

    assert_eq!(calls(dir.path()), "lease revoke azure/creds/reader/L2\n");
}

#[test]
fn revoke_without_exported_credentials_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), FAKE_VAULT);

    vaultutil(&vault)
        .args(["revoke", "aws"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("AWS_SESSION_START"));

    assert_eq!(calls(dir.path()), "");
}

#[test]
fn expiring_token_suggests_login() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), FAKE_VAULT);

    vaultutil(&vault)
        .arg("token")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("vaultutil login"));
}

#[test]
fn missing_vault_binary_is_reported() {
    let dir = TempDir::new().unwrap();

    vaultutil(&dir.path().join("no-such-vault"))
        .arg("token")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("failed to start"));
}

#[test]
fn log_filter_flag_routes_debug_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    let vault = install_vault(dir.path(), FAKE_VAULT);

    vaultutil(&vault)
        .args(["aws", "--path", "aws", "--role", "admin"])
        .args(["--log-format", "pretty", "--log-filter", "vaultutil_credentials=debug"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("export "))
        .stderr(predicate::str::contains("getting new ones"));
}

#[test]
fn version_prints_package_version() {
    let dir = TempDir::new().unwrap();

    vaultutil(&dir.path().join("vault"))
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "vaultutil {}\n",
            env!("CARGO_PKG_VERSION")
        )));
}
