//! Cloud SQL instances, users and scripted `gcloud sql connect` sessions

use crate::gcp::gcloud;
use crate::utils::prereqs::{self, CommonPrereqs};
use crate::utils::process;
use anyhow::{Context, Result};
use serde::Deserialize;

/// User every instance comes with
pub const ROOT_USER: &str = "postgres";

/// Least-privileged user pgbouncer connects as
pub const PROXY_USER: &str = "proxyuser";

const EXPECT_TIMEOUT_SECS: u32 = 90;
const PSQL_PROMPT: &str = "postgres=>";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlInstance {
    pub name: String,

    #[serde(default)]
    pub ip_addresses: Vec<IpMapping>,

    #[serde(default)]
    pub master_instance_name: Option<String>,

    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    pub ip_address: String,

    #[serde(rename = "type")]
    pub kind: String,
}

impl SqlInstance {
    pub fn private_ip(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| ip.kind == "PRIVATE")
            .map(|ip| ip.ip_address.as_str())
    }

    pub fn is_replica(&self) -> bool {
        self.master_instance_name.is_some()
    }
}

pub fn list_instances(project: &str) -> Result<Vec<SqlInstance>> {
    gcloud::run_gcloud_json(&["sql", "instances", "list"], Some(project))
        .context("Failed to list sql instances")
}

pub fn describe_instance(name: &str, project: &str) -> Result<SqlInstance> {
    gcloud::run_gcloud_json(&["sql", "instances", "describe", name], Some(project))
        .with_context(|| format!("Failed to describe sql instance {}", name))
}

pub fn instance_exists(name: &str, project: &str) -> bool {
    gcloud::gcloud_succeeds(&["sql", "instances", "describe", name], Some(project))
}

pub fn set_user_password(instance: &str, user: &str, password: &str, project: &str) -> Result<()> {
    let instance_arg = format!("--instance={}", instance);
    let password_arg = format!("--password={}", password);
    gcloud::run_gcloud(
        &["sql", "users", "set-password", user, &instance_arg, &password_arg],
        Some(project),
    )
    .with_context(|| format!("Failed to set password for {} on {}", user, instance))
}

pub fn create_user(instance: &str, user: &str, password: &str, project: &str) -> Result<()> {
    let instance_arg = format!("--instance={}", instance);
    let password_arg = format!("--password={}", password);
    gcloud::run_gcloud(
        &["sql", "users", "create", user, &instance_arg, &password_arg],
        Some(project),
    )
    .with_context(|| format!("Failed to create user {} on {}", user, instance))
}

/// Escape text for a double-quoted Tcl word
pub fn tcl_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '[' | ']' | '$') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Expect script logging in as the root user and running each statement
pub fn build_expect_script(
    instance: &str,
    project: &str,
    root_password: &str,
    statements: &[&str],
) -> String {
    let mut script = String::new();
    script.push_str(&format!("set timeout {}\n", EXPECT_TIMEOUT_SECS));
    script.push_str(&format!(
        "spawn gcloud sql connect {} --user={} --project={}\n",
        instance, ROOT_USER, project
    ));
    script.push_str(&format!("expect \"Password for user {}:\"\n", ROOT_USER));
    script.push_str(&send_line(root_password));
    script.push_str(&format!("expect \"{}\"\n", PSQL_PROMPT));

    for statement in statements {
        script.push_str(&send_line(statement));
        script.push_str(&format!("expect \"{}\"\n", PSQL_PROMPT));
    }

    script
}

fn send_line(text: &str) -> String {
    format!("send \"{}\\r\"\n", tcl_escape(text))
}

/// Fail early when `expect` is missing, before any step that depends on it
pub fn require_expect() -> Result<()> {
    prereqs::require(&CommonPrereqs::expect())?;
    Ok(())
}

/// Run statements that change the database. Skipped in dry-run mode.
pub fn execute(instance: &str, project: &str, root_password: &str, statements: &[&str]) -> Result<()> {
    let script = build_expect_script(instance, project, root_password, statements);
    process::pipe("expect", &[], &script)
        .with_context(|| format!("Failed to run statements against {}", instance))
}

/// Run read-only statements and return the session transcript
pub fn query(instance: &str, project: &str, root_password: &str, statements: &[&str]) -> Result<String> {
    let script = build_expect_script(instance, project, root_password, statements);
    process::pipe_output("expect", &[], &script)
        .with_context(|| format!("Failed to query {}", instance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ip() {
        let instance: SqlInstance = serde_json::from_str(
            r#"{
              "name": "handshake-brave-otter",
              "ipAddresses": [
                {"ipAddress": "35.1.2.3", "type": "PRIMARY"},
                {"ipAddress": "10.20.0.3", "type": "PRIVATE"}
              ]
            }"#,
        )
        .unwrap();
        assert_eq!(instance.private_ip(), Some("10.20.0.3"));
        assert!(!instance.is_replica());
    }

    #[test]
    fn test_replica_detection() {
        let instance: SqlInstance = serde_json::from_str(
            r#"{"name": "handshake-kind-emu", "masterInstanceName": "hs-staging:handshake-brave-otter"}"#,
        )
        .unwrap();
        assert!(instance.is_replica());
        assert_eq!(instance.private_ip(), None);
    }

    #[test]
    fn test_tcl_escape() {
        assert_eq!(tcl_escape("plain"), "plain");
        assert_eq!(tcl_escape(r#"say "hi" [now] $x \n"#), r#"say \"hi\" \[now\] \$x \\n"#);
    }

    #[test]
    fn test_build_expect_script() {
        let script = build_expect_script(
            "handshake-brave-otter",
            "hs-staging",
            "s3cret",
            &["ALTER ROLE proxyuser NOCREATEDB NOCREATEROLE;"],
        );
        let expected = "set timeout 90\n\
            spawn gcloud sql connect handshake-brave-otter --user=postgres --project=hs-staging\n\
            expect \"Password for user postgres:\"\n\
            send \"s3cret\\r\"\n\
            expect \"postgres=>\"\n\
            send \"ALTER ROLE proxyuser NOCREATEDB NOCREATEROLE;\\r\"\n\
            expect \"postgres=>\"\n";
        assert_eq!(script, expected);
    }
}
