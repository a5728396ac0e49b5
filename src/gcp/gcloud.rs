//! Gcloud wrapper utilities

use crate::utils::process;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Build the full argument list, scoping to a project when given
pub fn gcloud_args(args: &[&str], project: Option<&str>) -> Vec<String> {
    let mut full = process::to_args(args);
    if let Some(project) = project {
        full.push(format!("--project={}", project));
    }
    full
}

/// Run a mutating gcloud command
pub fn run_gcloud(args: &[&str], project: Option<&str>) -> Result<()> {
    process::run("gcloud", &gcloud_args(args, project))
}

/// Run gcloud and capture output
pub fn run_gcloud_output(args: &[&str], project: Option<&str>) -> Result<String> {
    process::output("gcloud", &gcloud_args(args, project))
}

/// Run a read-only gcloud command with output to the terminal
pub fn show_gcloud(args: &[&str], project: Option<&str>) -> Result<()> {
    process::show("gcloud", &gcloud_args(args, project))
}

/// Run gcloud with `--format=json` and deserialize the result
pub fn run_gcloud_json<T: DeserializeOwned>(args: &[&str], project: Option<&str>) -> Result<T> {
    let mut full = args.to_vec();
    full.push("--format=json");
    let json = run_gcloud_output(&full, project)?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse output of gcloud {}", args.join(" ")))
}

/// Quiet probe: true when the gcloud command succeeds
pub fn gcloud_succeeds(args: &[&str], project: Option<&str>) -> bool {
    process::succeeds("gcloud", &gcloud_args(args, project))
}

/// Currently configured gcloud project
pub fn current_project() -> Result<String> {
    Ok(run_gcloud_output(&["config", "get-value", "project"], None)?
        .trim()
        .to_string())
}

/// Activate the gcloud configuration of the same name as the cluster
pub fn activate_configuration(name: &str) -> Result<()> {
    // Local gcloud config only, so it also runs in dry-run mode
    show_gcloud(&["config", "configurations", "activate", name], None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcloud_args_with_project() {
        let args = gcloud_args(&["sql", "instances", "list"], Some("hs-staging"));
        assert_eq!(args, vec!["sql", "instances", "list", "--project=hs-staging"]);
    }

    #[test]
    fn test_gcloud_args_without_project() {
        let args = gcloud_args(&["config", "get-value", "project"], None);
        assert_eq!(args, vec!["config", "get-value", "project"]);
    }
}
