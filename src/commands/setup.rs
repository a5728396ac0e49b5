//! Local CLI setup: gcloud configurations and kubectl credentials per cluster

use crate::config::{ClusterContext, Settings};
use crate::gcp::gcloud;
use crate::k8s::kubectl;
use crate::utils::errors::SeiraError;
use crate::utils::prereqs::{CommonPrereqs, Prerequisite};
use anyhow::{Context, Result};

/// Cluster names a setup target expands to
pub fn targets(settings: &Settings, target: &str) -> Result<Vec<String>> {
    if target == "all" {
        return Ok(settings.valid_cluster_names());
    }

    settings
        .full_cluster_name_for_shorthand(target)
        .map(|name| vec![name])
        .ok_or_else(|| SeiraError::unknown_cluster(target, &settings.valid_cluster_names()).into())
}

fn check_prerequisites() -> Result<()> {
    let gcloud = CommonPrereqs::gcloud();
    let kubectl = CommonPrereqs::kubectl();
    let helm = CommonPrereqs::helm();

    let (found, missing) = CommonPrereqs::check_all(&[&gcloud, &kubectl, &helm]);
    crate::log_debug!("Found {}", found.join(", "));

    for (name, hint) in missing {
        if name == kubectl.name() && gcloud.check().is_ok() {
            crate::log_info!("Installing kubectl through gcloud...");
            gcloud::run_gcloud(&["components", "install", "kubectl"], None)
                .context("Failed to install kubectl")?;
            continue;
        }
        return Err(SeiraError::tool_not_found(&name, &hint).into());
    }
    Ok(())
}

/// gcloud commands pointing the active configuration at the cluster's project and zone
fn configure_commands(context: &ClusterContext) -> Vec<Vec<&str>> {
    vec![
        vec!["config", "configurations", "activate", context.cluster.as_str()],
        vec!["auth", "login"],
        vec!["config", "set", "project", context.project.as_str()],
        vec!["config", "set", "compute/zone", context.default_zone.as_str()],
    ]
}

/// Prints the configuration that was just written
fn summary_command(cluster: &str) -> Vec<&str> {
    vec!["config", "configurations", "describe", cluster]
}

fn setup_cluster(context: &ClusterContext) -> Result<()> {
    let name = context.cluster.as_str();
    crate::log_info!("Setting up cluster {}", name);

    if !gcloud::gcloud_succeeds(&["config", "configurations", "describe", name], None) {
        gcloud::run_gcloud(&["config", "configurations", "create", name], None)
            .with_context(|| format!("Failed to create gcloud configuration {}", name))?;
    }

    for command in configure_commands(context) {
        gcloud::run_gcloud(&command, None)
            .with_context(|| format!("gcloud {} failed", command.join(" ")))?;
    }

    gcloud::show_gcloud(&summary_command(name), None)?;

    let zone = format!("--zone={}", context.default_zone);
    gcloud::run_gcloud(
        &["container", "clusters", "get-credentials", name, &zone],
        Some(&context.project),
    )
    .with_context(|| format!("Failed to fetch credentials for {}", name))?;

    println!("kubectl context: {}", kubectl::current_context()?);
    Ok(())
}

pub fn run(settings: &Settings, target: &str) -> Result<()> {
    let clusters = targets(settings, target)?;
    check_prerequisites()?;

    for cluster in clusters {
        let context = ClusterContext::resolve(settings.clone(), &cluster)?;
        setup_cluster(&context)?;
    }

    crate::log_info!("Setup complete");
    Ok(())
}
