//! Cluster-wide operations: shared secrets, master and node upgrades

use crate::config::ClusterContext;
use crate::gcp::container::{self, NewNodePool, NodePool};
use crate::gcp::gcloud;
use crate::k8s::{kubectl, nodes};
use crate::utils::progress::with_spinner_result;
use crate::utils::prompt::confirm_or_abort;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn bootstrap(dockercfg: &Path, cloudsql_credentials: &Path) -> Result<()> {
    let docker_password = fs::read_to_string(dockercfg)
        .with_context(|| format!("Failed to read {}", dockercfg.display()))?;
    let password_arg = format!("--docker-password={}", docker_password.trim());

    kubectl::run_kubectl(
        &[
            "create",
            "secret",
            "docker-registry",
            "gcr-secret",
            "--docker-username=_json_key",
            &password_arg,
            "--docker-server=https://gcr.io",
            "--docker-email=doesnotmatter@example.com",
        ],
        Some("default"),
    )
    .context("Failed to create gcr-secret")?;

    let credentials_arg = format!("--from-file=credentials.json={}", cloudsql_credentials.display());
    kubectl::run_kubectl(
        &["create", "secret", "generic", "cloudsql-credentials", &credentials_arg],
        Some("default"),
    )
    .context("Failed to create cloudsql-credentials")?;

    crate::log_info!("Created gcr-secret and cloudsql-credentials in the default namespace");
    Ok(())
}

pub fn current() -> Result<()> {
    println!("{}", gcloud::current_project()?);
    println!("{}", kubectl::current_context()?);
    Ok(())
}

/// Pools whose version differs from `version`
pub fn outdated_pools<'a>(pools: &'a [NodePool], version: &str) -> Vec<&'a NodePool> {
    pools
        .iter()
        .filter(|pool| pool.version.as_deref() != Some(version))
        .collect()
}

/// Replacement pool name that collides with none of `taken`
fn replacement_name(pool: &str, taken: &[String]) -> String {
    let taken: Vec<&str> = taken.iter().map(String::as_str).collect();
    container::next_pool_name(pool, &taken)
}

pub fn upgrade_master(context: &ClusterContext, version: &str) -> Result<()> {
    let cluster = container::describe_cluster(&context.cluster, &context.project)?;
    println!("Current master version: {}", cluster.current_master_version);

    if cluster.current_master_version == version {
        crate::log_info!("Master of {} is already at {}", context.cluster, version);
        return Ok(());
    }

    confirm_or_abort(
        &format!(
            "Upgrade the master of {} from {} to {}?",
            context.cluster, cluster.current_master_version, version
        ),
        "Upgrade aborted",
    )?;

    let version_arg = format!("--cluster-version={}", version);
    gcloud::run_gcloud(
        &[
            "container",
            "clusters",
            "upgrade",
            &context.cluster,
            "--master",
            &version_arg,
            "--quiet",
        ],
        Some(&context.project),
    )
    .with_context(|| format!("Failed to upgrade master of {}", context.cluster))?;

    let pools = container::list_node_pools(&context.cluster, &context.project)?;
    let outdated = outdated_pools(&pools, version);
    if !outdated.is_empty() {
        println!("Node pools still on an older version:");
        for pool in outdated {
            println!("  {} ({})", pool.name, pool.version.as_deref().unwrap_or("unknown"));
        }
        println!("Upgrade them with: seira {} cluster upgrade-nodes", context.cluster);
    }
    Ok(())
}

pub fn upgrade_nodes(context: &ClusterContext, pool: Option<&str>) -> Result<()> {
    let cluster = container::describe_cluster(&context.cluster, &context.project)?;
    let master_version = cluster.current_master_version;

    let pools = with_spinner_result("Fetching node pools", "Fetched node pools", || {
        container::list_node_pools(&context.cluster, &context.project)
    })?;

    let targets: Vec<&NodePool> = outdated_pools(&pools, &master_version)
        .into_iter()
        .filter(|candidate| pool.is_none_or(|name| candidate.name == name))
        .collect();

    if targets.is_empty() {
        crate::log_info!("All node pools are already at {}", master_version);
        return Ok(());
    }

    let mut taken: Vec<String> = pools.iter().map(|p| p.name.clone()).collect();

    for old in targets {
        let num_nodes = nodes::nodes_for_pool(&old.name)?.len();
        let new_name = replacement_name(&old.name, &taken);
        taken.push(new_name.clone());
        crate::log_info!(
            "Replacing {} with {} ({} nodes at {})",
            old.name,
            new_name,
            num_nodes,
            master_version
        );

        container::create_node_pool(
            &context.cluster,
            &context.project,
            &NewNodePool {
                name: &new_name,
                template: old,
                num_nodes,
                node_version: Some(&master_version),
            },
        )?;

        nodes::cordon_pool(&old.name)?;
        nodes::drain_pool(&old.name)?;

        confirm_or_abort(
            &format!("Delete node pool {}? All its pods have been moved to {}.", old.name, new_name),
            "Upgrade aborted before deleting the old node pool",
        )?;
        container::delete_node_pool(&context.cluster, &context.project, &old.name)?;
    }

    crate::log_info!("All node pools of {} are at {}", context.cluster, master_version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(name: &str, version: &str) -> NodePool {
        serde_json::from_value(serde_json::json!({ "name": name, "version": version })).unwrap()
    }

    #[test]
    fn test_outdated_pools() {
        let pools = vec![
            pool("default-pool", "1.29.8-gke.1"),
            pool("web-pool-2", "1.30.4-gke.1"),
            pool("worker-pool", "1.29.8-gke.1"),
        ];

        let names: Vec<&str> = outdated_pools(&pools, "1.30.4-gke.1")
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["default-pool", "worker-pool"]);
        assert!(outdated_pools(&pools[1..2], "1.30.4-gke.1").is_empty());
    }

    #[test]
    fn test_replacement_names_do_not_collide() {
        let mut taken = vec!["pool".to_string(), "pool-2".to_string()];

        let first = replacement_name("pool", &taken);
        assert_eq!(first, "pool-3");
        taken.push(first);

        let second = replacement_name("pool-2", &taken);
        assert_eq!(second, "pool-4");
    }
}
