//! Node management operations

use crate::k8s::kubectl;
use anyhow::{Context, Result};

/// Label GKE puts on every node naming its pool
pub const NODE_POOL_LABEL: &str = "cloud.google.com/gke-nodepool";

/// Node names (`node/<name>`) belonging to a node pool
pub fn nodes_for_pool(pool: &str) -> Result<Vec<String>> {
    let selector = format!("{}={}", NODE_POOL_LABEL, pool);
    let output = kubectl::run_kubectl_output(&["get", "nodes", "-l", &selector, "-o", "name"], None)
        .with_context(|| format!("Failed to list nodes of pool {}", pool))?;

    Ok(parse_node_names(&output))
}

fn parse_node_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mark every node of a pool unschedulable
pub fn cordon_pool(pool: &str) -> Result<()> {
    for node in nodes_for_pool(pool)? {
        kubectl::run_kubectl(&["cordon", &node], None)
            .with_context(|| format!("Failed to cordon node {}", node))?;
    }

    crate::log_info!(
        "Successfully cordoned node pool {}. No new workloads will be placed on {} nodes.",
        pool,
        pool
    );
    Ok(())
}

/// Evict every pod from the nodes of a pool
pub fn drain_pool(pool: &str) -> Result<()> {
    for node in nodes_for_pool(pool)? {
        crate::log_info!("Draining {}", node);
        // --force also evicts unmanaged pods, which should only be temp pods
        kubectl::run_kubectl(
            &[
                "drain",
                "--force",
                "--ignore-daemonsets",
                "--delete-emptydir-data",
                &node,
            ],
            None,
        )
        .with_context(|| format!("Failed to drain node {}", node))?;
    }

    crate::log_info!(
        "Successfully drained all nodes in node pool {}. No pods are running on {} nodes.",
        pool,
        pool
    );
    Ok(())
}
