//! Node pools of a cluster

use crate::config::ClusterContext;
use crate::gcp::container::{self, NewNodePool};
use crate::gcp::gcloud;
use crate::k8s::{kubectl, nodes};
use crate::utils::errors::SeiraError;
use crate::utils::prompt::confirm_or_abort;
use anyhow::{Result, anyhow};

pub fn list(context: &ClusterContext) -> Result<()> {
    gcloud::show_gcloud(
        &["container", "node-pools", "list", "--cluster", &context.cluster],
        Some(&context.project),
    )
}

pub fn list_nodes(pool: &str) -> Result<()> {
    let selector = format!("{}={}", nodes::NODE_POOL_LABEL, pool);
    kubectl::show_kubectl(&["get", "nodes", "-l", &selector], None)
}

pub fn add(context: &ClusterContext, name: &str, copy: &str, node_version: Option<&str>) -> Result<()> {
    let pools = container::list_node_pools(&context.cluster, &context.project)?;
    let template = pools
        .iter()
        .find(|pool| pool.name == copy)
        .ok_or_else(|| anyhow!("Could not find node pool '{}' to copy", copy))?;
    let num_nodes = nodes::nodes_for_pool(copy)?.len();

    container::create_node_pool(
        &context.cluster,
        &context.project,
        &NewNodePool {
            name,
            template,
            num_nodes,
            node_version,
        },
    )?;

    crate::log_info!("Created node pool {} as a copy of {}", name, copy);
    Ok(())
}

fn require_other_pools(context: &ClusterContext) -> Result<()> {
    let pools = container::list_node_pools(&context.cluster, &context.project)?;
    if pools.len() <= 1 {
        return Err(SeiraError::lone_node_pool().into());
    }
    Ok(())
}

pub fn cordon(context: &ClusterContext, pool: &str) -> Result<()> {
    require_other_pools(context)?;
    nodes::cordon_pool(pool)
}

pub fn drain(context: &ClusterContext, pool: &str) -> Result<()> {
    require_other_pools(context)?;
    nodes::drain_pool(pool)
}

pub fn delete(context: &ClusterContext, pool: &str) -> Result<()> {
    require_other_pools(context)?;
    nodes::cordon_pool(pool)?;
    nodes::drain_pool(pool)?;

    confirm_or_abort(
        &format!("Are you sure you want to delete node pool {}?", pool),
        "Delete aborted",
    )?;
    container::delete_node_pool(&context.cluster, &context.project, pool)?;

    crate::log_info!("Deleted node pool {}", pool);
    Ok(())
}
