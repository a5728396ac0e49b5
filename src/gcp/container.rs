//! GKE clusters and node pools via `gcloud container`

use crate::gcp::gcloud;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub config: NodeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default)]
    pub disk_size_gb: Option<u32>,

    #[serde(default)]
    pub image_type: Option<String>,

    #[serde(default)]
    pub machine_type: Option<String>,

    #[serde(default)]
    pub service_account: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDescription {
    pub name: String,

    pub current_master_version: String,

    #[serde(default)]
    pub current_node_version: Option<String>,
}

/// Options for creating a node pool as a copy of an existing one
#[derive(Debug, Clone)]
pub struct NewNodePool<'a> {
    pub name: &'a str,
    pub template: &'a NodePool,
    pub num_nodes: usize,
    pub node_version: Option<&'a str>,
}

pub fn list_node_pools(cluster: &str, project: &str) -> Result<Vec<NodePool>> {
    gcloud::run_gcloud_json(
        &["container", "node-pools", "list", "--cluster", cluster],
        Some(project),
    )
    .with_context(|| format!("Failed to list node pools of cluster {}", cluster))
}

pub fn describe_cluster(cluster: &str, project: &str) -> Result<ClusterDescription> {
    gcloud::run_gcloud_json(&["container", "clusters", "describe", cluster], Some(project))
        .with_context(|| format!("Failed to describe cluster {}", cluster))
}

/// Arguments for `gcloud container node-pools create`
pub fn create_node_pool_args(cluster: &str, pool: &NewNodePool) -> Vec<String> {
    let config = &pool.template.config;
    let mut args = vec![
        "container".to_string(),
        "node-pools".to_string(),
        "create".to_string(),
        pool.name.to_string(),
        format!("--cluster={}", cluster),
        format!("--num-nodes={}", pool.num_nodes),
    ];

    if let Some(disk_size) = config.disk_size_gb {
        args.push(format!("--disk-size={}", disk_size));
    }
    if let Some(image_type) = &config.image_type {
        args.push(format!("--image-type={}", image_type));
    }
    if let Some(machine_type) = &config.machine_type {
        args.push(format!("--machine-type={}", machine_type));
    }
    if let Some(service_account) = &config.service_account {
        args.push(format!("--service-account={}", service_account));
    }
    if let Some(version) = pool.node_version {
        args.push(format!("--node-version={}", version));
    }

    args
}

pub fn create_node_pool(cluster: &str, project: &str, pool: &NewNodePool) -> Result<()> {
    let args = create_node_pool_args(cluster, pool);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    gcloud::run_gcloud(&args, Some(project))
        .with_context(|| format!("Failed to create node pool {}", pool.name))
}

pub fn delete_node_pool(cluster: &str, project: &str, pool: &str) -> Result<()> {
    gcloud::run_gcloud(
        &["container", "node-pools", "delete", pool, "--cluster", cluster, "--quiet"],
        Some(project),
    )
    .with_context(|| format!("Failed to delete node pool {}", pool))
}

/// Name for the replacement of a pool: `pool` becomes `pool-2`, `pool-2` becomes `pool-3`.
/// Generations already in `taken` are skipped.
pub fn next_pool_name(current: &str, taken: &[&str]) -> String {
    static GENERATION: OnceLock<Regex> = OnceLock::new();
    let pattern =
        GENERATION.get_or_init(|| Regex::new(r"^(.+)-(\d+)$").expect("valid generation regex"));

    let (base, mut generation) = match pattern.captures(current) {
        Some(caps) => match caps[2].parse::<u32>() {
            Ok(generation) => (caps[1].to_string(), generation + 1),
            Err(_) => (current.to_string(), 2),
        },
        None => (current.to_string(), 2),
    };

    loop {
        let candidate = format!("{}-{}", base, generation);
        if !taken.contains(&candidate.as_str()) {
            return candidate;
        }
        generation += 1;
    }
}
