//! Pod lookups by label

use crate::k8s::kubectl::{self, ItemList};
use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;

/// Label selector for an app, optionally narrowed to a tier
pub fn selector(app: &str, tier: Option<&str>) -> String {
    match tier {
        Some(tier) => format!("app={},tier={}", app, tier),
        None => format!("app={}", app),
    }
}

/// Pods of an app, optionally narrowed to a tier
pub fn fetch_pods(app: &str, tier: Option<&str>) -> Result<Vec<Pod>> {
    let selector = format!("--selector={}", selector(app, tier));
    let list: ItemList<Pod> = kubectl::get_json(&["get", "pods", &selector], Some(app))?;
    Ok(list.items)
}

pub fn pod_name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or_default()
}

pub fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|status| status.phase.as_deref())
}

/// First pod in the `Running` phase
pub fn first_running(pods: &[Pod]) -> Option<&Pod> {
    pods.iter().find(|pod| pod_phase(pod) == Some("Running"))
}
