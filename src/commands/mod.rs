//! Command implementations for the seira CLI

pub mod app;
pub mod cluster;
pub mod config;
pub mod db;
pub mod helm_release;
pub mod jobs;
pub mod memcached;
pub mod node_pools;
pub mod pods;
pub mod proxy;
pub mod redis;
pub mod secrets;
pub mod setup;

use crate::config::ClusterContext;
use crate::gcp::gcloud;
use crate::k8s::kubectl;
use crate::utils::errors::SeiraError;
use anyhow::{Context, Result};

/// Point gcloud and kubectl at the cluster
pub fn switch(context: &ClusterContext) -> Result<()> {
    gcloud::activate_configuration(&context.cluster).with_context(|| {
        format!("Failed to activate gcloud configuration {}", context.cluster)
    })?;
    kubectl::use_context(&context.kube_context)
        .with_context(|| format!("Failed to switch kubectl to {}", context.kube_context))?;
    crate::log_debug!("Switched to cluster {}", context.cluster);
    Ok(())
}

/// App must be listed under `applications`
pub fn validate_app(context: &ClusterContext, app: &str) -> Result<()> {
    if context.settings.config_for_app(app).is_none() {
        return Err(SeiraError::unknown_app(app, &context.settings.applications()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::tests::example;

    #[test]
    fn test_validate_app() {
        let context = ClusterContext::resolve(example(), "staging").unwrap();
        assert!(validate_app(&context, "handshake").is_ok());

        let err = validate_app(&context, "nope").unwrap_err();
        let err = err.downcast::<SeiraError>().unwrap();
        assert_eq!(err.message, "Invalid app name specified: 'nope'");
    }
}
