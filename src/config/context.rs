//! Per-invocation cluster context

use crate::config::settings::Settings;
use crate::utils::errors::SeiraError;
use anyhow::Result;

/// Cluster every invocation of seira is scoped to
#[derive(Debug, Clone)]
pub struct ClusterContext {
    /// Full cluster name (aliases already resolved)
    pub cluster: String,
    pub project: String,
    /// kubectl context name
    pub kube_context: String,
    pub default_zone: String,
    pub settings: Settings,
}

impl ClusterContext {
    /// Resolve a cluster name or alias against the settings
    pub fn resolve(settings: Settings, cluster: &str) -> Result<Self> {
        let name = settings
            .full_cluster_name_for_shorthand(cluster)
            .ok_or_else(|| SeiraError::unknown_cluster(cluster, &settings.valid_cluster_names()))?;

        let cluster_settings = settings
            .cluster(&name)
            .cloned()
            .ok_or_else(|| SeiraError::unknown_cluster(cluster, &settings.valid_cluster_names()))?;

        Ok(Self {
            cluster: name,
            project: cluster_settings.project,
            kube_context: cluster_settings.cluster,
            default_zone: settings.default_zone.clone(),
            settings,
        })
    }

    /// `internal` runs production workloads, every other cluster is its own environment
    pub fn rails_env(&self) -> &str {
        if self.cluster == "internal" {
            "production"
        } else {
            &self.cluster
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::tests::example;

    #[test]
    fn test_resolve_alias() {
        let context = ClusterContext::resolve(example(), "s").unwrap();
        assert_eq!(context.cluster, "staging");
        assert_eq!(context.project, "hs-staging");
        assert_eq!(context.kube_context, "gke_hs-staging_us-central1-a_staging");
        assert_eq!(context.default_zone, "us-central1-a");
    }

    #[test]
    fn test_resolve_unknown_cluster() {
        let err = ClusterContext::resolve(example(), "prod").unwrap_err();
        let seira = err.downcast::<SeiraError>().unwrap();
        assert!(seira.suggestions.iter().any(|s| s.contains("internal, staging")));
    }

    #[test]
    fn test_rails_env() {
        let internal = ClusterContext::resolve(example(), "internal").unwrap();
        assert_eq!(internal.rails_env(), "production");

        let staging = ClusterContext::resolve(example(), "staging").unwrap();
        assert_eq!(staging.rails_env(), "staging");
    }
}
