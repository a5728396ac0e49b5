//! `.seira.yml` configuration

use crate::utils::errors::SeiraError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name, looked up in the current directory
pub const DEFAULT_CONFIG_PATH: &str = ".seira.yml";

/// On-disk layout: everything lives under a top-level `seira` key
#[derive(Debug, Deserialize, Serialize)]
struct SettingsFile {
    seira: Settings,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    pub default_zone: String,

    /// Link template for logs; `%s` is replaced by the resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_link_format: Option<String>,

    #[serde(default)]
    pub applications: Vec<Application>,

    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterSettings>,

    #[serde(default)]
    pub database: DatabaseDefaults,

    #[serde(default)]
    pub charts: Charts,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Application {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClusterSettings {
    /// GCP project hosting the cluster
    pub project: String,

    /// kubectl context name for the cluster
    pub cluster: String,

    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Defaults for `db create`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseDefaults {
    #[serde(default = "default_database_version")]
    pub version: String,

    /// Number of CPUs
    #[serde(default = "default_database_cpu")]
    pub cpu: u32,

    /// GB
    #[serde(default = "default_database_memory")]
    pub memory: u32,

    /// GB
    #[serde(default = "default_database_storage")]
    pub storage: u32,

    #[serde(default = "default_pgbouncer_image")]
    pub pgbouncer_image: String,
}

/// Helm charts for the cache services
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Charts {
    #[serde(default = "default_redis_chart")]
    pub redis: String,

    #[serde(default = "default_memcached_chart")]
    pub memcached: String,
}

// Default value functions
fn default_database_version() -> String {
    "POSTGRES_9_6".to_string()
}

fn default_database_cpu() -> u32 {
    1
}

fn default_database_memory() -> u32 {
    4
}

fn default_database_storage() -> u32 {
    10
}

fn default_pgbouncer_image() -> String {
    "handshake/pgbouncer:0.2.0".to_string()
}

fn default_redis_chart() -> String {
    "stable/redis".to_string()
}

fn default_memcached_chart() -> String {
    "stable/memcached".to_string()
}

impl Default for DatabaseDefaults {
    fn default() -> Self {
        Self {
            version: default_database_version(),
            cpu: default_database_cpu(),
            memory: default_database_memory(),
            storage: default_database_storage(),
            pgbouncer_image: default_pgbouncer_image(),
        }
    }
}

impl Default for Charts {
    fn default() -> Self {
        Self {
            redis: default_redis_chart(),
            memcached: default_memcached_chart(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path or the standard locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::find_config_file()
                .ok_or_else(|| SeiraError::config_not_found(DEFAULT_CONFIG_PATH))?,
        };

        if !path.exists() {
            return Err(SeiraError::config_not_found(&path.display().to_string()).into());
        }

        Self::load_from_file(&path)
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse the contents of a `.seira.yml`
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let file: SettingsFile = serde_yaml::from_str(contents)?;
        Ok(file.seira)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .seira.yml in current directory
    /// 2. ~/.config/seira/config.yml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(DEFAULT_CONFIG_PATH);
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("seira").join("config.yml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    pub fn applications(&self) -> Vec<String> {
        self.applications.iter().map(|app| app.name.clone()).collect()
    }

    pub fn config_for_app(&self, app_name: &str) -> Option<&Application> {
        self.applications.iter().find(|app| app.name == app_name)
    }

    pub fn valid_cluster_names(&self) -> Vec<String> {
        self.clusters.keys().cloned().collect()
    }

    /// Resolve a cluster name or one of its aliases to the full cluster name
    pub fn full_cluster_name_for_shorthand(&self, shorthand: &str) -> Option<String> {
        if self.clusters.contains_key(shorthand) {
            return Some(shorthand.to_string());
        }

        self.clusters
            .iter()
            .find(|(_, cluster)| cluster.aliases.iter().any(|alias| alias == shorthand))
            .map(|(name, _)| name.clone())
    }

    pub fn cluster(&self, cluster: &str) -> Option<&ClusterSettings> {
        self.clusters.get(cluster)
    }

    pub fn project_for_cluster(&self, cluster: &str) -> Option<&str> {
        self.cluster(cluster).map(|c| c.project.as_str())
    }

    /// Fill the configured log link template for a resource
    pub fn log_link(&self, name: &str) -> Option<String> {
        self.log_link_format
            .as_ref()
            .map(|format| format.replace("%s", name))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const EXAMPLE: &str = r#"
seira:
  organization_id: "1234"
  default_zone: us-central1-a
  log_link_format: "https://logs.example.com/?q=%s"
  applications:
    - name: handshake
    - name: tracking
  clusters:
    staging:
      project: hs-staging
      cluster: gke_hs-staging_us-central1-a_staging
      aliases: [s, stage]
    internal:
      project: hs-internal
      cluster: gke_hs-internal_us-central1-a_internal
"#;

    pub(crate) fn example() -> Settings {
        Settings::from_yaml(EXAMPLE).unwrap()
    }

    #[test]
    fn test_settings_deserialization() {
        let settings = example();
        assert_eq!(settings.default_zone, "us-central1-a");
        assert_eq!(settings.organization_id.as_deref(), Some("1234"));
        assert_eq!(settings.applications(), vec!["handshake", "tracking"]);
        assert!(settings.config_for_app("tracking").is_some());
        assert!(settings.config_for_app("other").is_none());
        assert_eq!(settings.valid_cluster_names(), vec!["internal", "staging"]);
        assert_eq!(settings.project_for_cluster("staging"), Some("hs-staging"));
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let settings = example();
        assert_eq!(settings.database.version, "POSTGRES_9_6");
        assert_eq!(settings.database.cpu, 1);
        assert_eq!(settings.database.memory, 4);
        assert_eq!(settings.database.storage, 10);
        assert_eq!(settings.charts.redis, "stable/redis");
        assert_eq!(settings.charts.memcached, "stable/memcached");
    }

    #[test]
    fn test_full_cluster_name_for_shorthand() {
        let settings = example();
        assert_eq!(settings.full_cluster_name_for_shorthand("staging").as_deref(), Some("staging"));
        assert_eq!(settings.full_cluster_name_for_shorthand("s").as_deref(), Some("staging"));
        assert_eq!(settings.full_cluster_name_for_shorthand("stage").as_deref(), Some("staging"));
        assert_eq!(settings.full_cluster_name_for_shorthand("prod"), None);
    }

    #[test]
    fn test_log_link() {
        let settings = example();
        assert_eq!(
            settings.log_link("web-123").as_deref(),
            Some("https://logs.example.com/?q=web-123")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".seira.yml");
        fs::write(&path, EXAMPLE).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.applications().len(), 2);

        let missing = Settings::load(Some(&dir.path().join("nope.yml")));
        assert!(missing.is_err());
    }
}
