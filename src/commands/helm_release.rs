//! Helm-managed cache services (Redis and Memcached) of an app

use crate::config::ClusterContext;
use crate::k8s::helm;
use crate::utils::prompt::confirm_or_abort;
use crate::utils::random;
use anyhow::{Context, Result, anyhow};
use serde_json::json;
use std::fs;

/// A kind of service installed from a Helm chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheService {
    Redis,
    Memcached,
}

/// Resource requests, and a disk for services that persist
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseValues {
    pub memory: String,
    pub cpu: String,
    pub disk: Option<String>,
    /// Name of an existing volume claim to reuse
    pub volume: Option<String>,
}

/// Flags of `create`
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub size: Option<String>,
    pub memory: Option<String>,
    pub cpu: Option<String>,
    pub volume: Option<String>,
}

impl CacheService {
    pub fn label(self) -> &'static str {
        match self {
            CacheService::Redis => "redis",
            CacheService::Memcached => "memcached",
        }
    }

    fn chart(self, context: &ClusterContext) -> &str {
        match self {
            CacheService::Redis => &context.settings.charts.redis,
            CacheService::Memcached => &context.settings.charts.memcached,
        }
    }

    pub fn default_values(self) -> ReleaseValues {
        match self {
            CacheService::Redis => ReleaseValues {
                memory: "50Mi".to_string(),
                cpu: "50m".to_string(),
                disk: Some("1Gi".to_string()),
                volume: None,
            },
            CacheService::Memcached => ReleaseValues {
                memory: "500Mi".to_string(),
                cpu: "50m".to_string(),
                disk: None,
                volume: None,
            },
        }
    }

    /// Preset (memory, disk, cpu) for a size
    fn size_preset(self, size: &str) -> Option<(&'static str, Option<&'static str>, &'static str)> {
        let preset = match (self, size) {
            (CacheService::Redis, "1") => ("50Mi", Some("1Gi"), "50m"),
            (CacheService::Redis, "2") => ("100Mi", Some("1Gi"), "100m"),
            (CacheService::Redis, "3") => ("250Mi", Some("1Gi"), "200m"),
            (CacheService::Redis, "4") => ("500Mi", Some("1Gi"), "500m"),
            (CacheService::Redis, "5") => ("1Gi", Some("5Gi"), "1"),
            (CacheService::Redis, "6") => ("2Gi", Some("5Gi"), "1"),
            (CacheService::Redis, "7") => ("5Gi", Some("5Gi"), "1"),
            (CacheService::Redis, "8") => ("10Gi", Some("20Gi"), "1"),
            (CacheService::Redis, "9") => ("20Gi", Some("40Gi"), "1"),
            (CacheService::Memcached, "1") => ("100Mi", None, "50m"),
            (CacheService::Memcached, "2") => ("250Mi", None, "100m"),
            (CacheService::Memcached, "3") => ("500Mi", None, "200m"),
            (CacheService::Memcached, "4") => ("1Gi", None, "500m"),
            (CacheService::Memcached, "5") => ("2Gi", None, "500m"),
            (CacheService::Memcached, "6") => ("5Gi", None, "1"),
            (CacheService::Memcached, "7") => ("10Gi", None, "2"),
            (CacheService::Memcached, "8") => ("50Gi", None, "4"),
            _ => return None,
        };
        Some(preset)
    }

    /// Values for a new release: defaults, then the size preset, then explicit flags
    pub fn values_for(self, options: &CreateOptions) -> Result<ReleaseValues> {
        let mut values = self.default_values();

        if let Some(size) = &options.size {
            let (memory, disk, cpu) = self
                .size_preset(size)
                .ok_or_else(|| anyhow!("There is no size option '{}'", size))?;
            values.memory = memory.to_string();
            values.cpu = cpu.to_string();
            values.disk = disk.map(str::to_string);
        }
        if let Some(memory) = &options.memory {
            values.memory = memory.clone();
        }
        if let Some(cpu) = &options.cpu {
            values.cpu = cpu.clone();
        }
        if self == CacheService::Redis {
            values.volume = options.volume.clone();
        }

        Ok(values)
    }

    fn prefix(self, app: &str) -> String {
        format!("{}-{}-", app, self.label())
    }

    pub fn release_name(self, app: &str, suffix: &str) -> String {
        format!("{}{}", self.prefix(app), suffix)
    }

    pub fn service_uri(self, release: &str) -> String {
        match self {
            CacheService::Redis => format!("redis://:<password goes here>@{}-redis:6379/0", release),
            CacheService::Memcached => format!("memcached://{}-memcached:11211", release),
        }
    }
}

impl ReleaseValues {
    /// Values document handed to `helm install -f`
    pub fn to_document(&self) -> serde_json::Value {
        let mut document = json!({
            "resources": {
                "requests": {
                    "cpu": self.cpu,
                    "memory": self.memory,
                }
            }
        });

        if self.disk.is_some() || self.volume.is_some() {
            let mut persistence = serde_json::Map::new();
            if let Some(disk) = &self.disk {
                persistence.insert("size".to_string(), json!(disk));
            }
            if let Some(volume) = &self.volume {
                persistence.insert("existingClaim".to_string(), json!(volume));
            }
            document["persistence"] = serde_json::Value::Object(persistence);
        }

        document
    }
}

fn strip_prefixes(releases: &[String], prefix: &str) -> Vec<String> {
    releases
        .iter()
        .filter_map(|name| name.strip_prefix(prefix))
        .map(str::to_string)
        .collect()
}

/// Suffixes of live releases
fn live_suffixes(service: CacheService, app: &str) -> Result<Vec<String>> {
    let prefix = service.prefix(app);
    Ok(strip_prefixes(&helm::releases_with_prefix(app, &prefix)?, &prefix))
}

/// Suffixes a new release must avoid, uninstalled releases included
fn reserved_suffixes(service: CacheService, app: &str) -> Result<Vec<String>> {
    let prefix = service.prefix(app);
    Ok(strip_prefixes(&helm::reserved_releases_with_prefix(app, &prefix)?, &prefix))
}

pub fn list(service: CacheService, app: &str) -> Result<()> {
    for suffix in live_suffixes(service, app)? {
        println!("{}", suffix);
    }
    Ok(())
}

pub fn status(service: CacheService, app: &str, name: &str) -> Result<()> {
    helm::show_helm(&["status", &service.release_name(app, name), "--namespace", app])
}

pub fn create(service: CacheService, context: &ClusterContext, app: &str, options: &CreateOptions) -> Result<()> {
    let values = service.values_for(options)?;
    let suffix = random::unique_name(&reserved_suffixes(service, app)?)?;
    let release = service.release_name(app, &suffix);

    let dir = tempfile::tempdir().context("Failed to create temp directory")?;
    let values_file = dir.path().join(format!("{}-values.json", service.label()));
    fs::write(&values_file, serde_json::to_string_pretty(&values.to_document())?)
        .with_context(|| format!("Failed to write {}", values_file.display()))?;
    let values_path = values_file.to_string_lossy();

    helm::run_helm(&[
        "install",
        &release,
        service.chart(context),
        "--namespace",
        app,
        "--wait",
        "-f",
        &values_path,
    ])
    .with_context(|| format!("Failed to install {}", release))?;

    let label = service.label();
    println!("To get status: 'seira {} {} {} status {}'", context.cluster, app, label, suffix);
    if service == CacheService::Redis {
        println!(
            "To get credentials for storing in app secrets: 'seira {} {} {} credentials {}'",
            context.cluster, app, label, suffix
        );
    }
    println!("Service URI for this {} instance: '{}'.", label, service.service_uri(&release));
    Ok(())
}

/// Last revision listed in `helm history` output
pub fn last_revision(history: &str) -> Option<String> {
    history
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .last()
        .map(str::to_string)
}

pub fn delete(service: CacheService, app: &str, name: &str) -> Result<()> {
    let release = service.release_name(app, name);
    confirm_or_abort(
        &format!(
            "Are you sure you want to delete {}? If any apps are using this {} instance, they will break.",
            release,
            service.label()
        ),
        "Delete aborted",
    )?;

    helm::run_helm(&["uninstall", &release, "--namespace", app, "--keep-history"])
        .context("Delete failed")?;

    println!(
        "Successfully deleted {}. Mistake and seeing errors now? You can rollback easily. Below is last 5 revisions of the now deleted resource.",
        release
    );
    let history = helm::run_helm_output(&["history", &release, "--max", "5", "--namespace", app])?;
    print!("{}", history);
    if let Some(revision) = last_revision(&history) {
        println!("helm rollback {} {} --namespace {}", release, revision, app);
    }
    println!("Docs: https://helm.sh/docs/helm/helm_rollback/");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefixes() {
        let releases = vec![
            "handshake-redis-brave-otter".to_string(),
            "handshake-redis-sad-yak".to_string(),
        ];
        assert_eq!(strip_prefixes(&releases, "handshake-redis-"), vec!["brave-otter", "sad-yak"]);
    }

    #[test]
    fn test_defaults() {
        let redis = CacheService::Redis.values_for(&CreateOptions::default()).unwrap();
        assert_eq!(redis.memory, "50Mi");
        assert_eq!(redis.cpu, "50m");
        assert_eq!(redis.disk.as_deref(), Some("1Gi"));

        let memcached = CacheService::Memcached.values_for(&CreateOptions::default()).unwrap();
        assert_eq!(memcached.memory, "500Mi");
        assert_eq!(memcached.disk, None);
    }

    #[test]
    fn test_size_tables() {
        let options = |size: &str| CreateOptions {
            size: Some(size.to_string()),
            ..Default::default()
        };

        let redis = CacheService::Redis.values_for(&options("9")).unwrap();
        assert_eq!((redis.memory.as_str(), redis.disk.as_deref(), redis.cpu.as_str()), ("20Gi", Some("40Gi"), "1"));

        let memcached = CacheService::Memcached.values_for(&options("7")).unwrap();
        assert_eq!((memcached.memory.as_str(), memcached.cpu.as_str()), ("10Gi", "2"));

        let err = CacheService::Memcached.values_for(&options("9")).unwrap_err();
        assert_eq!(err.to_string(), "There is no size option '9'");
    }

    #[test]
    fn test_explicit_flags_win_over_size() {
        let options = CreateOptions {
            size: Some("2".to_string()),
            memory: Some("300Mi".to_string()),
            volume: Some("redis-data".to_string()),
            ..Default::default()
        };
        let values = CacheService::Redis.values_for(&options).unwrap();
        assert_eq!(values.memory, "300Mi");
        assert_eq!(values.cpu, "100m");

        let document = values.to_document();
        assert_eq!(document["resources"]["requests"]["memory"], "300Mi");
        assert_eq!(document["persistence"]["size"], "1Gi");
        assert_eq!(document["persistence"]["existingClaim"], "redis-data");
    }

    #[test]
    fn test_memcached_document_has_no_persistence() {
        let values = CacheService::Memcached.values_for(&CreateOptions::default()).unwrap();
        assert!(values.to_document().get("persistence").is_none());
    }

    #[test]
    fn test_names_and_uris() {
        let release = CacheService::Redis.release_name("handshake", "brave-otter");
        assert_eq!(release, "handshake-redis-brave-otter");
        assert_eq!(
            CacheService::Redis.service_uri(&release),
            "redis://:<password goes here>@handshake-redis-brave-otter-redis:6379/0"
        );
        assert_eq!(
            CacheService::Memcached.service_uri("handshake-memcached-kind-emu"),
            "memcached://handshake-memcached-kind-emu-memcached:11211"
        );
    }

    #[test]
    fn test_last_revision() {
        let history = "REVISION\tUPDATED\tSTATUS\tCHART\tAPP VERSION\tDESCRIPTION\n\
            1\tMon Jan  1 00:00:00 2024\tsuperseded\tredis-10.5.7\t5.0.7\tInstall complete\n\
            2\tTue Jan  2 00:00:00 2024\tuninstalled\tredis-10.5.7\t5.0.7\tUninstallation complete\n";
        assert_eq!(last_revision(history).as_deref(), Some("2"));
        assert_eq!(last_revision("REVISION\tUPDATED\n"), None);
    }
}
