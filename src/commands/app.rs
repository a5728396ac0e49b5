//! Bootstrapping, applying and restarting an application

use crate::commands::secrets::Secrets;
use crate::config::ClusterContext;
use crate::k8s::kubectl;
use crate::k8s::pods::selector;
use crate::utils::args::parse_key_values;
use crate::utils::prompt::confirm_or_abort;
use crate::utils::render::{REVISION, RESTARTED_AT_VALUE, ResourceRenderer, TemplateSource};
use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Secrets every app namespace needs, copied from `default`
const SHARED_SECRETS: [&str; 2] = ["cloudsql-credentials", "gcr-secret"];

/// Manifests of an app: `kubernetes/<cluster>/<app>/`
pub fn manifests_dir(cluster: &str, app: &str) -> PathBuf {
    PathBuf::from("kubernetes").join(cluster).join(app)
}

pub fn bootstrap(context: &ClusterContext, app: &str) -> Result<()> {
    crate::log_info!("Creating namespace and main secret...");
    if !kubectl::kubectl_succeeds(&["get", "namespace", app], None) {
        kubectl::run_kubectl(&["create", "namespace", app], None)?;
    }

    let secrets = Secrets::new(app, context);
    let rails_env = context.rails_env().to_string();
    secrets.write_values(
        &secrets.main_secret_name(),
        &BTreeMap::from([
            ("RAILS_ENV".to_string(), rails_env.clone()),
            ("RACK_ENV".to_string(), rails_env),
        ]),
    )?;

    for key in SHARED_SECRETS {
        secrets.copy_secret_across_namespace(key, "default", app)?;
    }

    crate::log_info!("Successfully installed");
    Ok(())
}

/// Lookups backed by the live cluster
struct ClusterSource<'a> {
    app: &'a str,
    secrets: Secrets<'a>,
}

impl TemplateSource for ClusterSource<'_> {
    fn current_replicas(&self, deployment: &str) -> Result<String> {
        kubectl::run_kubectl_output(
            &["get", "deployment", deployment, "-o", "jsonpath={.spec.replicas}"],
            Some(self.app),
        )
    }

    fn secret(&self, key: &str) -> Result<Option<String>> {
        self.secrets.get(key)
    }
}

/// Image tag of the app's web deployment
fn current_revision(app: &str) -> Result<String> {
    let selector_arg = format!("--selector={}", selector(app, Some("web")));
    let image = kubectl::run_kubectl_output(
        &[
            "get",
            "deployment",
            &selector_arg,
            "-o",
            "jsonpath={.items[0].spec.template.spec.containers[0].image}",
        ],
        Some(app),
    )?;

    image_tag(image.trim())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Could not determine the current revision from image '{}'", image.trim()))
}

fn image_tag(image: &str) -> Option<&str> {
    let (_, tag) = image.rsplit_once(':')?;
    // A colon inside the registry host (`host:port/image`) is not a tag
    if tag.is_empty() || tag.contains('/') {
        return None;
    }
    Some(tag)
}

fn render_manifests<S: TemplateSource>(
    source: &S,
    locals: &BTreeMap<String, String>,
    from: &Path,
    to: &Path,
) -> Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(from)
        .with_context(|| format!("Failed to read {}", from.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut renderer = ResourceRenderer::new(source, locals);
    for file in &files {
        let template = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let rendered = renderer
            .render(&template)
            .with_context(|| format!("Failed to render {}", file.display()))?;

        let Some(file_name) = file.file_name() else {
            continue;
        };
        fs::write(to.join(file_name), rendered)
            .with_context(|| format!("Failed to write rendered {}", file.display()))?;
    }

    renderer.print_summary();
    Ok(())
}

pub fn apply(context: &ClusterContext, app: &str) -> Result<()> {
    let revision = match env::var(REVISION) {
        Ok(revision) => revision,
        Err(_) => {
            let current = current_revision(app)?;
            confirm_or_abort(
                &format!("No REVISION specified. Use current deployment revision '{}'?", current),
                "Apply aborted",
            )?;
            current
        }
    };

    if revision.trim().is_empty() {
        bail!("Found blank value for {}. Aborting!", REVISION);
    }

    let mut locals = BTreeMap::from([(REVISION.to_string(), revision)]);
    if let Ok(restarted_at) = env::var(RESTARTED_AT_VALUE) {
        locals.insert(RESTARTED_AT_VALUE.to_string(), restarted_at);
    }

    let source_dir = manifests_dir(&context.cluster, app);
    let destination = tempfile::tempdir().context("Failed to create temp directory")?;
    crate::log_info!(
        "Rendering manifests from {} into {}",
        source_dir.display(),
        destination.path().display()
    );

    let source = ClusterSource {
        app,
        secrets: Secrets::new(app, context),
    };
    render_manifests(&source, &locals, &source_dir, destination.path())?;

    let destination_path = destination.path().to_string_lossy();
    kubectl::run_kubectl(&["apply", "-f", &destination_path], None)
}

pub fn restart(app: &str, tier: Option<&str>) -> Result<()> {
    let selector_arg = format!("--selector={}", selector(app, tier));
    kubectl::run_kubectl(&["rollout", "restart", "deployment", &selector_arg], Some(app))
}

/// `TIER=COUNT` pairs as deployment name and replica count
pub fn scale_targets(app: &str, args: &[String]) -> Result<Vec<(String, u32)>> {
    parse_key_values(args)?
        .into_iter()
        .map(|(tier, count)| {
            let replicas = count
                .parse::<u32>()
                .map_err(|_| anyhow!("Invalid replica count '{}' for tier {}", count, tier))?;
            Ok((format!("{}-{}", app, tier), replicas))
        })
        .collect()
}

pub fn scale(app: &str, args: &[String]) -> Result<()> {
    for (deployment, replicas) in scale_targets(app, args)? {
        let target = format!("deployment/{}", deployment);
        let replicas = format!("--replicas={}", replicas);
        kubectl::run_kubectl(&["scale", &target, &replicas], Some(app))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource;

    impl TemplateSource for StaticSource {
        fn current_replicas(&self, _deployment: &str) -> Result<String> {
            Ok("3".to_string())
        }

        fn secret(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn test_image_tag() {
        assert_eq!(image_tag("gcr.io/hs/handshake:abc1234"), Some("abc1234"));
        assert_eq!(image_tag("localhost:5000/handshake"), None);
        assert_eq!(image_tag("handshake"), None);
        assert_eq!(image_tag("handshake:"), None);
    }

    #[test]
    fn test_manifests_dir() {
        assert_eq!(
            manifests_dir("staging", "handshake"),
            PathBuf::from("kubernetes/staging/handshake")
        );
    }

    #[test]
    fn test_render_manifests() {
        let from = tempfile::tempdir().unwrap();
        let to = tempfile::tempdir().unwrap();
        fs::write(
            from.path().join("web.yaml"),
            "image: gcr.io/hs/web:{{ revision }}\nreplicas: {{ replicas handshake-web }}\n",
        )
        .unwrap();
        fs::create_dir(from.path().join("ignored-dir")).unwrap();

        let locals = BTreeMap::from([(REVISION.to_string(), "abc1234".to_string())]);
        render_manifests(&StaticSource, &locals, from.path(), to.path()).unwrap();

        let rendered = fs::read_to_string(to.path().join("web.yaml")).unwrap();
        assert_eq!(rendered, "image: gcr.io/hs/web:abc1234\nreplicas: 3\n");
        assert!(!to.path().join("ignored-dir").exists());
    }

    #[test]
    fn test_scale_targets() {
        let args = vec!["web=4".to_string(), "worker=2".to_string()];
        let targets = scale_targets("handshake", &args).unwrap();
        assert_eq!(
            targets,
            vec![
                ("handshake-web".to_string(), 4),
                ("handshake-worker".to_string(), 2)
            ]
        );

        assert!(scale_targets("handshake", &["web=lots".to_string()]).is_err());
        assert!(scale_targets("handshake", &["web".to_string()]).is_err());
    }
}
