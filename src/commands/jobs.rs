//! One-off jobs cloned from a running pod

use crate::k8s::kubectl::{self, ItemList};
use crate::k8s::pods;
use crate::utils::dryrun::is_dry_run;
use crate::utils::progress::WaitProgress;
use crate::utils::random;
use anyhow::{Context, Result, anyhow, bail};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Pod, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::thread;
use std::time::{Duration, Instant};

const POD_START_TIMEOUT: Duration = Duration::from_secs(300);
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const IDLE_COMMAND: &str = "tail -f /dev/null";

/// Options for `jobs run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tier: String,
    pub clear_commands: bool,
    pub detached: bool,
    pub container: Option<String>,
}

pub fn list(app: &str) -> Result<()> {
    kubectl::show_kubectl(&["get", "jobs", "-o", "wide"], Some(app))
}

pub fn delete(app: &str, job: &str) -> Result<()> {
    kubectl::run_kubectl(&["delete", "job", job], Some(app))
}

pub fn logs(app: &str, job: &str) -> Result<()> {
    let target = format!("job/{}", job);
    kubectl::show_kubectl(&["logs", &target, "-c", app], Some(app))
}

fn temp_job_prefix(app: &str) -> String {
    format!("{}-temp-", app)
}

fn existing_temp_suffixes(app: &str) -> Result<Vec<String>> {
    let jobs: ItemList<Job> = kubectl::get_json(&["get", "jobs"], Some(app))?;
    let prefix = temp_job_prefix(app);
    Ok(jobs
        .items
        .iter()
        .filter_map(|job| job.metadata.name.as_deref())
        .filter_map(|name| name.strip_prefix(&prefix))
        .map(str::to_string)
        .collect())
}

/// Build a Job running the spec of `template`
pub fn build_job(app: &str, name: &str, template: &Pod, options: &RunOptions, command: &str) -> Result<Job> {
    let mut spec = template
        .spec
        .clone()
        .ok_or_else(|| anyhow!("Template pod has no spec"))?;

    spec.restart_policy = Some("Never".to_string());
    // Let the scheduler place the job instead of pinning it to the template's node
    spec.node_name = None;

    if options.clear_commands {
        for container in &mut spec.containers {
            container.command = Some(bash_command(IDLE_COMMAND));
        }
    }

    if options.detached {
        let container_name = options.container.as_deref().unwrap_or(app);
        let container = spec
            .containers
            .iter_mut()
            .find(|c| c.name == container_name)
            .ok_or_else(|| anyhow!("Could not find container '{}' to run command in", container_name))?;
        container.command = Some(bash_command(command));
    }

    Ok(Job {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(app.to_string()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(spec),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn bash_command(command: &str) -> Vec<String> {
    vec!["bash".to_string(), "-c".to_string(), command.to_string()]
}

/// Run a command in a temporary copy of a tier's pod
pub fn run(app: &str, options: &RunOptions, command: &[String]) -> Result<()> {
    if command.is_empty() {
        bail!("Please specify a command to run");
    }
    let command = command.join(" ");

    let candidates = pods::fetch_pods(app, Some(&options.tier))?;
    let template = candidates
        .first()
        .ok_or_else(|| anyhow!("Unable to find {} tier pod to copy config from", options.tier))?;

    let name = format!(
        "{}{}",
        temp_job_prefix(app),
        random::unique_name(&existing_temp_suffixes(app)?)?
    );
    let job = build_job(app, &name, template, options, &command)?;

    crate::log_info!("Creating temporary job {}", name);
    kubectl::create_yaml(&serde_json::to_string(&job)?, Some(app))
        .context("Failed to create job")?;

    if options.detached {
        println!("Job {} started. Follow its output with:", name);
        println!("  kubectl logs --namespace={} -f job/{} -c {}", app, name, options.container.as_deref().unwrap_or(app));
        return Ok(());
    }

    if is_dry_run() {
        return Ok(());
    }

    let pod = wait_for_running_pod(app, &name)?;

    crate::log_info!("Connecting to {}...", pod);
    let words = shell_words::split(&command).context("Failed to parse command")?;
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    let result = kubectl::exec_interactive(&pod, &words, Some(app));

    if let Err(e) = kubectl::run_kubectl(&["delete", "job", &name], Some(app)) {
        crate::log_warn!("Failed to clean up job {}: {}", name, e);
    }

    result
}

fn wait_for_running_pod(app: &str, job: &str) -> Result<String> {
    let selector = format!("--selector=job-name={}", job);
    let progress = WaitProgress::new(&format!("job/{}", job), "Running");
    let started = Instant::now();

    loop {
        let list: ItemList<Pod> = kubectl::get_json(&["get", "pods", &selector], Some(app))?;
        if let Some(pod) = list.items.first() {
            match pods::pod_phase(pod) {
                Some("Running") => {
                    progress.finish_success();
                    return Ok(pods::pod_name(pod).to_string());
                }
                Some(phase @ ("Failed" | "Succeeded")) => {
                    progress.finish_error(phase);
                    bail!("Pod for job {} finished with phase {} before it could be attached to", job, phase);
                }
                Some(phase) => progress.update(phase),
                None => {}
            }
        }

        if started.elapsed() > POD_START_TIMEOUT {
            progress.finish_error("timed out");
            bail!(
                "Timed out after {}s waiting for job {} to start",
                POD_START_TIMEOUT.as_secs(),
                job
            );
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE_POD: &str = r#"{
      "apiVersion": "v1",
      "kind": "Pod",
      "metadata": {"name": "handshake-web-7d9f", "namespace": "handshake", "labels": {"app": "handshake", "tier": "web"}},
      "spec": {
        "nodeName": "gke-staging-pool-1-abc",
        "restartPolicy": "Always",
        "containers": [
          {"name": "handshake", "image": "gcr.io/hs/web:abc", "command": ["bundle", "exec", "puma"]},
          {"name": "cloudsql-proxy", "image": "gcr.io/cloudsql-docker/gce-proxy:1.11"}
        ]
      }
    }"#;

    fn options() -> RunOptions {
        RunOptions {
            tier: "web".to_string(),
            clear_commands: false,
            detached: false,
            container: None,
        }
    }

    fn template() -> Pod {
        serde_json::from_str(TEMPLATE_POD).unwrap()
    }

    #[test]
    fn test_build_job_basics() {
        let job = build_job("handshake", "handshake-temp-brave-otter", &template(), &options(), "rails c").unwrap();
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["apiVersion"], "batch/v1");
        assert_eq!(json["kind"], "Job");
        assert_eq!(json["metadata"]["name"], "handshake-temp-brave-otter");
        assert_eq!(json["spec"]["backoffLimit"], 0);

        let spec = &json["spec"]["template"]["spec"];
        assert_eq!(spec["restartPolicy"], "Never");
        assert!(spec.get("nodeName").is_none());
        assert_eq!(spec["containers"][0]["command"][2], "puma");
    }

    #[test]
    fn test_build_job_clear_commands() {
        let opts = RunOptions {
            clear_commands: true,
            ..options()
        };
        let job = build_job("handshake", "job", &template(), &opts, "rails c").unwrap();
        let containers = job.spec.unwrap().template.spec.unwrap().containers;
        for container in containers {
            assert_eq!(
                container.command.unwrap(),
                vec!["bash", "-c", "tail -f /dev/null"]
            );
        }
    }

    #[test]
    fn test_build_job_detached() {
        let opts = RunOptions {
            detached: true,
            ..options()
        };
        let job = build_job("handshake", "job", &template(), &opts, "rake db:migrate").unwrap();
        let containers = job.spec.unwrap().template.spec.unwrap().containers;
        assert_eq!(containers[0].command.as_ref().unwrap(), &vec!["bash", "-c", "rake db:migrate"]);
        assert!(containers[1].command.is_none());
    }

    #[test]
    fn test_build_job_detached_missing_container() {
        let opts = RunOptions {
            detached: true,
            container: Some("worker".to_string()),
            ..options()
        };
        let err = build_job("handshake", "job", &template(), &opts, "rake").unwrap_err();
        assert!(err.to_string().contains("Could not find container 'worker'"));
    }
}
