//! Pod inspection and interactive shells

use crate::k8s::{kubectl, pods};
use crate::utils::errors::SeiraError;
use anyhow::{Context, Result, bail};

pub fn list(app: &str) -> Result<()> {
    kubectl::show_kubectl(&["get", "pods", "-o", "wide"], Some(app))
}

pub fn delete(app: &str, pod: &str) -> Result<()> {
    kubectl::run_kubectl(&["delete", "pod", pod], Some(app))
}

/// Logs of a pod's container; the container defaults to the app name
pub fn logs(app: &str, pod: &str, container: Option<&str>) -> Result<()> {
    let container = container.unwrap_or(app);
    kubectl::show_kubectl(&["logs", pod, "-c", container], Some(app))
}

pub fn top(app: &str, pod: Option<&str>) -> Result<()> {
    let mut args = vec!["top", "pod"];
    if let Some(pod) = pod {
        args.push(pod);
    }
    args.push("--containers");
    kubectl::show_kubectl(&args, Some(app))
}

/// Split a `--command` value into argv words, honoring shell quoting
pub fn command_words(command: &str) -> Result<Vec<String>> {
    let words = shell_words::split(command).context("Failed to parse command")?;
    if words.is_empty() {
        bail!("No command specified");
    }
    Ok(words)
}

/// Exec into a named pod, or the first running pod of a tier
pub fn connect(app: &str, tier: &str, pod: Option<&str>, command: &str) -> Result<()> {
    let words = command_words(command)?;
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    let target = match pod {
        Some(pod) => pod.to_string(),
        None => {
            let candidates = pods::fetch_pods(app, Some(tier))?;
            pods::first_running(&candidates)
                .map(|pod| pods::pod_name(pod).to_string())
                .ok_or_else(|| SeiraError::pod_not_found(app, tier))?
        }
    };

    crate::log_info!("Connecting to {}...", target);
    kubectl::exec_interactive(&target, &words, Some(app))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_words() {
        assert_eq!(command_words("bash").unwrap(), vec!["bash"]);
        assert_eq!(command_words("rails c").unwrap(), vec!["rails", "c"]);
        assert_eq!(
            command_words("bash -c 'echo $HOME'").unwrap(),
            vec!["bash", "-c", "echo $HOME"]
        );
    }

    #[test]
    fn test_command_words_rejects_bad_input() {
        assert!(command_words("").is_err());
        assert!(command_words("bash -c 'unterminated").is_err());
    }

    #[test]
    fn test_connect_exec_args() {
        let words = command_words("rails c").unwrap();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        assert_eq!(
            kubectl::exec_args("web-1", &words, Some("handshake")),
            vec!["exec", "-ti", "web-1", "--namespace=handshake", "--", "rails", "c"]
        );
    }
}
