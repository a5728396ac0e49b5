//! Kubectl wrapper utilities

use crate::utils::process;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// `kubectl get <resource> -o json` with a selector returns a `List`
#[derive(Debug, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Build the full argument list, scoping to the app namespace when given
pub fn kubectl_args(args: &[&str], namespace: Option<&str>) -> Vec<String> {
    let mut full = process::to_args(args);
    if let Some(ns) = namespace {
        full.push(format!("--namespace={}", ns));
    }
    full
}

/// Run a mutating kubectl command in an optional namespace
pub fn run_kubectl(args: &[&str], namespace: Option<&str>) -> Result<()> {
    process::run("kubectl", &kubectl_args(args, namespace))
}

/// Run kubectl and capture output
pub fn run_kubectl_output(args: &[&str], namespace: Option<&str>) -> Result<String> {
    process::output("kubectl", &kubectl_args(args, namespace))
}

/// Run a read-only kubectl command, output straight to the terminal
pub fn show_kubectl(args: &[&str], namespace: Option<&str>) -> Result<()> {
    process::show("kubectl", &kubectl_args(args, namespace))
}

/// `kubectl get ... -o json`, deserialized
pub fn get_json<T: DeserializeOwned>(args: &[&str], namespace: Option<&str>) -> Result<T> {
    let mut full = args.to_vec();
    full.extend(["-o", "json"]);
    let json = run_kubectl_output(&full, namespace)?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse output of kubectl {}", args.join(" ")))
}

/// Whether a resource exists
pub fn kubectl_succeeds(args: &[&str], namespace: Option<&str>) -> bool {
    process::succeeds("kubectl", &kubectl_args(args, namespace))
}

/// Create resources from a document on stdin
pub fn create_yaml(yaml: &str, namespace: Option<&str>) -> Result<()> {
    process::pipe("kubectl", &kubectl_args(&["create", "-f", "-"], namespace), yaml)
}

/// Replace resources from a document on stdin
pub fn replace_yaml(yaml: &str, namespace: Option<&str>) -> Result<()> {
    process::pipe("kubectl", &kubectl_args(&["replace", "-f", "-"], namespace), yaml)
}

/// Arguments for an interactive `kubectl exec`. The namespace goes before `--`.
pub fn exec_args(pod: &str, command: &[&str], namespace: Option<&str>) -> Vec<String> {
    let mut args = kubectl_args(&["exec", "-ti", pod], namespace);
    args.push("--".to_string());
    args.extend(command.iter().map(|arg| arg.to_string()));
    args
}

/// Interactive `kubectl exec` into a pod
pub fn exec_interactive(pod: &str, command: &[&str], namespace: Option<&str>) -> Result<()> {
    process::run("kubectl", &exec_args(pod, command, namespace))
}

/// Current kubectl context name
pub fn current_context() -> Result<String> {
    Ok(run_kubectl_output(&["config", "current-context"], None)?
        .trim()
        .to_string())
}

/// Switch kubectl to a context
pub fn use_context(context: &str) -> Result<()> {
    // Local kubeconfig only, so it also runs in dry-run mode
    show_kubectl(&["config", "use-context", context], None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubectl_args_with_namespace() {
        let args = kubectl_args(&["get", "pods", "-o", "wide"], Some("handshake"));
        assert_eq!(args, vec!["get", "pods", "-o", "wide", "--namespace=handshake"]);
    }

    #[test]
    fn test_kubectl_args_without_namespace() {
        let args = kubectl_args(&["config", "current-context"], None);
        assert_eq!(args, vec!["config", "current-context"]);
    }

    #[test]
    fn test_exec_args_keep_namespace_before_command() {
        let args = exec_args("web-1", &["bash", "-c", "rails c"], Some("handshake"));
        assert_eq!(
            args,
            vec!["exec", "-ti", "web-1", "--namespace=handshake", "--", "bash", "-c", "rails c"]
        );
    }

    #[test]
    fn test_item_list_tolerates_missing_items() {
        let list: ItemList<serde_json::Value> =
            serde_json::from_str(r#"{"apiVersion":"v1","kind":"List"}"#).unwrap();
        assert!(list.items.is_empty());
    }
}
