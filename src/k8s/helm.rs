//! Helm wrapper utilities

use crate::utils::process;
use anyhow::Result;

/// Run a mutating helm command
pub fn run_helm(args: &[&str]) -> Result<()> {
    process::run("helm", &process::to_args(args))
}

/// Run helm and capture output
pub fn run_helm_output(args: &[&str]) -> Result<String> {
    process::output("helm", &process::to_args(args))
}

/// Read-only helm command with output to the terminal
pub fn show_helm(args: &[&str]) -> Result<()> {
    process::show("helm", &process::to_args(args))
}

/// Arguments for `helm list`. `include_history` adds releases uninstalled
/// with `--keep-history`, whose names stay reserved.
fn list_args(namespace: &str, include_history: bool) -> Vec<&str> {
    let mut args = vec!["list", "--short"];
    if include_history {
        args.push("--all");
    }
    args.extend(["--namespace", namespace]);
    args
}

/// Live release names in a namespace starting with `prefix`
pub fn releases_with_prefix(namespace: &str, prefix: &str) -> Result<Vec<String>> {
    let output = run_helm_output(&list_args(namespace, false))?;
    Ok(filter_releases(&output, prefix))
}

/// Release names starting with `prefix`, including uninstalled ones
pub fn reserved_releases_with_prefix(namespace: &str, prefix: &str) -> Result<Vec<String>> {
    let output = run_helm_output(&list_args(namespace, true))?;
    Ok(filter_releases(&output, prefix))
}

fn filter_releases(output: &str, prefix: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|name| name.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_releases() {
        let output = "handshake-redis-brave-otter\nother-redis-sad-yak\nhandshake-memcached-kind-emu\n";
        assert_eq!(
            filter_releases(output, "handshake-redis-"),
            vec!["handshake-redis-brave-otter"]
        );
    }

    #[test]
    fn test_list_args() {
        assert_eq!(list_args("handshake", false), vec!["list", "--short", "--namespace", "handshake"]);
        assert_eq!(
            list_args("handshake", true),
            vec!["list", "--short", "--all", "--namespace", "handshake"]
        );
    }
}
