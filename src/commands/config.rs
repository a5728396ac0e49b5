//! Application environment configuration (`<app>-env-config` ConfigMap)

use crate::config::ClusterContext;
use crate::k8s::kubectl;
use crate::utils::args::{parse_key_values, require_key};
use anyhow::{Context, Result};
use colored::Colorize;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;

pub fn main_config_name(app: &str) -> String {
    format!("{}-env-config", app)
}

/// Fetch the app's ConfigMap. Anything but a `ConfigMap` is rejected.
pub fn fetch_current_config(app: &str) -> Result<ConfigMap> {
    let name = main_config_name(app);
    kubectl::get_json(&["get", "configmap", &name], Some(app))
        .with_context(|| format!("Failed to fetch configmap {}", name))
}

/// Replace the ConfigMap; it has to exist already
fn write_config(context: &ClusterContext, app: &str, config: &ConfigMap) -> Result<()> {
    let json = serde_json::to_string(config)?;
    kubectl::replace_yaml(&json, Some(app))
        .context("Failed to update configmap")?;

    crate::log_info!(
        "Successfully replaced {} config in cluster {}",
        main_config_name(app),
        context.cluster
    );
    Ok(())
}

fn merge_values(config: &mut ConfigMap, values: BTreeMap<String, String>) {
    config.data.get_or_insert_with(BTreeMap::new).extend(values);
}

pub fn get(app: &str, key: Option<&str>) -> Result<()> {
    let key = require_key(key)?;
    let config = fetch_current_config(app)?;

    match config.data.as_ref().and_then(|data| data.get(key)) {
        Some(value) => println!("{}: {}", key.green(), value),
        None => println!("Config '{}' not found", key),
    }
    Ok(())
}

pub fn set(context: &ClusterContext, app: &str, args: &[String]) -> Result<()> {
    let values = parse_key_values(args)?;
    let mut config = fetch_current_config(app)?;
    merge_values(&mut config, values);
    write_config(context, app, &config)
}

pub fn unset(context: &ClusterContext, app: &str, key: Option<&str>) -> Result<()> {
    let key = require_key(key)?;
    let mut config = fetch_current_config(app)?;
    if let Some(data) = config.data.as_mut() {
        data.remove(key);
    }
    write_config(context, app, &config)
}

pub fn list(app: &str) -> Result<()> {
    let config = fetch_current_config(app)?;
    println!("Config keys for {}:", app);
    for (key, value) in config.data.iter().flatten() {
        println!("{}: {}", key.green(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_JSON: &str = r#"{
      "apiVersion": "v1",
      "kind": "ConfigMap",
      "metadata": {"name": "handshake-env-config", "namespace": "handshake"},
      "data": {"DB_MAX_IDLE_CONNS": "10"}
    }"#;

    #[test]
    fn test_main_config_name() {
        assert_eq!(main_config_name("handshake"), "handshake-env-config");
    }

    #[test]
    fn test_merge_values_overwrites_and_adds() {
        let mut config: ConfigMap = serde_json::from_str(CONFIG_JSON).unwrap();
        merge_values(
            &mut config,
            BTreeMap::from([
                ("DB_MAX_IDLE_CONNS".to_string(), "20".to_string()),
                ("DB_MAX_CONN_LIFETIME".to_string(), "2m".to_string()),
            ]),
        );
        let data = config.data.unwrap();
        assert_eq!(data.get("DB_MAX_IDLE_CONNS").unwrap(), "20");
        assert_eq!(data.get("DB_MAX_CONN_LIFETIME").unwrap(), "2m");
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let json = CONFIG_JSON.replace("\"ConfigMap\"", "\"Secret\"");
        assert!(serde_json::from_str::<ConfigMap>(&json).is_err());
    }
}
