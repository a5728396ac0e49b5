//! Application secrets
//!
//! Each app keeps its environment in a Secret named `<app>-secrets`. Secrets are
//! written by piping JSON to `kubectl replace`/`kubectl create` on stdin, so no
//! plaintext ever lands on disk.

use crate::config::ClusterContext;
use crate::k8s::kubectl;
use crate::utils::args::{parse_key_values, require_key};
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use colored::Colorize;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Default name of the secret pgbouncer reads its credentials from
pub const PGBOUNCER_SECRETS_NAME: &str = "pgbouncer-secrets";

/// Secrets of one app in the current cluster
pub struct Secrets<'a> {
    app: &'a str,
    context: &'a ClusterContext,
}

impl<'a> Secrets<'a> {
    pub fn new(app: &'a str, context: &'a ClusterContext) -> Self {
        Self { app, context }
    }

    pub fn main_secret_name(&self) -> String {
        format!("{}-secrets", self.app)
    }

    /// Fetch a secret from a namespace. Anything but a `Secret` is rejected.
    pub fn fetch_from(&self, name: &str, namespace: &str) -> Result<Secret> {
        kubectl::get_json(&["get", "secret", name], Some(namespace))
            .with_context(|| format!("Failed to fetch secret {} from namespace {}", name, namespace))
    }

    /// Fetch a secret from the app namespace
    pub fn fetch(&self, name: &str) -> Result<Secret> {
        self.fetch_from(name, self.app)
    }

    pub fn fetch_main(&self) -> Result<Secret> {
        self.fetch(&self.main_secret_name())
    }

    /// Decoded value of a key in the main secret
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let secret = self.fetch_main()?;
        Ok(decoded(&secret).remove(key))
    }

    /// Merge values into the main secret
    pub fn set_many(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let mut secret = self.fetch_main()?;
        merge_values(&mut secret, values);
        self.write(&secret)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&BTreeMap::from([(key.to_string(), value.to_string())]))
    }

    pub fn unset(&self, key: &str) -> Result<()> {
        let mut secret = self.fetch_main()?;
        if let Some(data) = secret.data.as_mut() {
            data.remove(key);
        }
        self.write(&secret)
    }

    /// Write a secret, replacing it when it already exists
    pub fn write(&self, secret: &Secret) -> Result<()> {
        let name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| anyhow!("Secret has no name"))?;
        let namespace = secret.metadata.namespace.as_deref().unwrap_or(self.app);

        let json = serde_json::to_string(secret)?;
        if kubectl::kubectl_succeeds(&["get", "secret", name], Some(namespace)) {
            kubectl::replace_yaml(&json, Some(namespace))?;
        } else {
            kubectl::create_yaml(&json, Some(namespace))?;
        }

        crate::log_info!(
            "Successfully created/replaced {} secret in cluster {}",
            name,
            self.context.cluster
        );
        Ok(())
    }

    /// Copy a secret between namespaces, keeping only its name and data
    pub fn copy_secret_across_namespace(&self, key: &str, from: &str, to: &str) -> Result<()> {
        crate::log_info!("Copying the {} secret from namespace {} to {}.", key, from, to);
        let secret = self.fetch_from(key, from)?;
        self.write(&relocated(secret, key, to))
    }

    /// Write a secret holding exactly `values`
    pub fn write_values(&self, name: &str, values: &BTreeMap<String, String>) -> Result<()> {
        self.write(&new_secret(name, self.app, values))
    }

    /// Write a secret holding pgbouncer's database credentials
    pub fn create_pgbouncer_secret(&self, name: &str, user: &str, password: &str) -> Result<()> {
        let values = BTreeMap::from([
            ("DB_USER".to_string(), user.to_string()),
            ("DB_PASSWORD".to_string(), password.to_string()),
        ]);
        self.write_values(name, &values)
    }
}

/// Decoded data of a secret
pub fn decoded(secret: &Secret) -> BTreeMap<String, String> {
    secret
        .data
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), String::from_utf8_lossy(&v.0).into_owned()))
        .collect()
}

fn merge_values(secret: &mut Secret, values: &BTreeMap<String, String>) {
    let data = secret.data.get_or_insert_with(BTreeMap::new);
    for (key, value) in values {
        data.insert(key.clone(), ByteString(value.as_bytes().to_vec()));
    }
}

fn relocated(secret: Secret, name: &str, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..secret
    }
}

fn new_secret(name: &str, namespace: &str, values: &BTreeMap<String, String>) -> Secret {
    let mut secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        ..Default::default()
    };
    merge_values(&mut secret, values);
    secret
}

// Actions

pub fn get(context: &ClusterContext, app: &str, key: Option<&str>) -> Result<()> {
    let key = require_key(key)?;
    match Secrets::new(app, context).get(key)? {
        Some(value) => println!("{}: {}", key.green(), value),
        None => return Err(anyhow!("Secret '{}' not found", key)),
    }
    Ok(())
}

pub fn set(context: &ClusterContext, app: &str, args: &[String]) -> Result<()> {
    let values = parse_key_values(args)?;
    Secrets::new(app, context).set_many(&values)
}

pub fn unset(context: &ClusterContext, app: &str, key: Option<&str>) -> Result<()> {
    let key = require_key(key)?;
    Secrets::new(app, context).unset(key)
}

pub fn list(context: &ClusterContext, app: &str) -> Result<()> {
    let secret = Secrets::new(app, context).fetch_main()?;
    println!("Base64 encoded keys for {}:", app);
    for (key, value) in secret.data.iter().flatten() {
        println!("{}: {}", key.green(), STANDARD.encode(&value.0));
    }
    Ok(())
}

pub fn list_decoded(context: &ClusterContext, app: &str) -> Result<()> {
    let secret = Secrets::new(app, context).fetch_main()?;
    println!("Decoded (raw) keys for {}:", app);
    for (key, value) in decoded(&secret) {
        println!("{}: {}", key.green(), value);
    }
    Ok(())
}

pub fn create_pgbouncer_secret(
    context: &ClusterContext,
    app: &str,
    user: &str,
    password: &str,
    name: Option<&str>,
) -> Result<()> {
    Secrets::new(app, context).create_pgbouncer_secret(
        name.unwrap_or(PGBOUNCER_SECRETS_NAME),
        user,
        password,
    )
}
