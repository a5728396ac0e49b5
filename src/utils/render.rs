//! Placeholder substitution for application manifests
//!
//! Manifests under `kubernetes/<cluster>/<app>/` may contain placeholders of the
//! form `{{ function [argument] }}`:
//!
//! - `{{ revision }}`: the `REVISION` local
//! - `{{ restarted_at }}`: the `RESTARTED_AT_VALUE` local
//! - `{{ replicas <deployment> }}`: current replica count of a deployment
//! - `{{ secret <KEY> }}`: a key of the app's main secret
//! - `{{ job_parallelism [n] }}`: `n`, or 1

use anyhow::{Result, anyhow, bail};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const REVISION: &str = "REVISION";
pub const RESTARTED_AT_VALUE: &str = "RESTARTED_AT_VALUE";

const DEFAULT_JOB_PARALLELISM: &str = "1";

/// Cluster lookups a template may need
pub trait TemplateSource {
    /// Raw replica count of a deployment as reported by the cluster
    fn current_replicas(&self, deployment: &str) -> Result<String>;

    /// Decoded value of a key in the app's main secret
    fn secret(&self, key: &str) -> Result<Option<String>>;
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([a-z_]+)(?:\s+([^\s}]+))?\s*\}\}").expect("valid placeholder regex")
    })
}

pub struct ResourceRenderer<'a, S: TemplateSource> {
    source: &'a S,
    locals: &'a BTreeMap<String, String>,
    summary: BTreeMap<String, String>,
}

impl<'a, S: TemplateSource> ResourceRenderer<'a, S> {
    pub fn new(source: &'a S, locals: &'a BTreeMap<String, String>) -> Self {
        Self {
            source,
            locals,
            summary: BTreeMap::new(),
        }
    }

    /// Substitute every placeholder in `template`
    pub fn render(&mut self, template: &str) -> Result<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;

        for caps in placeholder_pattern().captures_iter(template) {
            let (Some(whole), Some(function)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let argument = caps.get(2).map(|m| m.as_str());

            rendered.push_str(&template[last..whole.start()]);
            rendered.push_str(&self.evaluate(function.as_str(), argument)?);
            last = whole.end();
        }

        rendered.push_str(&template[last..]);
        Ok(rendered)
    }

    /// Values used so far. Secret values are never recorded.
    pub fn summary(&self) -> &BTreeMap<String, String> {
        &self.summary
    }

    pub fn print_summary(&self) {
        println!("Rendered with following template variables:");
        for (key, value) in &self.summary {
            println!("{}: {}", key, value);
        }
    }

    fn evaluate(&mut self, function: &str, argument: Option<&str>) -> Result<String> {
        match function {
            "revision" => {
                let revision = self
                    .locals
                    .get(REVISION)
                    .filter(|r| !r.trim().is_empty())
                    .cloned()
                    .ok_or_else(|| anyhow!("No {} available to render manifests with", REVISION))?;
                self.summary.insert("revision".to_string(), revision.clone());
                Ok(revision)
            }
            "restarted_at" => {
                let value = self.locals.get(RESTARTED_AT_VALUE).cloned().unwrap_or_default();
                self.summary
                    .insert("restarted_at_value".to_string(), value.clone());
                Ok(value)
            }
            "replicas" => {
                let deployment = argument
                    .ok_or_else(|| anyhow!("replicas requires a deployment name"))?;
                let raw = self.source.current_replicas(deployment)?;
                // Refuse to roll out zero replicas because a lookup came back empty
                let count: i64 = raw.trim().parse().map_err(|_| {
                    anyhow!(
                        "Received invalid value for replica count for Deployment {} '{}'",
                        deployment,
                        raw.trim()
                    )
                })?;
                self.summary
                    .insert(format!("{}-replicas", deployment), count.to_string());
                Ok(count.to_string())
            }
            "secret" => {
                let key = argument.ok_or_else(|| anyhow!("secret requires a key name"))?;
                let value = self
                    .source
                    .secret(key)?
                    .ok_or_else(|| anyhow!("Missing value for secret {}", key))?;
                self.summary.insert(key.to_string(), "fetched".to_string());
                Ok(value)
            }
            "job_parallelism" => {
                let parallelism = argument.unwrap_or(DEFAULT_JOB_PARALLELISM).to_string();
                self.summary
                    .insert("parallelism".to_string(), parallelism.clone());
                Ok(parallelism)
            }
            other => bail!("Unknown template function '{}'", other),
        }
    }
}
