//! Helm Redis instances of an app

use crate::commands::helm_release::{self, CacheService, CreateOptions};
use crate::commands::secrets::{self, Secrets};
use crate::config::ClusterContext;
use anyhow::{Result, anyhow};

const SERVICE: CacheService = CacheService::Redis;
const PASSWORD_KEY: &str = "redis-password";

pub fn list(app: &str) -> Result<()> {
    helm_release::list(SERVICE, app)
}

pub fn status(app: &str, name: &str) -> Result<()> {
    helm_release::status(SERVICE, app, name)
}

/// Password the chart generated, stored in the `<release>-redis` secret
pub fn credentials(context: &ClusterContext, app: &str, name: &str) -> Result<()> {
    let secret_name = format!("{}-redis", SERVICE.release_name(app, name));
    let secret = Secrets::new(app, context).fetch(&secret_name)?;
    let password = secrets::decoded(&secret)
        .remove(PASSWORD_KEY)
        .ok_or_else(|| anyhow!("Secret {} has no {}", secret_name, PASSWORD_KEY))?;

    println!("{}: {}", PASSWORD_KEY, password);
    Ok(())
}

pub fn create(context: &ClusterContext, app: &str, options: &CreateOptions) -> Result<()> {
    helm_release::create(SERVICE, context, app, options)
}

pub fn delete(app: &str, name: &str) -> Result<()> {
    helm_release::delete(SERVICE, app, name)
}
