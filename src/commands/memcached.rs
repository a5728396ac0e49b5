//! Helm Memcached instances of an app

use crate::commands::helm_release::{self, CacheService, CreateOptions};
use crate::config::ClusterContext;
use anyhow::Result;

const SERVICE: CacheService = CacheService::Memcached;

pub fn list(app: &str) -> Result<()> {
    helm_release::list(SERVICE, app)
}

pub fn status(app: &str, name: &str) -> Result<()> {
    helm_release::status(SERVICE, app, name)
}

pub fn create(context: &ClusterContext, app: &str, options: &CreateOptions) -> Result<()> {
    helm_release::create(SERVICE, context, app, options)
}

pub fn delete(app: &str, name: &str) -> Result<()> {
    helm_release::delete(SERVICE, app, name)
}
