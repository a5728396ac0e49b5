//! Local proxy to the cluster API

use crate::utils::process;
use anyhow::{Context, Result};

/// Runs `kubectl proxy` until interrupted
pub fn run() -> Result<()> {
    println!("Starting proxy. Stop it with Ctrl-C.");
    process::show_until_interrupted("kubectl", &process::to_args(&["proxy"]))
        .context("kubectl proxy failed")
}
