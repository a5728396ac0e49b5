//! Prerequisite checking for the external CLIs seira drives

use crate::utils::errors::SeiraError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String, hint: String },
}

/// Trait for checking prerequisites
pub trait Prerequisite {
    /// Name of the prerequisite tool
    fn name(&self) -> &str;

    /// Check if the tool is available
    fn check(&self) -> Result<(), PrereqError>;

    /// Installation hint for the user
    fn install_hint(&self) -> &str;
}

/// Basic prerequisite that checks if a command exists
pub struct CommandPrereq {
    pub name: String,
    pub hint: String,
}

impl CommandPrereq {
    pub fn new(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: hint.into(),
        }
    }
}

impl Prerequisite for CommandPrereq {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<(), PrereqError> {
        which::which(&self.name).map_err(|_| PrereqError::NotFound {
            name: self.name.clone(),
            hint: self.hint.clone(),
        })?;
        Ok(())
    }

    fn install_hint(&self) -> &str {
        &self.hint
    }
}

/// Common prerequisites for seira
pub struct CommonPrereqs;

impl CommonPrereqs {
    /// Google Cloud SDK
    pub fn gcloud() -> CommandPrereq {
        CommandPrereq::new(
            "gcloud",
            "Install from: https://cloud.google.com/sdk/docs/install",
        )
    }

    /// Get kubectl prerequisite
    pub fn kubectl() -> CommandPrereq {
        CommandPrereq::new("kubectl", "Install with: gcloud components install kubectl")
    }

    /// Helm package manager
    pub fn helm() -> CommandPrereq {
        CommandPrereq::new("helm", "Install from: https://helm.sh/docs/intro/install/")
    }

    /// expect, used to script `gcloud sql connect` sessions
    pub fn expect() -> CommandPrereq {
        CommandPrereq::new("expect", "Install with your package manager (brew install expect)")
    }

    /// Check all prerequisites and return detailed results
    /// Returns (found_tools, missing_tools)
    pub fn check_all(prereqs: &[&dyn Prerequisite]) -> (Vec<String>, Vec<(String, String)>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for prereq in prereqs {
            match prereq.check() {
                Ok(_) => found.push(prereq.name().to_string()),
                Err(PrereqError::NotFound { name, hint }) => missing.push((name, hint)),
            }
        }

        (found, missing)
    }
}

/// Fail with the tool's install hint unless it is on PATH
pub fn require(prereq: &dyn Prerequisite) -> Result<(), SeiraError> {
    prereq
        .check()
        .map_err(|_| SeiraError::tool_not_found(prereq.name(), prereq.install_hint()))
}
