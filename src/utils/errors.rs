//! Enhanced error types with actionable suggestions

use colored::Colorize;
use thiserror::Error;

/// User-facing error with suggestions
#[derive(Error, Debug)]
#[error("{message}")]
pub struct SeiraError {
    pub message: String,
    pub suggestions: Vec<String>,
}

impl SeiraError {
    /// Create a new error with suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        crate::log_error!("{}", self.message);

        if !self.suggestions.is_empty() {
            eprintln!();
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &self.suggestions {
                eprintln!("  {} {}", "→".blue(), suggestion);
            }
        }
    }

    // Common error patterns

    /// No settings file could be found or read
    pub fn config_not_found(path: &str) -> Self {
        Self::new(format!("Seira config not found: {}", path))
            .suggest("Run seira from the directory containing .seira.yml")
            .suggest("Or point at it with --config <path> / SEIRA_CONFIG")
    }

    /// Cluster name or alias not present in settings
    pub fn unknown_cluster(name: &str, valid: &[String]) -> Self {
        Self::new(format!("Unknown cluster '{}'", name))
            .suggest("Please specify environment as first param to any seira command")
            .suggest(format!("Environment should be one of {}", valid.join(", ")))
    }

    /// App not listed under `applications`
    pub fn unknown_app(name: &str, valid: &[String]) -> Self {
        Self::new(format!("Invalid app name specified: '{}'", name))
            .suggest(format!("Valid apps are: {}", valid.join(", ")))
    }

    /// Tool not found error
    pub fn tool_not_found(tool: &str, install_hint: &str) -> Self {
        Self::new(format!("Required tool '{}' not found", tool))
            .suggest(install_hint)
            .suggest("Ensure the tool is in your PATH")
    }

    /// Key missing from a get/unset style action
    pub fn missing_key() -> Self {
        Self::new("No key specified").suggest("Please specify a key in all caps and with underscores")
    }

    /// Malformed KEY=value arguments
    pub fn invalid_key_values() -> Self {
        Self::new("Invalid key/value arguments")
            .suggest("Please list keys and values to set like KEY_ONE=value_one KEY_TWO=value_two")
            .suggest("To specify a value with spaces: FOO=\"Lorem ipsum\"")
    }

    /// No pod to attach to
    pub fn pod_not_found(app: &str, tier: &str) -> Self {
        Self::new("Could not find pod to connect to")
            .suggest(format!("Check pods with: kubectl get pods --namespace={} -l tier={}", app, tier))
            .suggest("Pick a pod explicitly with --pod=<name>")
    }

    /// Cordon/drain/delete with a single node pool
    pub fn lone_node_pool() -> Self {
        Self::new("Operation is unsafe to run with only one node pool")
            .suggest("Please add a new node pool first to ensure services in cluster can continue running")
            .suggest("node-pools add <node-pool-name> --copy=<existing-node-pool-name>")
    }

    /// Cluster unreachable
    pub fn connection_failed(resource: &str) -> Self {
        Self::new(format!("Could not reach {}", resource))
            .suggest("Check that your credentials are current: seira setup <cluster>")
            .suggest("Verify network connectivity")
    }

    /// Permission denied error
    pub fn permission_denied(operation: &str) -> Self {
        Self::new(format!("Permission denied: {}", operation))
            .suggest("Re-authenticate with: gcloud auth login")
            .suggest("Verify your account has access to the project")
    }
}

/// Helper to display error and exit
pub fn display_error_and_exit(error: SeiraError) -> ! {
    error.display();
    std::process::exit(1);
}

/// Convert anyhow error to SeiraError when possible
pub fn enhance_error(err: anyhow::Error) -> SeiraError {
    let err = match err.downcast::<SeiraError>() {
        Ok(seira) => return seira,
        Err(err) => err,
    };

    // Keep the whole context chain in the message
    let err_str = format!("{:#}", err);
    let lower = err_str.to_lowercase();

    if lower.contains("unable to connect to the server") || lower.contains("connection refused") {
        return SeiraError::connection_failed("the cluster").suggest(err_str);
    }

    if lower.contains("unauthorized") || lower.contains("forbidden") || lower.contains("reauthentication") {
        return SeiraError::permission_denied("cluster operation").suggest(err_str);
    }

    SeiraError::new(err_str).suggest("Run with -v for more details")
}
