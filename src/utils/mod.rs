//! Utility modules for seira

pub mod args;
pub mod dryrun;
pub mod errors;
pub mod logger;
pub mod prereqs;
pub mod process;
pub mod progress;
pub mod prompt;
pub mod random;
pub mod render;

// Re-export commonly used items
pub use errors::SeiraError;
pub use logger::{log_error, log_info, log_warn};
pub use prereqs::{CommonPrereqs, Prerequisite};
pub use prompt::{confirm, confirm_or_abort};
