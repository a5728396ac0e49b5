//! Configuration management

pub mod context;
pub mod settings;

pub use context::ClusterContext;
pub use settings::Settings;
