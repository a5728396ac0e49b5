//! Kubernetes operations

pub mod helm;
pub mod kubectl;
pub mod nodes;
pub mod pods;
