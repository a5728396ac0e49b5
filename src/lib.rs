//! seira: manage Kubernetes as a PaaS on GKE, Cloud SQL and Helm

pub mod commands;
pub mod config;
pub mod gcp;
pub mod k8s;
pub mod utils;
