//! Google Cloud operations

pub mod container;
pub mod gcloud;
pub mod sql;
