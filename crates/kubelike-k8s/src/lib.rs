//! Kubernetes client for kubelike
//!
//! This crate resolves pods and containers into log sources the filtering
//! engine can open.

mod client;
mod source;

pub use client::KubeClient;
pub use source::{PodLogSource, log_params};

// Re-export types that are used in our public API
pub use kubelike_types::{LogRequestOptions, ResourceTarget, SourceRef};
