//! PodManager CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the PodManager controller.

pub mod pod_manager;

pub use pod_manager::*;
