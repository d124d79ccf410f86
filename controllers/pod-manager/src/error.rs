//! Controller-specific error types.
//!
//! This module defines error types specific to the PodManager Controller
//! that are not covered by upstream library errors.

use cluster_client::{ObjectKey, StoreError};
use std::fmt;
use thiserror::Error;

/// Reconcile step during which a state store call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    GetPodManager,
    GetDeployment,
    CreateDeployment,
    ScaleDeployment,
    ListPods,
    RefetchPodManager,
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GetPodManager => "get PodManager",
            Self::GetDeployment => "get Deployment",
            Self::CreateDeployment => "create Deployment",
            Self::ScaleDeployment => "scale Deployment",
            Self::ListPods => "list Pods",
            Self::RefetchPodManager => "re-fetch PodManager",
        })
    }
}

/// Errors that can occur in the PodManager Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A state store call failed during reconciliation
    #[error("Failed to {step} for {key}: {source}")]
    Store {
        step: ReconcileStep,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    /// Writing the status subresource failed
    #[error("Failed to update PodManager {key} status: {source}")]
    StatusUpdate {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    /// The PodManager cannot be realized as given
    #[error("Invalid PodManager: {0}")]
    InvalidResource(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Health probe server failed
    #[error("Probe server failed: {0}")]
    Probe(String),
}

impl ControllerError {
    pub(crate) fn store(step: ReconcileStep, key: &ObjectKey, source: StoreError) -> Self {
        Self::Store {
            step,
            key: key.clone(),
            source,
        }
    }

    /// Returns true if the dispatcher should retry soon rather than apply
    /// its long fatal-error backoff.
    ///
    /// Status write failures always requeue; other store failures requeue
    /// when the underlying error is recoverable (conflict, already-exists,
    /// transient, deadline).
    #[must_use]
    pub const fn requeue(&self) -> bool {
        match self {
            Self::StatusUpdate { .. } => true,
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
