//! ClusterClient trait for mocking
//!
//! This trait abstracts cluster state access so the reconciler can be driven
//! against the real API server or an in-memory store in unit tests.

use crate::context::CallContext;
use crate::error::StoreError;
use crate::key::ObjectKey;
use crds::PodManager;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

/// Trait for cluster state store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Every call runs under the supplied [`CallContext`] and returns
/// [`StoreError::Cancelled`] or [`StoreError::DeadlineExceeded`] when the
/// context ends first.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Get a PodManager by key. Missing objects are [`StoreError::NotFound`].
    async fn get_pod_manager(&self, ctx: &CallContext, key: &ObjectKey) -> Result<PodManager, StoreError>;

    /// Write `pod_manager.status` through the status subresource.
    ///
    /// Spec and metadata in the argument are ignored apart from
    /// `resourceVersion`, which must match the stored object.
    async fn replace_pod_manager_status(&self, ctx: &CallContext, pod_manager: &PodManager) -> Result<PodManager, StoreError>;

    /// Get a Deployment by key. Missing objects are [`StoreError::NotFound`].
    async fn get_deployment(&self, ctx: &CallContext, key: &ObjectKey) -> Result<Deployment, StoreError>;

    /// Create a Deployment. An existing object with the same key is [`StoreError::AlreadyExists`].
    async fn create_deployment(&self, ctx: &CallContext, deployment: &Deployment) -> Result<Deployment, StoreError>;

    /// Replace a Deployment, conditional on its `resourceVersion`.
    async fn replace_deployment(&self, ctx: &CallContext, deployment: &Deployment) -> Result<Deployment, StoreError>;

    /// List pods in `namespace` carrying every label in `selector`.
    async fn list_pods(&self, ctx: &CallContext, namespace: &str, selector: &BTreeMap<String, String>) -> Result<Vec<Pod>, StoreError>;
}

/// Render an equality-based label selector (`k1=v1,k2=v2`).
#[must_use]
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
