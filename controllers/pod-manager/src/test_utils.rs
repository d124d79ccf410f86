//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use crate::reconciler::deployment::workload_labels;
#[cfg(test)]
use cluster_client::{MockClusterClient, ObjectKey};
#[cfg(test)]
use crds::{PodManager, PodManagerSpec, RestartPolicy};
#[cfg(test)]
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
#[cfg(test)]
use k8s_openapi::api::core::v1::Pod;
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

/// Helper to create a test PodManager with a uid
#[cfg(test)]
pub fn create_test_pod_manager(
    name: &str,
    namespace: &str,
    replicas: i32,
    restart_policy: Option<RestartPolicy>,
) -> PodManager {
    PodManager {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("{namespace}-{name}-uid")),
            ..Default::default()
        },
        spec: PodManagerSpec {
            replicas,
            restart_policy,
        },
        status: None,
    }
}

/// Helper to create a bare Deployment not derived from any PodManager
#[cfg(test)]
pub fn create_test_deployment(name: &str, namespace: &str, replicas: Option<i32>) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas,
            selector: LabelSelector {
                match_labels: Some(workload_labels(name)),
                ..Default::default()
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a Pod labelled `app=<app>`
#[cfg(test)]
pub fn create_test_pod(name: &str, namespace: &str, app: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(workload_labels(app)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Helper to create a reconciler backed by `mock`
#[cfg(test)]
pub fn create_test_reconciler(mock: &MockClusterClient) -> Reconciler {
    Reconciler::new(Box::new(mock.clone()))
}

/// Key of the object `name` in the `default` namespace
#[cfg(test)]
pub fn test_key(name: &str) -> ObjectKey {
    ObjectKey::new("default", name)
}
