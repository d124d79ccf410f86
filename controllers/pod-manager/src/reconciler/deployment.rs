//! Workload derivation
//!
//! Builds the Deployment that realizes a PodManager. The result is a pure
//! function of the PodManager: same name and namespace, `app=<name>` on the
//! selector and pod template, one nginx container, and a controller owner
//! reference back to the PodManager.

use crate::error::ControllerError;
use crds::PodManager;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Label key identifying the pods of a PodManager
pub const APP_LABEL: &str = "app";
pub const CONTAINER_NAME: &str = "nginx";
pub const CONTAINER_IMAGE: &str = "nginx:latest";
pub const CONTAINER_PORT: i32 = 80;
pub const CONTAINER_PORT_NAME: &str = "http";

/// Replica count the API server assumes when a Deployment leaves it unset
pub const DEFAULT_DEPLOYMENT_REPLICAS: i32 = 1;

/// Labels carried by the selector and pod template of the Deployment named `name`.
#[must_use]
pub fn workload_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}

/// Build the desired Deployment for `pod_manager`.
///
/// A missing restart policy maps to `Always`.
///
/// # Errors
///
/// Returns `ControllerError::InvalidResource` if the PodManager has no
/// namespace or uid (an owner reference cannot be formed without them).
pub fn deployment_for_pod_manager(pod_manager: &PodManager) -> Result<Deployment, ControllerError> {
    let name = pod_manager.name_any();
    let namespace = pod_manager.namespace().ok_or_else(|| {
        ControllerError::InvalidResource(format!("PodManager {name} has no namespace"))
    })?;
    let owner = pod_manager.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::InvalidResource(format!("PodManager {namespace}/{name} has no uid"))
    })?;
    let labels = workload_labels(&name);
    let restart_policy = pod_manager.spec.restart_policy.unwrap_or_default();

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(pod_manager.spec.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some(restart_policy.as_str().to_string()),
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(CONTAINER_IMAGE.to_string()),
                        ports: Some(vec![ContainerPort {
                            container_port: CONTAINER_PORT,
                            name: Some(CONTAINER_PORT_NAME.to_string()),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    })
}

/// Replica count a Deployment currently asks for.
#[must_use]
pub fn deployment_replicas(deployment: &Deployment) -> i32 {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(DEFAULT_DEPLOYMENT_REPLICAS)
}

/// `deployment` with only its replica count changed.
#[must_use]
pub fn with_replicas(mut deployment: Deployment, replicas: i32) -> Deployment {
    deployment.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
    deployment
}
