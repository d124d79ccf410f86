//! Deployment operations for MockClusterClient

use super::helpers::{check_version, key_of};
use super::MockClusterClient;
use crate::error::StoreError;
use crate::key::ObjectKey;
use k8s_openapi::api::apps::v1::Deployment;

pub fn get(client: &MockClusterClient, key: &ObjectKey) -> Result<Deployment, StoreError> {
    client.deployments
        .lock()
        .unwrap()
        .get(key)
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("deployments.apps \"{}\" not found", key.name)))
}

pub fn create(client: &MockClusterClient, deployment: &Deployment) -> Result<Deployment, StoreError> {
    let key = key_of(deployment)?;
    let version = client.next_version();
    let mut store = client.deployments.lock().unwrap();
    if store.contains_key(&key) {
        return Err(StoreError::AlreadyExists(format!(
            "deployments.apps \"{}\" already exists",
            key.name
        )));
    }

    let mut created = deployment.clone();
    created.metadata.uid = Some(format!("uid-{version}"));
    created.metadata.resource_version = Some(version);
    created.metadata.generation = Some(1);
    store.insert(key, created.clone());
    Ok(created)
}

pub fn replace(client: &MockClusterClient, deployment: &Deployment) -> Result<Deployment, StoreError> {
    let key = key_of(deployment)?;
    let version = client.next_version();
    let mut store = client.deployments.lock().unwrap();
    let stored = store
        .get_mut(&key)
        .ok_or_else(|| StoreError::NotFound(format!("deployments.apps \"{}\" not found", key.name)))?;

    check_version(&stored.metadata, &deployment.metadata, &key)?;
    let generation = stored.metadata.generation.unwrap_or(1);
    let spec_changed = stored.spec != deployment.spec;

    let mut replaced = deployment.clone();
    replaced.metadata.uid.clone_from(&stored.metadata.uid);
    replaced.metadata.resource_version = Some(version);
    replaced.metadata.generation = Some(if spec_changed { generation + 1 } else { generation });
    *stored = replaced.clone();
    Ok(replaced)
}
