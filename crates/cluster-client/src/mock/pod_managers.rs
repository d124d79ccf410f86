//! PodManager operations for MockClusterClient

use super::helpers::{check_version, is_owned_by, key_of};
use super::MockClusterClient;
use crate::error::StoreError;
use crate::key::ObjectKey;
use crds::PodManager;

pub fn get(client: &MockClusterClient, key: &ObjectKey) -> Result<PodManager, StoreError> {
    client.pod_managers
        .lock()
        .unwrap()
        .get(key)
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("podmanagers \"{}\" not found", key.name)))
}

/// Copy only `.status` onto the stored object.
pub fn replace_status(client: &MockClusterClient, pod_manager: &PodManager) -> Result<PodManager, StoreError> {
    let key = key_of(pod_manager)?;
    let version = client.next_version();
    let mut store = client.pod_managers.lock().unwrap();
    let stored = store
        .get_mut(&key)
        .ok_or_else(|| StoreError::NotFound(format!("podmanagers \"{}\" not found", key.name)))?;

    check_version(&stored.metadata, &pod_manager.metadata, &key)?;
    stored.status.clone_from(&pod_manager.status);
    stored.metadata.resource_version = Some(version);
    Ok(stored.clone())
}

/// Remove the PodManager and every Deployment whose owner reference points at it.
pub fn delete(client: &MockClusterClient, key: &ObjectKey) -> bool {
    let Some(removed) = client.pod_managers.lock().unwrap().remove(key) else {
        return false;
    };
    if let Some(uid) = removed.metadata.uid.as_deref() {
        client.deployments
            .lock()
            .unwrap()
            .retain(|_, deployment| !is_owned_by(&deployment.metadata, uid));
    }
    true
}
