//! Pod operations for MockClusterClient

use super::helpers::labels_match;
use super::MockClusterClient;
use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;

pub fn list(client: &MockClusterClient, namespace: &str, selector: &BTreeMap<String, String>) -> Vec<Pod> {
    client.pods
        .lock()
        .unwrap()
        .iter()
        .filter(|(key, pod)| key.namespace == namespace && labels_match(selector, pod.metadata.labels.as_ref()))
        .map(|(_, pod)| pod.clone())
        .collect()
}
