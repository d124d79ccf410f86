//! Kubernetes-backed cluster client
//!
//! Implements [`ClusterClientTrait`] over `kube::Api`. Writes are conditional
//! on `metadata.resourceVersion`, so a stale object fails with
//! [`StoreError::Conflict`] instead of overwriting a concurrent change.

use crate::context::CallContext;
use crate::error::StoreError;
use crate::key::ObjectKey;
use crate::cluster_trait::{label_selector, ClusterClientTrait};
use crds::PodManager;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Cluster client backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Create a new cluster client
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    fn pod_managers(&self, namespace: &str) -> Api<PodManager> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn key_of<K: kube::Resource>(object: &K) -> Result<ObjectKey, StoreError> {
    ObjectKey::from_resource(object)
        .ok_or_else(|| StoreError::Api("object is missing metadata.name or metadata.namespace".to_string()))
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_pod_manager(&self, ctx: &CallContext, key: &ObjectKey) -> Result<PodManager, StoreError> {
        debug!("GET PodManager {}", key);
        let api = self.pod_managers(&key.namespace);
        ctx.run(async { api.get(&key.name).await.map_err(StoreError::from) }).await
    }

    async fn replace_pod_manager_status(&self, ctx: &CallContext, pod_manager: &PodManager) -> Result<PodManager, StoreError> {
        let key = key_of(pod_manager)?;
        debug!("UPDATE PodManager {} status", key);
        let api = self.pod_managers(&key.namespace);

        // Carrying resourceVersion in the merge patch turns it into a
        // conditional write on the status subresource.
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": pod_manager.metadata.resource_version,
            },
            "status": pod_manager.status,
        });
        let pp = PatchParams::default();
        ctx.run(async {
            api.patch_status(&key.name, &pp, &Patch::Merge(&patch))
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn get_deployment(&self, ctx: &CallContext, key: &ObjectKey) -> Result<Deployment, StoreError> {
        debug!("GET Deployment {}", key);
        let api = self.deployments(&key.namespace);
        ctx.run(async { api.get(&key.name).await.map_err(StoreError::from) }).await
    }

    async fn create_deployment(&self, ctx: &CallContext, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = key_of(deployment)?;
        debug!("CREATE Deployment {}", key);
        let api = self.deployments(&key.namespace);
        ctx.run(async {
            api.create(&PostParams::default(), deployment)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn replace_deployment(&self, ctx: &CallContext, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = key_of(deployment)?;
        debug!("UPDATE Deployment {}", key);
        let api = self.deployments(&key.namespace);
        ctx.run(async {
            api.replace(&key.name, &PostParams::default(), deployment)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn list_pods(&self, ctx: &CallContext, namespace: &str, selector: &BTreeMap<String, String>) -> Result<Vec<Pod>, StoreError> {
        let selector = label_selector(selector);
        debug!("LIST Pods in {} matching {}", namespace, selector);
        let api = self.pods(namespace);
        let lp = ListParams::default().labels(&selector);
        ctx.run(async {
            api.list(&lp)
                .await
                .map(|list| list.items)
                .map_err(StoreError::from)
        })
        .await
    }
}
