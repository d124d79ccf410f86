//! Mock ClusterClient for unit testing
//!
//! This module provides an in-memory implementation of ClusterClientTrait that
//! can be used in unit tests without a running API server.
//!
//! It behaves like the API server where the controller depends on it:
//! objects carry a `resourceVersion` that every write must match, the status
//! write only touches `.status`, and deleting a PodManager garbage-collects
//! the objects it owns. Every call is recorded, and individual operations can
//! be made to fail, hang until cancelled, or run a hook after they complete.
//!
//! The mock is organized into per-kind modules:
//! - `pod_managers.rs` - PodManager get, status update and cascade delete
//! - `deployments.rs` - Deployment get, create and replace
//! - `pods.rs` - Pod listing by label selector
//! - `helpers.rs` - Label matching and ownership helpers

mod deployments;
mod helpers;
mod pod_managers;
mod pods;

use crate::cluster_trait::{label_selector, ClusterClientTrait};
use crate::context::CallContext;
use crate::error::StoreError;
use crate::key::ObjectKey;
use crds::PodManager;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Store operation, used to record calls and target injected behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetPodManager,
    ReplacePodManagerStatus,
    GetDeployment,
    CreateDeployment,
    ReplaceDeployment,
    ListPods,
}

impl Operation {
    /// Returns true for operations that write to the store.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::ReplacePodManagerStatus | Self::CreateDeployment | Self::ReplaceDeployment
        )
    }
}

/// A recorded call against the mock.
///
/// For [`Operation::ListPods`] the key's name is the rendered label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: Operation,
    pub key: ObjectKey,
}

type Hook = Box<dyn FnOnce(&MockClusterClient) + Send>;

/// Mock ClusterClient for testing
#[derive(Clone, Default)]
pub struct MockClusterClient {
    // In-memory storage for resources
    pub(crate) pod_managers: Arc<Mutex<BTreeMap<ObjectKey, PodManager>>>,
    pub(crate) deployments: Arc<Mutex<BTreeMap<ObjectKey, Deployment>>>,
    pub(crate) pods: Arc<Mutex<BTreeMap<ObjectKey, Pod>>>,
    // Call log and injected behaviour
    calls: Arc<Mutex<Vec<MockCall>>>,
    failures: Arc<Mutex<HashMap<Operation, StoreError>>>,
    hangs: Arc<Mutex<HashSet<Operation>>>,
    hooks: Arc<Mutex<HashMap<Operation, Hook>>>,
    // Counter for resourceVersion and uid generation
    pub(crate) next_version: Arc<Mutex<u64>>,
}

impl MockClusterClient {
    /// Create a new, empty mock client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a PodManager to the mock store (for test setup)
    ///
    /// A missing `resourceVersion` or `uid` is filled in. Returns the stored object.
    pub fn add_pod_manager(&self, mut pod_manager: PodManager) -> PodManager {
        let key = helpers::require_key(&pod_manager);
        self.stamp_new(&mut pod_manager.metadata);
        self.pod_managers.lock().unwrap().insert(key, pod_manager.clone());
        pod_manager
    }

    /// Add a Deployment to the mock store (for test setup)
    pub fn add_deployment(&self, mut deployment: Deployment) -> Deployment {
        let key = helpers::require_key(&deployment);
        self.stamp_new(&mut deployment.metadata);
        self.deployments.lock().unwrap().insert(key, deployment.clone());
        deployment
    }

    /// Add a Pod to the mock store (for test setup)
    pub fn add_pod(&self, mut pod: Pod) -> Pod {
        let key = helpers::require_key(&pod);
        self.stamp_new(&mut pod.metadata);
        self.pods.lock().unwrap().insert(key, pod.clone());
        pod
    }

    /// Remove a Pod from the mock store (for test setup)
    pub fn remove_pod(&self, key: &ObjectKey) -> bool {
        self.pods.lock().unwrap().remove(key).is_some()
    }

    /// Current stored PodManager, bypassing the call log
    #[must_use]
    pub fn pod_manager(&self, key: &ObjectKey) -> Option<PodManager> {
        self.pod_managers.lock().unwrap().get(key).cloned()
    }

    /// Current stored Deployment, bypassing the call log
    #[must_use]
    pub fn deployment(&self, key: &ObjectKey) -> Option<Deployment> {
        self.deployments.lock().unwrap().get(key).cloned()
    }

    /// Simulate an external edit of a stored PodManager.
    ///
    /// The edit bumps `resourceVersion` like any API server write.
    /// Returns false if no such PodManager exists.
    pub fn edit_pod_manager(&self, key: &ObjectKey, edit: impl FnOnce(&mut PodManager)) -> bool {
        let version = self.next_version();
        let mut store = self.pod_managers.lock().unwrap();
        match store.get_mut(key) {
            Some(pod_manager) => {
                edit(pod_manager);
                pod_manager.metadata.resource_version = Some(version);
                true
            }
            None => false,
        }
    }

    /// Delete a PodManager and garbage-collect the Deployments it owns.
    pub fn delete_pod_manager(&self, key: &ObjectKey) -> bool {
        pod_managers::delete(self, key)
    }

    /// All calls made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that wrote to the store
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation.is_mutating())
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    /// Make the next call of `operation` block until its context ends
    pub fn hang_next(&self, operation: Operation) {
        self.hangs.lock().unwrap().insert(operation);
    }

    /// Run `hook` right after the next call of `operation` completes
    pub fn after_next(&self, operation: Operation, hook: impl FnOnce(&Self) + Send + 'static) {
        self.hooks.lock().unwrap().insert(operation, Box::new(hook));
    }

    /// Generate next resourceVersion
    pub(crate) fn next_version(&self) -> String {
        let mut version = self.next_version.lock().unwrap();
        *version += 1;
        version.to_string()
    }

    fn stamp_new(&self, meta: &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) {
        let version = self.next_version();
        if meta.uid.is_none() {
            meta.uid = Some(format!("uid-{version}"));
        }
        if meta.resource_version.is_none() {
            meta.resource_version = Some(version);
        }
    }

    async fn invoke<T, F>(
        &self,
        ctx: &CallContext,
        operation: Operation,
        key: ObjectKey,
        call: F,
    ) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce() -> Result<T, StoreError> + Send,
    {
        self.calls.lock().unwrap().push(MockCall { operation, key });
        let hang = self.hangs.lock().unwrap().remove(&operation);
        let failure = self.failures.lock().unwrap().remove(&operation);

        let result = ctx
            .run(async move {
                if hang {
                    std::future::pending::<()>().await;
                }
                match failure {
                    Some(err) => Err(err),
                    None => call(),
                }
            })
            .await;

        let hook = self.hooks.lock().unwrap().remove(&operation);
        if let Some(hook) = hook {
            hook(self);
        }
        result
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_pod_manager(&self, ctx: &CallContext, key: &ObjectKey) -> Result<PodManager, StoreError> {
        self.invoke(ctx, Operation::GetPodManager, key.clone(), || pod_managers::get(self, key))
            .await
    }

    async fn replace_pod_manager_status(&self, ctx: &CallContext, pod_manager: &PodManager) -> Result<PodManager, StoreError> {
        let key = helpers::key_of(pod_manager)?;
        self.invoke(ctx, Operation::ReplacePodManagerStatus, key, || {
            pod_managers::replace_status(self, pod_manager)
        })
        .await
    }

    async fn get_deployment(&self, ctx: &CallContext, key: &ObjectKey) -> Result<Deployment, StoreError> {
        self.invoke(ctx, Operation::GetDeployment, key.clone(), || deployments::get(self, key))
            .await
    }

    async fn create_deployment(&self, ctx: &CallContext, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = helpers::key_of(deployment)?;
        self.invoke(ctx, Operation::CreateDeployment, key, || deployments::create(self, deployment))
            .await
    }

    async fn replace_deployment(&self, ctx: &CallContext, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = helpers::key_of(deployment)?;
        self.invoke(ctx, Operation::ReplaceDeployment, key, || deployments::replace(self, deployment))
            .await
    }

    async fn list_pods(&self, ctx: &CallContext, namespace: &str, selector: &BTreeMap<String, String>) -> Result<Vec<Pod>, StoreError> {
        let key = ObjectKey::new(namespace, label_selector(selector));
        self.invoke(ctx, Operation::ListPods, key, || Ok(pods::list(self, namespace, selector)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{PodManagerSpec, PodManagerStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use std::time::Duration;

    fn pod_manager(name: &str) -> PodManager {
        let mut pm = PodManager::new(name, PodManagerSpec { replicas: 2, restart_policy: None });
        pm.metadata.namespace = Some("default".to_string());
        pm
    }

    fn deployment(name: &str, owner_uid: Option<&str>) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                owner_references: owner_uid.map(|uid| {
                    vec![OwnerReference {
                        api_version: "example.example.com/v1".to_string(),
                        kind: "PodManager".to_string(),
                        name: name.to_string(),
                        uid: uid.to_string(),
                        controller: Some(true),
                        block_owner_deletion: Some(true),
                    }]
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let err = mock
            .get_pod_manager(&ctx, &ObjectKey::new("default", "web"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_twice_is_already_exists() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let created = mock.create_deployment(&ctx, &deployment("web", None)).await.unwrap();
        assert!(created.metadata.resource_version.is_some());
        assert!(created.metadata.uid.is_some());

        let err = mock.create_deployment(&ctx, &deployment("web", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_replace_with_stale_version_conflicts() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let created = mock.create_deployment(&ctx, &deployment("web", None)).await.unwrap();

        let mut first = created.clone();
        first.spec = Some(Default::default());
        mock.replace_deployment(&ctx, &first).await.unwrap();

        let err = mock.replace_deployment(&ctx, &created).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_status_write_leaves_spec_untouched() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let key = ObjectKey::new("default", "web");
        let mut stored = mock.add_pod_manager(pod_manager("web"));

        stored.spec.replicas = 99;
        stored.status = Some(PodManagerStatus::running(1));
        let written = mock.replace_pod_manager_status(&ctx, &stored).await.unwrap();

        assert_eq!(written.spec.replicas, 2);
        assert_eq!(mock.pod_manager(&key).unwrap().status, Some(PodManagerStatus::running(1)));
    }

    #[tokio::test]
    async fn test_status_write_after_external_edit_conflicts() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let key = ObjectKey::new("default", "web");
        let mut stale = mock.add_pod_manager(pod_manager("web"));

        assert!(mock.edit_pod_manager(&key, |pm| pm.spec.replicas = 5));
        stale.status = Some(PodManagerStatus::running(0));

        let err = mock.replace_pod_manager_status(&ctx, &stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(mock.pod_manager(&key).unwrap().status, None);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_deployments() {
        let mock = MockClusterClient::new();
        let owner = mock.add_pod_manager(pod_manager("web"));
        let uid = owner.metadata.uid.clone().unwrap();
        mock.add_deployment(deployment("web", Some(&uid)));
        mock.add_deployment(deployment("unrelated", None));

        assert!(mock.delete_pod_manager(&ObjectKey::new("default", "web")));
        assert!(mock.deployment(&ObjectKey::new("default", "web")).is_none());
        assert!(mock.deployment(&ObjectKey::new("default", "unrelated")).is_some());
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let key = ObjectKey::new("default", "web");
        mock.add_pod_manager(pod_manager("web"));
        mock.fail_next(Operation::GetPodManager, StoreError::Transient("connection reset".to_string()));

        assert!(matches!(
            mock.get_pod_manager(&ctx, &key).await,
            Err(StoreError::Transient(_))
        ));
        assert!(mock.get_pod_manager(&ctx, &key).await.is_ok());
        assert_eq!(mock.calls().len(), 2);
        assert!(mock.mutating_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hang_returns_when_deadline_passes() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background().with_timeout(Duration::from_secs(1));
        mock.hang_next(Operation::ListPods);

        let result = mock.list_pods(&ctx, "default", &BTreeMap::new()).await;
        assert_eq!(result.unwrap_err(), StoreError::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_after_next_runs_hook() {
        let mock = MockClusterClient::new();
        let ctx = CallContext::background();
        let key = ObjectKey::new("default", "web");
        mock.add_pod_manager(pod_manager("web"));

        let hook_key = key.clone();
        mock.after_next(Operation::ListPods, move |m| {
            m.edit_pod_manager(&hook_key, |pm| pm.spec.replicas = 7);
        });
        mock.list_pods(&ctx, "default", &BTreeMap::new()).await.unwrap();

        assert_eq!(mock.pod_manager(&key).unwrap().spec.replicas, 7);
    }
}
