//! Reconciliation logic for PodManager resources.
//!
//! Each pass drives the cluster toward the PodManager's declared state:
//! 1. Fetch the PodManager (absent means deleted, nothing to do)
//! 2. Create its Deployment, or scale the existing one to `spec.replicas`
//! 3. If a restart policy is declared, count the matching pods and publish
//!    `{availableReplicas, status: Running}` on a freshly fetched copy
//!
//! Every step stops the pass on failure; later steps never see partial state.

pub mod deployment;


use crate::error::{ControllerError, ReconcileStep};
use crate::reconcile_helpers::{available_replicas, status_needs_update};
use cluster_client::{CallContext, ClusterClientTrait, ObjectKey};
use crds::{PodManager, PodManagerStatus};
use deployment::{deployment_for_pod_manager, deployment_replicas, with_replicas, workload_labels};
use tracing::{debug, error, info};

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Reconcile again soon even though nothing failed
    pub requeue: bool,
}

impl ReconcileOutcome {
    /// Converged; wait for the next change.
    #[must_use]
    pub const fn done() -> Self {
        Self { requeue: false }
    }
}

/// Reconciles PodManager resources against the cluster.
pub struct Reconciler {
    client: Box<dyn ClusterClientTrait + Send + Sync>,
}

impl Reconciler {
    /// Creates a new reconciler over the given state store client.
    pub fn new(client: Box<dyn ClusterClientTrait + Send + Sync>) -> Self {
        Self { client }
    }

    /// Reconcile the PodManager identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. `ControllerError::requeue`
    /// tells the caller whether a quick retry is worthwhile.
    pub async fn reconcile(&self, key: &ObjectKey, ctx: &CallContext) -> Result<ReconcileOutcome, ControllerError> {
        info!("Reconciling PodManager {}", key);

        let Some(pod_manager) = self.fetch_pod_manager(ctx, key, ReconcileStep::GetPodManager).await? else {
            info!("PodManager {} not found, assuming it was deleted", key);
            return Ok(ReconcileOutcome::done());
        };

        if pod_manager.spec.replicas < 0 {
            return Err(ControllerError::InvalidResource(format!(
                "PodManager {} has negative replicas ({})",
                key, pod_manager.spec.replicas
            )));
        }

        self.reconcile_deployment(ctx, key, &pod_manager).await?;

        match pod_manager.spec.restart_policy {
            Some(policy) => {
                debug!("PodManager {} declares restart policy {}, publishing status", key, policy);
                self.publish_status(ctx, key).await?;
            }
            None => debug!("PodManager {} has no restart policy, leaving status untouched", key),
        }

        Ok(ReconcileOutcome::done())
    }

    /// Get the PodManager, mapping not-found to `None`.
    async fn fetch_pod_manager(
        &self,
        ctx: &CallContext,
        key: &ObjectKey,
        step: ReconcileStep,
    ) -> Result<Option<PodManager>, ControllerError> {
        match self.client.get_pod_manager(ctx, key).await {
            Ok(pod_manager) => Ok(Some(pod_manager)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                error!("Failed to {} {}: {}", step, key, e);
                Err(ControllerError::store(step, key, e))
            }
        }
    }

    /// Ensure the Deployment exists with the declared replica count.
    async fn reconcile_deployment(
        &self,
        ctx: &CallContext,
        key: &ObjectKey,
        pod_manager: &PodManager,
    ) -> Result<(), ControllerError> {
        let desired = pod_manager.spec.replicas;

        let existing = match self.client.get_deployment(ctx, key).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                info!("Creating Deployment {} with {} replicas", key, desired);
                let deployment = deployment_for_pod_manager(pod_manager)?;
                self.client.create_deployment(ctx, &deployment).await.map_err(|e| {
                    error!("Failed to create Deployment {}: {}", key, e);
                    ControllerError::store(ReconcileStep::CreateDeployment, key, e)
                })?;
                return Ok(());
            }
            Err(e) => {
                error!("Failed to get Deployment {}: {}", key, e);
                return Err(ControllerError::store(ReconcileStep::GetDeployment, key, e));
            }
        };

        let current = deployment_replicas(&existing);
        if current == desired {
            debug!("Deployment {} already has {} replicas", key, current);
            return Ok(());
        }

        info!("Scaling Deployment {} from {} to {} replicas", key, current, desired);
        self.client
            .replace_deployment(ctx, &with_replicas(existing, desired))
            .await
            .map_err(|e| {
                error!("Failed to scale Deployment {}: {}", key, e);
                ControllerError::store(ReconcileStep::ScaleDeployment, key, e)
            })?;
        Ok(())
    }

    /// Count matching pods and write the result to a fresh copy's status.
    async fn publish_status(&self, ctx: &CallContext, key: &ObjectKey) -> Result<(), ControllerError> {
        let pods = self
            .client
            .list_pods(ctx, &key.namespace, &workload_labels(&key.name))
            .await
            .map_err(|e| {
                error!("Failed to list pods for {}: {}", key, e);
                ControllerError::store(ReconcileStep::ListPods, key, e)
            })?;
        let desired = PodManagerStatus::running(available_replicas(&pods));

        // Status is written on the latest copy, never on the one read at the start.
        let Some(mut latest) = self.fetch_pod_manager(ctx, key, ReconcileStep::RefetchPodManager).await? else {
            info!("PodManager {} deleted before its status could be published", key);
            return Ok(());
        };

        if !status_needs_update(latest.status.as_ref(), &desired) {
            debug!("PodManager {} status already up to date", key);
            return Ok(());
        }

        let available = desired.available_replicas;
        latest.status = Some(desired);
        match self.client.replace_pod_manager_status(ctx, &latest).await {
            Ok(_) => {
                info!("Updated PodManager {} status: {} available replicas", key, available);
                Ok(())
            }
            Err(e) => {
                error!("Failed to update PodManager {} status: {}", key, e);
                Err(ControllerError::StatusUpdate {
                    key: key.clone(),
                    source: e,
                })
            }
        }
    }
}
