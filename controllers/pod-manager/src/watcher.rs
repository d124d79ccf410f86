//! Kubernetes resource watcher.
//!
//! Drives the reconciler from PodManager events using `kube_runtime::Controller`.
//! Deployments are watched through their owner reference, so a change to a
//! managed Deployment requeues the PodManager that owns it. The controller
//! queue debounces bursts and never reconciles one PodManager concurrently
//! with itself.

use crate::backoff::BackoffTracker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::probes::ProbeState;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use cluster_client::{CallContext, ObjectKey};
use crds::PodManager;
use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube_runtime::controller::{self, Action, Config as RuntimeConfig};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

/// Shared state handed to every reconciliation.
pub struct Context {
    reconciler: Reconciler,
    backoff: BackoffTracker,
    shutdown: CancellationToken,
    reconcile_timeout: Duration,
}

impl Context {
    pub fn new(
        reconciler: Reconciler,
        backoff: BackoffTracker,
        shutdown: CancellationToken,
        reconcile_timeout: Duration,
    ) -> Self {
        Self {
            reconciler,
            backoff,
            shutdown,
            reconcile_timeout,
        }
    }

    /// Per-reconcile call context: cancelled on shutdown, bounded by the timeout.
    fn call_context(&self) -> CallContext {
        CallContext::new(self.shutdown.child_token()).with_timeout(self.reconcile_timeout)
    }

    /// Action after a successful pass.
    fn action_for(&self, key: &ObjectKey, outcome: ReconcileOutcome) -> Action {
        self.backoff.reset(key);
        if outcome.requeue {
            Action::requeue(self.backoff.min())
        } else {
            Action::await_change()
        }
    }
}

fn key_for(pod_manager: &PodManager) -> Result<ObjectKey, ControllerError> {
    ObjectKey::from_resource(pod_manager).ok_or_else(|| {
        ControllerError::InvalidResource("PodManager event without name or namespace".to_string())
    })
}

/// Reconcile one PodManager event.
///
/// # Errors
///
/// Propagates the reconciler's error to the error policy.
pub async fn reconcile(pod_manager: Arc<PodManager>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = key_for(&pod_manager)?;
    let outcome = ctx.reconciler.reconcile(&key, &ctx.call_context()).await?;
    Ok(ctx.action_for(&key, outcome))
}

/// Decide when to retry a failed reconciliation.
pub fn error_policy(pod_manager: Arc<PodManager>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let recoverable = error.requeue();
    let delay = match key_for(&pod_manager) {
        Ok(key) => ctx.backoff.delay_for(&key, recoverable),
        Err(_) => ctx.backoff.max(),
    };
    if recoverable {
        warn!("Reconciliation failed, retrying in {}s: {}", delay.as_secs(), error);
    } else {
        error!("Reconciliation failed, retrying in {}s: {}", delay.as_secs(), error);
    }
    Action::requeue(delay)
}

type ControllerResult = Result<(ObjectRef<PodManager>, Action), controller::Error<ControllerError, watcher::Error>>;

/// Level at which a failure from the controller stream is logged.
///
/// Reconcile failures were already reported by `error_policy`, and a
/// missing object has simply been deleted. Anything else (watch or queue
/// failures such as a missing CRD or RBAC denial) is only visible here.
fn stream_error_level(err: &controller::Error<ControllerError, watcher::Error>) -> Level {
    match err {
        controller::Error::ObjectNotFound(_) => Level::DEBUG,
        controller::Error::ReconcilerFailed(..) => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Drive the controller stream to completion, marking the probe state
/// ready while it runs.
///
/// A requeue for a PodManager deleted while failing surfaces as
/// `ObjectNotFound`; its retry state is dropped there since no reconcile
/// will ever reset it.
async fn drain<S>(results: S, probe_state: &ProbeState, backoff: &BackoffTracker)
where
    S: Stream<Item = ControllerResult>,
{
    probe_state.set_ready(true);
    results
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled PodManager {}", obj),
                Err(controller::Error::ObjectNotFound(obj)) => {
                    debug!("PodManager {} no longer exists, dropping its retry state", obj);
                    if let Some(namespace) = obj.namespace.as_deref() {
                        backoff.reset(&ObjectKey::new(namespace, obj.name.as_str()));
                    }
                }
                Err(e) if stream_error_level(&e) == Level::WARN => warn!("PodManager controller error: {}", e),
                Err(e) => error!("PodManager controller error: {}", e),
            }
        })
        .await;
    probe_state.set_ready(false);
}

/// Watch PodManagers (and the Deployments they own) until shutdown.
///
/// # Errors
///
/// Currently always returns `Ok(())` once the event stream ends.
pub async fn watch_pod_managers(
    pod_manager_api: Api<PodManager>,
    deployment_api: Api<Deployment>,
    ctx: Arc<Context>,
    config: &ControllerConfig,
    probe_state: ProbeState,
) -> Result<(), ControllerError> {
    info!("Starting PodManager watcher");

    let runtime_config = RuntimeConfig::default()
        .debounce(config.debounce)
        .concurrency(config.concurrency);

    let results = Controller::new(pod_manager_api, watcher::Config::default())
        .owns(deployment_api, watcher::Config::default())
        .with_config(runtime_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, Arc::clone(&ctx));
    drain(results, &probe_state, &ctx.backoff).await;

    info!("PodManager watcher stopped");
    Ok(())
}
