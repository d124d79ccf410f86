//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the state store
//! client, reconciler, watcher and probe server together and supervises them.

use crate::backoff::BackoffTracker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::probes::{self, ProbeState};
use crate::reconciler::Reconciler;
use crate::watcher::{self, Context};
use cluster_client::KubeClusterClient;
use crds::PodManager;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main controller for PodManager resources.
pub struct Controller {
    pod_manager_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
    probe_state: ProbeState,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing PodManager Controller");

        let kube_client = Client::try_default().await?;

        let (pod_manager_api, deployment_api): (Api<PodManager>, Api<Deployment>) = match config.namespace.as_deref() {
            Some(ns) => (Api::namespaced(kube_client.clone(), ns), Api::namespaced(kube_client.clone(), ns)),
            None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
        };

        let reconciler = Reconciler::new(Box::new(KubeClusterClient::new(kube_client)));
        let shutdown = CancellationToken::new();
        let context = Arc::new(Context::new(
            reconciler,
            BackoffTracker::new(config.backoff_min, config.backoff_max),
            shutdown.clone(),
            config.reconcile_timeout,
        ));

        let probe_state = ProbeState::default();
        let probe_server = {
            let state = probe_state.clone();
            let token = shutdown.clone();
            let addr = config.probe_addr;
            tokio::spawn(async move { probes::serve(addr, state, token).await })
        };

        let pod_manager_watcher = {
            let state = probe_state.clone();
            tokio::spawn(async move {
                watcher::watch_pod_managers(pod_manager_api, deployment_api, context, &config, state).await
            })
        };

        Ok(Self {
            pod_manager_watcher,
            probe_server,
            probe_state,
            shutdown,
        })
    }

    /// Runs until the watcher stops (on SIGINT/SIGTERM) or a task fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("PodManager Controller running");

        let result = tokio::select! {
            result = &mut self.pod_manager_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("PodManager watcher panicked: {}", e)))?
            }
            result = &mut self.probe_server => {
                result.map_err(|e| ControllerError::Probe(format!("probe server panicked: {}", e)))?
            }
        };

        info!("PodManager Controller shutting down");
        self.probe_state.set_ready(false);
        self.shutdown.cancel();
        result
    }
}
