//! PodManager Controller
//!
//! Keeps a Deployment in step with every PodManager resource:
//! - Creates the Deployment on first sight and scales it when `spec.replicas` changes
//! - Publishes the observed pod count on the PodManager status when a restart policy is set
//!
//! Deleting a PodManager needs no action; its Deployment is garbage-collected
//! through the owner reference.

mod backoff;
mod config;
mod controller;
mod error;
mod probes;
mod reconcile_helpers;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube's TLS stack needs a process-wide crypto provider; an error means one is already set
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting PodManager Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Concurrency: {}", config.concurrency);
    info!("  Debounce: {}s", config.debounce.as_secs());
    info!("  Reconcile timeout: {}s", config.reconcile_timeout.as_secs());
    info!("  Backoff: {}s..{}s", config.backoff_min.as_secs(), config.backoff_max.as_secs());
    info!("  Probe address: {}", config.probe_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
