//! Helper functions for the status step of reconciliation.

use crds::PodManagerStatus;
use k8s_openapi::api::core::v1::Pod;

/// Number of pods observed for a PodManager, saturating at `i32::MAX`.
#[must_use]
pub fn available_replicas(pods: &[Pod]) -> i32 {
    i32::try_from(pods.len()).unwrap_or(i32::MAX)
}

/// Check if the stored status differs from the one about to be written.
///
/// Skipping identical writes keeps a steady-state reconcile free of mutations.
#[must_use]
pub fn status_needs_update(current: Option<&PodManagerStatus>, desired: &PodManagerStatus) -> bool {
    current != Some(desired)
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;
