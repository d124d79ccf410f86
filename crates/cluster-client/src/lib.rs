//! Cluster State Store Client
//!
//! The read/write surface the PodManager controller uses against the cluster:
//! get-by-key, list-by-label-selector, create, update and update-status for
//! the object kinds the controller touches.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{CallContext, ClusterClientTrait, KubeClusterClient, ObjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//! let ctx = CallContext::background();
//!
//! let key = ObjectKey::new("default", "web");
//! let pod_manager = client.get_pod_manager(&ctx, &key).await?;
//! println!("desired replicas: {}", pod_manager.spec.replicas);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed errors**: every failure is classified as not-found, conflict,
//!   already-exists, transient, cancelled or fatal
//! - **Optimistic concurrency**: updates are conditional on the object's
//!   `resourceVersion`
//! - **Cancellation**: every call honours a [`CallContext`]
//! - **Mocking**: an in-memory store behind the `test-util` feature

pub mod client;
pub mod context;
pub mod error;
pub mod key;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use context::CallContext;
pub use error::StoreError;
pub use key::ObjectKey;
#[cfg(feature = "test-util")]
pub use mock::{MockCall, MockClusterClient, Operation};
