//! Prints the PodManager CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/podmanager.yaml`

use anyhow::Result;
use crds::PodManager;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&PodManager::crd())?);
    Ok(())
}
