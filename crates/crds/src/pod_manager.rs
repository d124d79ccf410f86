//! PodManager CRD
//!
//! Declares how many pods should run and with which restart policy.
//! The controller realizes it as a Deployment of the same name and
//! republishes the observed pod count on the status subresource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Phase string written to status whenever the controller publishes it.
pub const STATUS_RUNNING: &str = "Running";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "example.example.com",
    version = "v1",
    kind = "PodManager",
    namespaced,
    status = "PodManagerStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Available","type":"integer","jsonPath":".status.availableReplicas"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodManagerSpec {
    /// Number of pods to run
    #[serde(default)]
    #[schemars(range(min = 0))]
    pub replicas: i32,

    /// Restart policy for the managed pods
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_restart_policy"
    )]
    #[schemars(schema_with = "restart_policy_schema")]
    pub restart_policy: Option<RestartPolicy>,
}

/// Pod restart policy
///
/// Serializes as the Kubernetes `PodSpec.restartPolicy` values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum RestartPolicy {
    /// Always restart containers
    #[default]
    Always,

    /// Restart containers that exit non-zero
    OnFailure,

    /// Never restart containers
    Never,
}

impl RestartPolicy {
    /// Value as it appears in a pod spec.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::OnFailure => "OnFailure",
            Self::Never => "Never",
        }
    }
}

/// Structural schema for the optional restart policy.
///
/// The derived schema for `Option<enum>` is an `anyOf` without a top-level
/// type, which the API server rejects. The empty string is admitted and
/// decodes as unset.
fn restart_policy_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "description": "Restart policy for the managed pods",
        "type": "string",
        "enum": ["", "Always", "OnFailure", "Never"],
        "nullable": true
    })
}

/// `null`, a missing field and `""` all mean no restart policy.
fn deserialize_restart_policy<'de, D>(deserializer: D) -> Result<Option<RestartPolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => RestartPolicy::deserialize(raw.into_deserializer()).map(Some),
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodManagerStatus {
    /// Number of pods matching the managed Deployment's label
    #[serde(default)]
    pub available_replicas: i32,

    /// Current phase of the PodManager
    #[serde(default)]
    pub status: String,
}

impl PodManagerStatus {
    /// Status published for `available` observed pods.
    #[must_use]
    pub fn running(available: i32) -> Self {
        Self {
            available_replicas: available,
            status: STATUS_RUNNING.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;
    use serde_json::json;

    #[test]
    fn test_spec_defaults_when_fields_absent() {
        let spec: PodManagerSpec = serde_json::from_value(json!({})).unwrap();
        assert_eq!(spec.replicas, 0);
        assert_eq!(spec.restart_policy, None);
    }

    #[test]
    fn test_spec_uses_camel_case() {
        let spec: PodManagerSpec = serde_json::from_value(json!({
            "replicas": 3,
            "restartPolicy": "OnFailure"
        }))
        .unwrap();
        assert_eq!(spec.replicas, 3);
        assert_eq!(spec.restart_policy, Some(RestartPolicy::OnFailure));
    }

    #[test]
    fn test_unknown_restart_policy_is_rejected() {
        let result = serde_json::from_value::<PodManagerSpec>(json!({ "restartPolicy": "Sometimes" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_restart_policy_is_unset() {
        let spec: PodManagerSpec = serde_json::from_value(json!({ "restartPolicy": "" })).unwrap();
        assert_eq!(spec.restart_policy, None);

        let spec: PodManagerSpec = serde_json::from_value(json!({ "restartPolicy": null })).unwrap();
        assert_eq!(spec.restart_policy, None);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let value = serde_json::to_value(PodManagerStatus::running(2)).unwrap();
        assert_eq!(value, json!({ "availableReplicas": 2, "status": "Running" }));
    }

    #[test]
    fn test_crd_metadata() {
        let crd = PodManager::crd();
        assert_eq!(crd.spec.group, "example.example.com");
        assert_eq!(crd.spec.names.kind, "PodManager");
        assert_eq!(crd.spec.names.plural, "podmanagers");
        assert_eq!(crd.spec.scope, "Namespaced");
        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1");
        assert!(version.subresources.as_ref().and_then(|s| s.status.as_ref()).is_some());
    }

    #[test]
    fn test_restart_policy_schema_is_structural() {
        let crd = PodManager::crd();
        let schema = serde_json::to_value(&crd.spec.versions[0].schema).unwrap();
        let policy = &schema["openAPIV3Schema"]["properties"]["spec"]["properties"]["restartPolicy"];

        assert_eq!(policy["type"], "string");
        assert_eq!(policy["nullable"], true);
        assert_eq!(policy["enum"], json!(["", "Always", "OnFailure", "Never"]));
        assert!(policy.get("anyOf").is_none());
        assert!(policy.get("oneOf").is_none());
    }

    #[test]
    fn test_pod_managers_compare_by_value() {
        let spec = PodManagerSpec {
            replicas: 2,
            restart_policy: Some(RestartPolicy::Never),
        };
        let a = PodManager::new("web", spec.clone());
        let mut b = PodManager::new("web", spec);
        assert_eq!(a, b);

        b.status = Some(PodManagerStatus::running(1));
        assert_ne!(a, b);
    }
}
