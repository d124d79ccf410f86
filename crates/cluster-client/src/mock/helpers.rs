//! Helper functions shared by the mock store modules

use crate::error::StoreError;
use crate::key::ObjectKey;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;

/// Key of an object passed to a store call
pub fn key_of<K: Resource>(object: &K) -> Result<ObjectKey, StoreError> {
    ObjectKey::from_resource(object)
        .ok_or_else(|| StoreError::Api("object is missing metadata.name or metadata.namespace".to_string()))
}

/// Key of an object handed to a setup helper
pub fn require_key<K: Resource>(object: &K) -> ObjectKey {
    ObjectKey::from_resource(object).unwrap_or_else(|| panic!("test fixture is missing name or namespace"))
}

/// Equality-based selector match: every selector label is present with the same value
pub fn labels_match(selector: &BTreeMap<String, String>, labels: Option<&BTreeMap<String, String>>) -> bool {
    selector.iter().all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
}

/// Returns true if `meta` has an owner reference to `owner_uid`
pub fn is_owned_by(meta: &ObjectMeta, owner_uid: &str) -> bool {
    meta.owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.uid == owner_uid))
}

/// Reject a write whose resourceVersion does not match the stored one
pub fn check_version(stored: &ObjectMeta, incoming: &ObjectMeta, key: &ObjectKey) -> Result<(), StoreError> {
    if stored.resource_version == incoming.resource_version {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!(
            "Operation cannot be fulfilled on {}: the object has been modified; please apply your changes to the latest version and try again",
            key
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match() {
        let selector = BTreeMap::from([("app".to_string(), "web".to_string())]);
        let matching = BTreeMap::from([
            ("app".to_string(), "web".to_string()),
            ("pod-template-hash".to_string(), "abc".to_string()),
        ]);
        let other = BTreeMap::from([("app".to_string(), "db".to_string())]);

        assert!(labels_match(&selector, Some(&matching)));
        assert!(!labels_match(&selector, Some(&other)));
        assert!(!labels_match(&selector, None));
        assert!(labels_match(&BTreeMap::new(), None));
    }
}
