//! kubewright core types: closed enums, error taxonomy, status codes

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod enums;
mod error;
mod status;

pub use enums::*;
pub use error::{Error, Result};
pub use status::{JobStatus, PodStatus, PHASE_FAILED, PHASE_RUNNING, PHASE_SUCCEEDED, PHASE_UNKNOWN};

/// Coordinates of a custom resource collection: `(group, version, plural)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomObjectDef {
    group: String,
    version: String,
    plural: String,
    /// Optional kind; only used to label the typed `ApiResource`.
    kind: String,
}

impl CustomObjectDef {
    pub fn new(group: impl Into<String>, version: impl Into<String>, plural: impl Into<String>) -> Result<Self> {
        let def = Self { group: group.into(), version: version.into(), plural: plural.into(), kind: String::new() };
        for (field, v) in [("group", &def.group), ("version", &def.version), ("plural", &def.plural)] {
            if v.is_empty() {
                return Err(Error::invalid(format!("custom object `{field}` must not be empty")));
            }
        }
        Ok(def)
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn group(&self) -> &str { &self.group }
    pub fn version(&self) -> &str { &self.version }
    pub fn plural(&self) -> &str { &self.plural }
    pub fn kind(&self) -> &str { &self.kind }

    /// `group/version`
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// Render a label map as a selector string: `k1=v1,k2=v2` in key order.
pub fn dict_to_labels(labels: &BTreeMap<String, String>) -> String {
    labels.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",")
}

pub mod prelude {
    pub use super::{dict_to_labels, CustomObjectDef, Error, JobStatus, PodStatus, Result};
    pub use super::{
        ConcurrencyPolicy, ImagePullPolicy, IngressRulePathType, MatchExprOperator, PodManagementPolicy,
        Protocol, PvcAccessMode, RestartPolicy, RetentionPolicy, SecretType, ServiceType,
        StatefulSetUpdateStrategy, UpdateStrategy, VolumeMode,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_object_def_rejects_empty_parts() {
        assert!(CustomObjectDef::new("stable.example.com", "v1", "crontabs").is_ok());
        for (g, v, p) in [("", "v1", "x"), ("g", "", "x"), ("g", "v1", "")] {
            let err = CustomObjectDef::new(g, v, p).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn custom_object_def_api_version() {
        let d = CustomObjectDef::new("stable.example.com", "v1", "crontabs").unwrap().with_kind("CronTab");
        assert_eq!(d.api_version(), "stable.example.com/v1");
        assert_eq!(d.kind(), "CronTab");
    }

    #[test]
    fn dict_to_labels_is_key_ordered() {
        let mut m = BTreeMap::new();
        m.insert("tier".to_string(), "web".to_string());
        m.insert("app".to_string(), "shop".to_string());
        assert_eq!(dict_to_labels(&m), "app=shop,tier=web");
        assert_eq!(dict_to_labels(&BTreeMap::new()), "");
    }
}
