//! Free-standing constructors for env vars, env sources and volumes.

use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, ConfigMapKeySelector, ConfigMapVolumeSource, EmptyDirVolumeSource, EnvFromSource, EnvVar,
    EnvVarSource, ObjectFieldSelector, PersistentVolumeClaimVolumeSource, SecretEnvSource, SecretKeySelector,
    SecretVolumeSource, Volume,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Port number or port name (also used for percentages like `"25%"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntOrStr {
    Int(i32),
    Str(String),
}

impl From<i32> for IntOrStr {
    fn from(v: i32) -> Self {
        IntOrStr::Int(v)
    }
}

impl From<&str> for IntOrStr {
    fn from(v: &str) -> Self {
        IntOrStr::Str(v.to_string())
    }
}

impl From<String> for IntOrStr {
    fn from(v: String) -> Self {
        IntOrStr::Str(v)
    }
}

impl From<IntOrStr> for IntOrString {
    fn from(v: IntOrStr) -> Self {
        match v {
            IntOrStr::Int(i) => IntOrString::Int(i),
            IntOrStr::Str(s) => IntOrString::String(s),
        }
    }
}

/// All keys of a ConfigMap as env vars.
pub fn env_from_configmap(name: impl Into<String>) -> EnvFromSource {
    EnvFromSource {
        config_map_ref: Some(ConfigMapEnvSource { name: Some(name.into()), optional: None }),
        ..Default::default()
    }
}

/// All keys of a Secret as env vars.
pub fn env_from_secret(name: impl Into<String>) -> EnvFromSource {
    EnvFromSource {
        secret_ref: Some(SecretEnvSource { name: Some(name.into()), optional: None }),
        ..Default::default()
    }
}

pub fn env_from_configmap_key_ref(
    env_name: impl Into<String>,
    configmap: impl Into<String>,
    key: impl Into<String>,
) -> EnvVar {
    EnvVar {
        name: env_name.into(),
        value: None,
        value_from: Some(EnvVarSource {
            config_map_key_ref: Some(ConfigMapKeySelector {
                key: key.into(),
                name: Some(configmap.into()),
                optional: None,
            }),
            ..Default::default()
        }),
    }
}

pub fn env_from_secret_key_ref(env_name: impl Into<String>, secret: impl Into<String>, key: impl Into<String>) -> EnvVar {
    EnvVar {
        name: env_name.into(),
        value: None,
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector { key: key.into(), name: Some(secret.into()), optional: None }),
            ..Default::default()
        }),
    }
}

/// Downward API field, e.g. `metadata.namespace` or `status.podIP`.
pub fn env_from_field_ref(env_name: impl Into<String>, field_path: impl Into<String>) -> EnvVar {
    EnvVar {
        name: env_name.into(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector { api_version: None, field_path: field_path.into() }),
            ..Default::default()
        }),
    }
}

pub fn empty_dir(name: impl Into<String>, medium: Option<&str>, size_limit: Option<&str>) -> Volume {
    Volume {
        name: name.into(),
        empty_dir: Some(EmptyDirVolumeSource {
            medium: medium.map(str::to_string),
            size_limit: size_limit.map(|s| Quantity(s.to_string())),
        }),
        ..Default::default()
    }
}

pub fn volume_from_configmap(name: impl Into<String>, configmap: impl Into<String>) -> Volume {
    Volume {
        name: name.into(),
        config_map: Some(ConfigMapVolumeSource { name: Some(configmap.into()), ..Default::default() }),
        ..Default::default()
    }
}

pub fn volume_from_secret(name: impl Into<String>, secret: impl Into<String>) -> Volume {
    Volume {
        name: name.into(),
        secret: Some(SecretVolumeSource { secret_name: Some(secret.into()), ..Default::default() }),
        ..Default::default()
    }
}

pub fn volume_from_pvc(name: impl Into<String>, claim: impl Into<String>, read_only: bool) -> Volume {
    Volume {
        name: name.into(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim.into(),
            read_only: read_only.then_some(true),
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_refs_serialize_to_value_from() {
        let v = serde_json::to_value(env_from_secret_key_ref("DB_PASS", "db", "password")).unwrap();
        assert_eq!(
            v,
            json!({"name": "DB_PASS", "valueFrom": {"secretKeyRef": {"name": "db", "key": "password"}}})
        );
        let v = serde_json::to_value(env_from_field_ref("NS", "metadata.namespace")).unwrap();
        assert_eq!(v["valueFrom"]["fieldRef"]["fieldPath"], "metadata.namespace");
    }

    #[test]
    fn volumes_carry_their_source() {
        let v = serde_json::to_value(volume_from_configmap("cfg", "app-config")).unwrap();
        assert_eq!(v, json!({"name": "cfg", "configMap": {"name": "app-config"}}));
        let v = serde_json::to_value(empty_dir("scratch", Some("Memory"), Some("64Mi"))).unwrap();
        assert_eq!(v["emptyDir"], json!({"medium": "Memory", "sizeLimit": "64Mi"}));
        let v = serde_json::to_value(volume_from_pvc("data", "data-0", false)).unwrap();
        assert_eq!(v["persistentVolumeClaim"], json!({"claimName": "data-0"}));
    }

    #[test]
    fn int_or_str_maps_to_api_type() {
        assert_eq!(IntOrString::from(IntOrStr::from(80)), IntOrString::Int(80));
        assert_eq!(IntOrString::from(IntOrStr::from("http")), IntOrString::String("http".into()));
    }
}
