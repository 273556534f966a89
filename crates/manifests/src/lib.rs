//! kubewright manifests: fluent builders emitting typed `k8s-openapi` objects.
//!
//! Builders are mutable and reusable. [`ManifestBuilder::manifest`] returns an
//! independent deep copy, so emitting twice yields identical objects and later
//! mutations never leak into objects already handed out.

#![forbid(unsafe_code)]

use kubewright_core::Result;

mod batch;
mod cluster;
mod container;
mod data;
mod helpers;
mod meta;
mod networking;
mod pod;
mod selector;
mod storage;
mod workloads;

pub use batch::{CronJobBuilder, JobBuilder, JobTemplateBuilder};
pub use cluster::{
    ClusterRoleBindingBuilder, ClusterRoleBuilder, NamespaceBuilder, RoleBindingBuilder, RoleBuilder,
    ServiceAccountBuilder,
};
pub use container::{ContainerBuilder, ProbeBuilder};
pub use data::{ConfigMapBuilder, DataValue, SecretBuilder, SecretImagePull, SecretServiceAccountToken, SecretTls};
pub use helpers::{
    empty_dir, env_from_configmap, env_from_configmap_key_ref, env_from_field_ref, env_from_secret,
    env_from_secret_key_ref, volume_from_configmap, volume_from_pvc, volume_from_secret, IntOrStr,
};
pub use meta::{MetaMixin, WithMetadata};
pub use networking::{BackendSpec, IngressBuilder, ServiceBuilder};
pub use pod::{PodBuilder, PodSpecBuilder, PodTemplateBuilder};
pub use selector::LabelSelectorBuilder;
pub use storage::PvcBuilder;
pub use workloads::{DeploymentBuilder, StatefulSetBuilder};

/// A builder that can emit a finished API object.
pub trait ManifestBuilder {
    type Object;

    /// Emit a fresh copy of the object. Emit-time checks (required fields)
    /// surface as `Error::InvalidArgument`.
    fn manifest(&self) -> Result<Self::Object>;
}
