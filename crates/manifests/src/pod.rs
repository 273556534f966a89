use k8s_openapi::api::core::v1::{LocalObjectReference, Pod, PodSpec, PodTemplateSpec, Toleration, Volume};
use kubewright_core::{IntoChoice, RestartPolicy, Result};

use crate::container::ContainerBuilder;
use crate::meta::{impl_with_metadata, str_map, MetaMixin};
use crate::ManifestBuilder;

/// Pod spec: containers plus the pod-level knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PodSpecBuilder {
    containers: Vec<ContainerBuilder>,
    init_containers: Vec<ContainerBuilder>,
    spec: PodSpec,
}

impl PodSpecBuilder {
    pub fn new(container: ContainerBuilder) -> Self {
        Self { containers: vec![container], init_containers: Vec::new(), spec: PodSpec::default() }
    }

    /// Containers are keyed by name; the first one added wins.
    pub fn add_container(&mut self, container: ContainerBuilder) -> &mut Self {
        if !self.containers.iter().any(|c| c.name() == container.name()) {
            self.containers.push(container);
        }
        self
    }

    pub fn add_init_container(&mut self, container: ContainerBuilder) -> &mut Self {
        if !self.init_containers.iter().any(|c| c.name() == container.name()) {
            self.init_containers.push(container);
        }
        self
    }

    pub fn container_mut(&mut self, name: &str) -> Option<&mut ContainerBuilder> {
        self.containers.iter_mut().find(|c| c.name() == name)
    }

    /// Volumes are keyed by name; the first one added wins.
    pub fn add_volume(&mut self, volume: Volume) -> &mut Self {
        let volumes = self.spec.volumes.get_or_insert_with(Vec::new);
        if !volumes.iter().any(|v| v.name == volume.name) {
            volumes.push(volume);
        }
        self
    }

    pub fn set_node_selector<I, K, V>(&mut self, selector: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.spec.node_selector = Some(str_map(selector)?);
        Ok(self)
    }

    pub fn set_service_account_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.spec.service_account_name = Some(name.into());
        self
    }

    pub fn set_restart_policy(&mut self, policy: impl IntoChoice<RestartPolicy>) -> Result<&mut Self> {
        self.spec.restart_policy = Some(policy.into_choice()?.to_string());
        Ok(self)
    }

    pub(crate) fn restart_policy(&mut self, policy: RestartPolicy) -> &mut Self {
        self.spec.restart_policy = Some(policy.to_string());
        self
    }

    pub fn add_image_pull_secret(&mut self, name: impl Into<String>) -> &mut Self {
        let r = LocalObjectReference { name: Some(name.into()) };
        let secrets = self.spec.image_pull_secrets.get_or_insert_with(Vec::new);
        if !secrets.contains(&r) {
            secrets.push(r);
        }
        self
    }

    pub fn set_host_network(&mut self, on: bool) -> &mut Self {
        self.spec.host_network = Some(on);
        self
    }

    pub fn set_termination_grace_period(&mut self, seconds: i64) -> &mut Self {
        self.spec.termination_grace_period_seconds = Some(seconds);
        self
    }

    pub fn add_toleration(&mut self, toleration: Toleration) -> &mut Self {
        self.spec.tolerations.get_or_insert_with(Vec::new).push(toleration);
        self
    }

    pub(crate) fn pod_spec(&self) -> PodSpec {
        let mut spec = self.spec.clone();
        spec.containers = self.containers.iter().map(ContainerBuilder::container).collect();
        if !self.init_containers.is_empty() {
            spec.init_containers = Some(self.init_containers.iter().map(ContainerBuilder::container).collect());
        }
        spec
    }
}

impl ManifestBuilder for PodSpecBuilder {
    type Object = PodSpec;

    fn manifest(&self) -> Result<PodSpec> {
        Ok(self.pod_spec())
    }
}

/// Pod template: pod spec plus the template's own labels and annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct PodTemplateBuilder {
    meta: MetaMixin,
    spec: PodSpecBuilder,
}

impl PodTemplateBuilder {
    pub fn new(container: ContainerBuilder) -> Self {
        Self { meta: MetaMixin::anonymous(), spec: PodSpecBuilder::new(container) }
    }

    pub fn spec_mut(&mut self) -> &mut PodSpecBuilder {
        &mut self.spec
    }

    pub fn set_pod_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.meta.set_labels(str_map(labels)?);
        Ok(self)
    }

    pub fn set_pod_annotations<I, K, V>(&mut self, annotations: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.meta.set_annotations(str_map(annotations)?);
        Ok(self)
    }

    pub fn pod_labels(&self) -> Option<&std::collections::BTreeMap<String, String>> {
        self.meta.labels()
    }

    pub(crate) fn template(&self) -> PodTemplateSpec {
        PodTemplateSpec { metadata: self.meta.object_meta_opt(), spec: Some(self.spec.pod_spec()) }
    }
}

impl ManifestBuilder for PodTemplateBuilder {
    type Object = PodTemplateSpec;

    fn manifest(&self) -> Result<PodTemplateSpec> {
        Ok(self.template())
    }
}

/// Standalone pod.
#[derive(Debug, Clone, PartialEq)]
pub struct PodBuilder {
    meta: MetaMixin,
    spec: PodSpecBuilder,
}

impl_with_metadata!(PodBuilder, meta);

impl PodBuilder {
    pub fn new(name: impl Into<String>, container: ContainerBuilder) -> Self {
        Self { meta: MetaMixin::new(name), spec: PodSpecBuilder::new(container) }
    }

    pub fn spec_mut(&mut self) -> &mut PodSpecBuilder {
        &mut self.spec
    }
}

impl ManifestBuilder for PodBuilder {
    type Object = Pod;

    fn manifest(&self) -> Result<Pod> {
        Ok(Pod { metadata: self.meta.object_meta(), spec: Some(self.spec.pod_spec()), status: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::volume_from_secret;
    use crate::WithMetadata;

    #[test]
    fn pod_composes_containers_and_volumes() {
        let mut pod = PodBuilder::new("toolbox", ContainerBuilder::new("main", "busybox"));
        pod.set_labels([("app", "toolbox")]).unwrap();
        pod.spec_mut()
            .add_container(ContainerBuilder::new("sidecar", "envoy"))
            .add_container(ContainerBuilder::new("main", "ignored"))
            .add_volume(volume_from_secret("certs", "tls"))
            .add_volume(volume_from_secret("certs", "other"))
            .add_image_pull_secret("regcred")
            .add_image_pull_secret("regcred");
        pod.spec_mut().set_restart_policy("Never").unwrap();

        let out = pod.manifest().unwrap();
        assert_eq!(out.metadata.name.as_deref(), Some("toolbox"));
        let spec = out.spec.unwrap();
        assert_eq!(spec.containers.len(), 2);
        assert_eq!(spec.containers[0].image.as_deref(), Some("busybox"));
        assert_eq!(spec.volumes.unwrap().len(), 1);
        assert_eq!(spec.image_pull_secrets.unwrap().len(), 1);
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
    }

    #[test]
    fn container_edits_after_add_are_visible() {
        let mut pod = PodBuilder::new("p", ContainerBuilder::new("main", "busybox"));
        pod.spec_mut().container_mut("main").unwrap().set_args(["sleep", "3600"]);
        let c = &pod.manifest().unwrap().spec.unwrap().containers[0];
        assert_eq!(c.args.as_deref(), Some(&["sleep".to_string(), "3600".to_string()][..]));
    }

    #[test]
    fn template_without_meta_omits_metadata() {
        let t = PodTemplateBuilder::new(ContainerBuilder::new("main", "busybox"));
        assert!(t.manifest().unwrap().metadata.is_none());
    }
}
