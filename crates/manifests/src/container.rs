use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, EnvVar, ExecAction, HTTPGetAction, Probe, ResourceRequirements,
    TCPSocketAction, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kubewright_core::{ImagePullPolicy, IntoChoice, Protocol, Result};

use crate::helpers::IntOrStr;
use crate::meta::str_map;
use crate::ManifestBuilder;

fn quantities(m: BTreeMap<String, String>) -> BTreeMap<String, Quantity> {
    m.into_iter().map(|(k, v)| (k, Quantity(v))).collect()
}

/// Single container definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBuilder {
    c: Container,
}

impl ContainerBuilder {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self { c: Container { name: name.into(), image: Some(image.into()), ..Default::default() } }
    }

    pub fn name(&self) -> &str {
        &self.c.name
    }

    pub fn set_image_pull_policy(&mut self, policy: impl IntoChoice<ImagePullPolicy>) -> Result<&mut Self> {
        self.c.image_pull_policy = Some(policy.into_choice()?.to_string());
        Ok(self)
    }

    pub fn set_command<I, S>(&mut self, command: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.c.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.c.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_working_dir(&mut self, dir: impl Into<String>) -> &mut Self {
        self.c.working_dir = Some(dir.into());
        self
    }

    /// Literal env var; a later value for the same name replaces the earlier one.
    pub fn add_env(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.add_env_var(EnvVar { name: name.into(), value: Some(value.to_string()), value_from: None })
    }

    /// Env var from a prebuilt definition (see the `env_from_*_ref` helpers).
    pub fn add_env_var(&mut self, var: EnvVar) -> &mut Self {
        let env = self.c.env.get_or_insert_with(Vec::new);
        match env.iter_mut().find(|e| e.name == var.name) {
            Some(slot) => *slot = var,
            None => env.push(var),
        }
        self
    }

    pub fn add_env_from(&mut self, source: EnvFromSource) -> &mut Self {
        let from = self.c.env_from.get_or_insert_with(Vec::new);
        if !from.contains(&source) {
            from.push(source);
        }
        self
    }

    /// Ports are keyed by name; the first definition wins.
    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        port: i32,
        protocol: Option<impl IntoChoice<Protocol>>,
    ) -> Result<&mut Self> {
        let protocol: Option<Protocol> = protocol.map(|p| p.into_choice()).transpose()?;
        let name = name.into();
        let ports = self.c.ports.get_or_insert_with(Vec::new);
        if ports.iter().any(|p| p.name.as_deref() == Some(name.as_str())) {
            return Ok(self);
        }
        ports.push(ContainerPort {
            name: Some(name),
            container_port: port,
            protocol: protocol.map(|p| p.to_string()),
            ..Default::default()
        });
        Ok(self)
    }

    pub fn add_volume_mount(
        &mut self,
        name: impl Into<String>,
        mount_path: impl Into<String>,
        read_only: bool,
        sub_path: Option<&str>,
    ) -> &mut Self {
        let mount = VolumeMount {
            name: name.into(),
            mount_path: mount_path.into(),
            read_only: read_only.then_some(true),
            sub_path: sub_path.map(str::to_string),
            ..Default::default()
        };
        let mounts = self.c.volume_mounts.get_or_insert_with(Vec::new);
        if !mounts.iter().any(|m| m.mount_path == mount.mount_path) {
            mounts.push(mount);
        }
        self
    }

    pub fn set_resource_requests<I, K, V>(&mut self, requests: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let q = quantities(str_map(requests)?);
        self.c.resources.get_or_insert_with(ResourceRequirements::default).requests = Some(q);
        Ok(self)
    }

    pub fn set_resource_limits<I, K, V>(&mut self, limits: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let q = quantities(str_map(limits)?);
        self.c.resources.get_or_insert_with(ResourceRequirements::default).limits = Some(q);
        Ok(self)
    }

    pub fn set_liveness_probe(&mut self, probe: Probe) -> &mut Self {
        self.c.liveness_probe = Some(probe);
        self
    }

    pub fn set_readiness_probe(&mut self, probe: Probe) -> &mut Self {
        self.c.readiness_probe = Some(probe);
        self
    }

    pub fn set_startup_probe(&mut self, probe: Probe) -> &mut Self {
        self.c.startup_probe = Some(probe);
        self
    }

    pub(crate) fn container(&self) -> Container {
        self.c.clone()
    }
}

impl ManifestBuilder for ContainerBuilder {
    type Object = Container;

    fn manifest(&self) -> Result<Container> {
        Ok(self.container())
    }
}

/// Consuming builder for liveness/readiness/startup probes.
#[derive(Debug, Clone, Default)]
pub struct ProbeBuilder {
    probe: Probe,
}

impl ProbeBuilder {
    pub fn exec<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let exec = ExecAction { command: Some(command.into_iter().map(Into::into).collect()) };
        Self { probe: Probe { exec: Some(exec), ..Default::default() } }
    }

    pub fn http_get(path: impl Into<String>, port: impl Into<IntOrStr>) -> Self {
        let get = HTTPGetAction { path: Some(path.into()), port: port.into().into(), ..Default::default() };
        Self { probe: Probe { http_get: Some(get), ..Default::default() } }
    }

    pub fn tcp(port: impl Into<IntOrStr>) -> Self {
        let tcp = TCPSocketAction { host: None, port: port.into().into() };
        Self { probe: Probe { tcp_socket: Some(tcp), ..Default::default() } }
    }

    pub fn initial_delay(mut self, seconds: i32) -> Self {
        self.probe.initial_delay_seconds = Some(seconds);
        self
    }

    pub fn period(mut self, seconds: i32) -> Self {
        self.probe.period_seconds = Some(seconds);
        self
    }

    pub fn timeout(mut self, seconds: i32) -> Self {
        self.probe.timeout_seconds = Some(seconds);
        self
    }

    pub fn failure_threshold(mut self, n: i32) -> Self {
        self.probe.failure_threshold = Some(n);
        self
    }

    pub fn success_threshold(mut self, n: i32) -> Self {
        self.probe.success_threshold = Some(n);
        self
    }

    pub fn build(self) -> Probe {
        self.probe
    }
}
