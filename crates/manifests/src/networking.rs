use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec, TypedLocalObjectReference};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend, IngressSpec,
    IngressTLS, ServiceBackendPort,
};
use kubewright_core::{Error, IngressRulePathType, IntoChoice, Protocol, Result, ServiceType};

use crate::helpers::IntOrStr;
use crate::meta::{impl_with_metadata, str_map, MetaMixin};
use crate::ManifestBuilder;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceBuilder {
    meta: MetaMixin,
    spec: ServiceSpec,
}

impl_with_metadata!(ServiceBuilder, meta);

impl ServiceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: MetaMixin::new(name), spec: ServiceSpec::default() }
    }

    pub fn set_selector<I, K, V>(&mut self, selector: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.spec.selector = Some(str_map(selector)?);
        Ok(self)
    }

    pub fn set_type(&mut self, typ: impl IntoChoice<ServiceType>) -> Result<&mut Self> {
        self.spec.type_ = Some(typ.into_choice()?.to_string());
        Ok(self)
    }

    /// `"None"` gives a headless service.
    pub fn set_cluster_ip(&mut self, ip: impl Into<String>) -> &mut Self {
        self.spec.cluster_ip = Some(ip.into());
        self
    }

    pub fn set_external_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.spec.external_name = Some(name.into());
        self
    }

    /// Ports are keyed by name; the first definition wins.
    #[allow(clippy::too_many_arguments)]
    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        port: i32,
        target: impl Into<IntOrStr>,
        protocol: Option<Protocol>,
        node_port: Option<i32>,
        app_protocol: Option<&str>,
    ) -> &mut Self {
        let name = name.into();
        let ports = self.spec.ports.get_or_insert_with(Vec::new);
        if ports.iter().any(|p| p.name.as_deref() == Some(name.as_str())) {
            return self;
        }
        ports.push(ServicePort {
            name: Some(name),
            port,
            target_port: Some(target.into().into()),
            protocol: protocol.map(|p| p.to_string()),
            node_port,
            app_protocol: app_protocol.map(str::to_string),
            ..Default::default()
        });
        self
    }
}

impl ManifestBuilder for ServiceBuilder {
    type Object = Service;

    fn manifest(&self) -> Result<Service> {
        Ok(Service { metadata: self.meta.object_meta(), spec: Some(self.spec.clone()), status: None })
    }
}

/// Target of an ingress path or the default backend: a typed object reference
/// or a `(service, port)` pair. An integer port maps to `number`, a string to `name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendSpec {
    pub service_name: Option<String>,
    pub service_port: Option<IntOrStr>,
    pub resource: Option<TypedLocalObjectReference>,
}

impl BackendSpec {
    pub fn service(name: impl Into<String>, port: impl Into<IntOrStr>) -> Self {
        Self { service_name: Some(name.into()), service_port: Some(port.into()), resource: None }
    }

    pub fn resource(reference: TypedLocalObjectReference) -> Self {
        Self { resource: Some(reference), ..Default::default() }
    }

    fn resolve(&self) -> Result<IngressBackend> {
        if let Some(r) = &self.resource {
            return Ok(IngressBackend { resource: Some(r.clone()), service: None });
        }
        let name = self
            .service_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::invalid("required service_name and port or object reference"))?;
        let port = self
            .service_port
            .as_ref()
            .ok_or_else(|| Error::invalid("required both arguments service_name and port"))?;
        let port = match port {
            IntOrStr::Int(n) => ServiceBackendPort { number: Some(*n), name: None },
            IntOrStr::Str(s) => ServiceBackendPort { name: Some(s.clone()), number: None },
        };
        Ok(IngressBackend {
            resource: None,
            service: Some(IngressServiceBackend { name: name.to_string(), port: Some(port) }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngressBuilder {
    meta: MetaMixin,
    spec: IngressSpec,
}

impl_with_metadata!(IngressBuilder, meta);

impl IngressBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: MetaMixin::new(name), spec: IngressSpec::default() }
    }

    pub fn set_default_backend(&mut self, backend: &BackendSpec) -> Result<&mut Self> {
        self.spec.default_backend = Some(backend.resolve()?);
        Ok(self)
    }

    pub fn set_ingress_class_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.spec.ingress_class_name = Some(name.into());
        self
    }

    /// Rules are bucketed by host. Re-adding a `(host, path)` pair is a no-op;
    /// a new path on a known host joins that host's rule.
    pub fn add_rule(
        &mut self,
        host: impl Into<String>,
        path: impl Into<String>,
        path_type: impl IntoChoice<IngressRulePathType>,
        backend: &BackendSpec,
    ) -> Result<&mut Self> {
        let path_type = path_type.into_choice()?;
        let entry = HTTPIngressPath {
            backend: backend.resolve()?,
            path: Some(path.into()),
            path_type: path_type.to_string(),
        };
        let host = host.into();
        let rules = self.spec.rules.get_or_insert_with(Vec::new);
        match rules.iter_mut().find(|r| r.host.as_deref() == Some(host.as_str())) {
            Some(rule) => {
                let http = rule.http.get_or_insert_with(HTTPIngressRuleValue::default);
                if !http.paths.iter().any(|p| p.path == entry.path) {
                    http.paths.push(entry);
                }
            }
            None => rules.push(IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue { paths: vec![entry] }),
            }),
        }
        Ok(self)
    }

    /// TLS entries are keyed by secret name; the first one wins.
    pub fn add_tls<I, S>(&mut self, hosts: I, secret_name: impl Into<String>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let secret_name = secret_name.into();
        let tls = self.spec.tls.get_or_insert_with(Vec::new);
        if tls.iter().any(|t| t.secret_name.as_deref() == Some(secret_name.as_str())) {
            return self;
        }
        tls.push(IngressTLS {
            hosts: Some(hosts.into_iter().map(Into::into).collect()),
            secret_name: Some(secret_name),
        });
        self
    }
}

impl ManifestBuilder for IngressBuilder {
    type Object = Ingress;

    fn manifest(&self) -> Result<Ingress> {
        Ok(Ingress { metadata: self.meta.object_meta(), spec: Some(self.spec.clone()), status: None })
    }
}
