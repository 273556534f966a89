//! kubewright kubehub: cluster connection settings, client construction and the request wrapper

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use kube::api::Api;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject};
use kube::{Client, Config};
use kubewright_core::{CustomObjectDef, Error, Result};
use serde_json::json;
use tracing::{debug, info};

pub mod wrapper;

pub use wrapper::{classify, foreground_delete, guard, CallKind};

/// Service-account mount inside a pod.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
pub const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";
pub const DEFAULT_NAMESPACE: &str = "default";

/// In-cluster mode needs both service env vars.
pub fn is_in_cluster() -> bool {
    std::env::var_os(SERVICE_HOST_ENV).is_some() && std::env::var_os(SERVICE_PORT_ENV).is_some()
}

/// Namespace file next to the service-account CA certificate.
pub fn in_cluster_namespace_file(sa_dir: &Path) -> PathBuf {
    sa_dir.join("namespace")
}

/// Trimmed contents of the in-cluster namespace file, if readable and non-empty.
pub fn read_in_cluster_namespace(sa_dir: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(in_cluster_namespace_file(sa_dir)).ok()?;
    let ns = raw.trim();
    (!ns.is_empty()).then(|| ns.to_string())
}

/// Where a [`Configuration`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    InCluster,
    Kubeconfig,
    Token,
}

/// Resolved connection parameters: API host, credentials, CA, TLS verification, default namespace.
#[derive(Clone)]
pub struct Configuration {
    config: Config,
    source: ConfigSource,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("host", &self.config.cluster_url.to_string())
            .field("namespace", &self.config.default_namespace)
            .field("verify_ssl", &self.verify_ssl())
            .field("source", &self.source)
            .finish()
    }
}

impl Configuration {
    /// Service-account credentials mounted into the pod.
    pub fn in_cluster() -> Result<Self> {
        let mut config = Config::incluster().map_err(|e| Error::Config(format!("in-cluster config: {e}")))?;
        if let Some(ns) = read_in_cluster_namespace(Path::new(SERVICE_ACCOUNT_DIR)) {
            config.default_namespace = ns;
        }
        Ok(Self { config, source: ConfigSource::InCluster })
    }

    /// Kubeconfig at `$KUBECONFIG` or `~/.kube/config`, optionally pinned to a context.
    pub async fn from_kubeconfig(context: Option<&str>) -> Result<Self> {
        let opts = KubeConfigOptions { context: context.map(str::to_string), ..Default::default() };
        let config = Config::from_kubeconfig(&opts).await.map_err(|e| Error::Config(format!("kubeconfig: {e}")))?;
        Ok(Self { config, source: ConfigSource::Kubeconfig })
    }

    /// Explicit host + bearer token. Without a CA, TLS verification is off.
    pub async fn from_token(host: &str, token: &str, namespace: Option<&str>, ca_cert_pem: Option<&str>) -> Result<Self> {
        let kubeconfig = token_kubeconfig(host, token, namespace, ca_cert_pem)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::Config(format!("token config: {e}")))?;
        Ok(Self { config, source: ConfigSource::Token })
    }

    /// In-cluster when the service env vars are present, else the default kubeconfig.
    pub async fn infer() -> Result<Self> {
        if is_in_cluster() {
            debug!("kubehub: using in-cluster configuration");
            Self::in_cluster()
        } else {
            debug!("kubehub: using kubeconfig");
            Self::from_kubeconfig(None).await
        }
    }

    pub fn from_config(config: Config, source: ConfigSource) -> Self {
        Self { config, source }
    }

    pub fn source(&self) -> ConfigSource {
        self.source
    }

    pub fn host(&self) -> String {
        self.config.cluster_url.to_string()
    }

    pub fn verify_ssl(&self) -> bool {
        !self.config.accept_invalid_certs
    }

    /// Default namespace: in-cluster file, else the current context's, else `default`.
    pub fn default_namespace(&self) -> &str {
        if self.config.default_namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.config.default_namespace
        }
    }

    /// An explicit namespace wins over the configured default.
    pub fn resolve_namespace(&self, explicit: Option<&str>) -> String {
        explicit.filter(|ns| !ns.is_empty()).unwrap_or_else(|| self.default_namespace()).to_string()
    }

    pub fn kube_config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> Result<Client> {
        let client = Client::try_from(self.config.clone())?;
        info!(host = %self.host(), ns = %self.default_namespace(), "kubehub: client ready");
        Ok(client)
    }
}

fn token_kubeconfig(host: &str, token: &str, namespace: Option<&str>, ca_cert_pem: Option<&str>) -> Result<Kubeconfig> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);
    let mut cluster = json!({ "server": host });
    match ca_cert_pem {
        Some(ca) => cluster["certificate-authority-data"] = json!(STANDARD.encode(ca)),
        None => cluster["insecure-skip-tls-verify"] = json!(true),
    }
    let mut context = json!({ "cluster": "kubewright", "user": "kubewright" });
    if let Some(ns) = namespace {
        context["namespace"] = json!(ns);
    }
    let doc = json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{ "name": "kubewright", "cluster": cluster }],
        "users": [{ "name": "kubewright", "user": { "token": token } }],
        "contexts": [{ "name": "kubewright", "context": context }],
        "current-context": "kubewright",
    });
    Ok(serde_json::from_value(doc)?)
}

/// Dynamic API handle for a custom resource collection; namespaced when `namespace` is given.
pub fn custom_object_api(client: Client, def: &CustomObjectDef, namespace: Option<&str>) -> Api<DynamicObject> {
    let ar = ApiResource {
        group: def.group().to_string(),
        version: def.version().to_string(),
        api_version: def.api_version(),
        kind: def.kind().to_string(),
        plural: def.plural().to_string(),
    };
    match namespace {
        Some(ns) => Api::namespaced_with(client, ns, &ar),
        None => Api::all_with(client, &ar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_kubeconfig_without_ca_skips_verification() {
        let kc = token_kubeconfig("https://10.0.0.1:6443", "Bearer abc", Some("apps"), None).unwrap();
        let cluster = kc.clusters[0].cluster.as_ref().unwrap();
        assert_eq!(cluster.server.as_deref(), Some("https://10.0.0.1:6443"));
        assert_eq!(cluster.insecure_skip_tls_verify, Some(true));
        assert!(cluster.certificate_authority_data.is_none());
        assert_eq!(kc.contexts[0].context.as_ref().unwrap().namespace.as_deref(), Some("apps"));
        assert_eq!(kc.current_context.as_deref(), Some("kubewright"));
    }

    #[test]
    fn token_kubeconfig_with_ca_embeds_it() {
        let kc = token_kubeconfig("https://k8s", "abc", None, Some("-----BEGIN CERTIFICATE-----")).unwrap();
        let cluster = kc.clusters[0].cluster.as_ref().unwrap();
        assert_eq!(cluster.certificate_authority_data.as_deref(), Some(STANDARD.encode("-----BEGIN CERTIFICATE-----").as_str()));
        assert!(cluster.insecure_skip_tls_verify.is_none());
    }

    #[tokio::test]
    async fn token_configuration_resolves_namespace() {
        let cfg = Configuration::from_token("https://10.0.0.1:6443", "abc", Some("apps"), None).await.unwrap();
        assert_eq!(cfg.source(), ConfigSource::Token);
        assert!(!cfg.verify_ssl());
        assert_eq!(cfg.default_namespace(), "apps");
        assert_eq!(cfg.resolve_namespace(Some("other")), "other");
        assert_eq!(cfg.resolve_namespace(None), "apps");

        let cfg = Configuration::from_token("https://10.0.0.1:6443", "abc", None, None).await.unwrap();
        assert_eq!(cfg.resolve_namespace(None), "default");
    }

    #[test]
    fn in_cluster_namespace_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_in_cluster_namespace(dir.path()), None);
        std::fs::write(in_cluster_namespace_file(dir.path()), "payments\n").unwrap();
        assert_eq!(read_in_cluster_namespace(dir.path()).as_deref(), Some("payments"));
    }
}
