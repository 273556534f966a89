use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kubewright_core::{Result, SecretType};
use serde::Serialize;

use crate::meta::{impl_with_metadata, MetaMixin};
use crate::ManifestBuilder;

/// Value stored in a ConfigMap or Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl DataValue {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            DataValue::Text(s) => s.into_bytes(),
            DataValue::Bytes(b) => b,
        }
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(v: Vec<u8>) -> Self {
        DataValue::Bytes(v)
    }
}

impl From<&[u8]> for DataValue {
    fn from(v: &[u8]) -> Self {
        DataValue::Bytes(v.to_vec())
    }
}

fn non_empty<V: Clone>(m: &BTreeMap<String, V>) -> Option<BTreeMap<String, V>> {
    (!m.is_empty()).then(|| m.clone())
}

/// ConfigMap: text goes to `data`, bytes to `binaryData`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMapBuilder {
    meta: MetaMixin,
    data: BTreeMap<String, String>,
    binary_data: BTreeMap<String, ByteString>,
    immutable: Option<bool>,
}

impl_with_metadata!(ConfigMapBuilder, meta);

impl ConfigMapBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: MetaMixin::new(name), data: BTreeMap::new(), binary_data: BTreeMap::new(), immutable: None }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DataValue>) -> &mut Self {
        let key = key.into();
        match value.into() {
            DataValue::Text(s) => {
                self.binary_data.remove(&key);
                self.data.insert(key, s);
            }
            DataValue::Bytes(b) => {
                self.data.remove(&key);
                self.binary_data.insert(key, ByteString(b));
            }
        }
        self
    }

    pub fn set_immutable(&mut self, immutable: bool) -> &mut Self {
        self.immutable = Some(immutable);
        self
    }
}

impl ManifestBuilder for ConfigMapBuilder {
    type Object = ConfigMap;

    fn manifest(&self) -> Result<ConfigMap> {
        Ok(ConfigMap {
            metadata: self.meta.object_meta(),
            data: non_empty(&self.data),
            binary_data: non_empty(&self.binary_data),
            immutable: self.immutable,
        })
    }
}

/// Secret: `set` stores raw bytes in `data` (base64 on the wire),
/// `set_string_data` stores text verbatim in `stringData`. A key lives in one map only.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretBuilder {
    meta: MetaMixin,
    typ: SecretType,
    data: BTreeMap<String, ByteString>,
    string_data: BTreeMap<String, String>,
    immutable: Option<bool>,
}

impl_with_metadata!(SecretBuilder, meta);

impl SecretBuilder {
    pub fn new(name: impl Into<String>, typ: SecretType) -> Self {
        Self {
            meta: MetaMixin::new(name),
            typ,
            data: BTreeMap::new(),
            string_data: BTreeMap::new(),
            immutable: None,
        }
    }

    pub fn secret_type(&self) -> SecretType {
        self.typ
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DataValue>) -> &mut Self {
        let key = key.into();
        self.string_data.remove(&key);
        self.data.insert(key, ByteString(value.into().into_bytes()));
        self
    }

    pub fn set_string_data(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        self.data.remove(&key);
        self.string_data.insert(key, value.into());
        self
    }

    pub fn set_immutable(&mut self, immutable: bool) -> &mut Self {
        self.immutable = Some(immutable);
        self
    }
}

impl ManifestBuilder for SecretBuilder {
    type Object = Secret;

    fn manifest(&self) -> Result<Secret> {
        Ok(Secret {
            metadata: self.meta.object_meta(),
            type_: Some(self.typ.to_string()),
            data: non_empty(&self.data),
            string_data: non_empty(&self.string_data),
            immutable: self.immutable,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct RegistryAuth {
    username: String,
    password: String,
    email: String,
    auth: String,
}

/// `kubernetes.io/dockerconfigjson` secret built from registry credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretImagePull {
    secret: SecretBuilder,
    registries: BTreeMap<String, RegistryAuth>,
}

impl_with_metadata!(SecretImagePull, secret.meta);

impl SecretImagePull {
    pub const KEY: &'static str = ".dockerconfigjson";

    pub fn new(name: impl Into<String>) -> Self {
        Self { secret: SecretBuilder::new(name, SecretType::DockerConfigJson), registries: BTreeMap::new() }
    }

    /// The first credentials registered for a registry win.
    pub fn add_registry(
        &mut self,
        registry: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> &mut Self {
        let (username, password) = (username.into(), password.into());
        self.registries.entry(registry.into()).or_insert_with(|| RegistryAuth {
            auth: STANDARD.encode(format!("{username}:{password}")),
            username,
            password,
            email: email.into(),
        });
        self
    }

    pub fn set_immutable(&mut self, immutable: bool) -> &mut Self {
        self.secret.set_immutable(immutable);
        self
    }
}

impl ManifestBuilder for SecretImagePull {
    type Object = Secret;

    fn manifest(&self) -> Result<Secret> {
        #[derive(Serialize)]
        struct DockerConfig<'a> {
            auths: &'a BTreeMap<String, RegistryAuth>,
        }
        let doc = serde_json::to_vec(&DockerConfig { auths: &self.registries })?;
        let mut secret = self.secret.clone();
        secret.set(Self::KEY, doc);
        secret.manifest()
    }
}

/// `kubernetes.io/tls` secret.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretTls {
    secret: SecretBuilder,
}

impl_with_metadata!(SecretTls, secret.meta);

impl SecretTls {
    pub fn new(name: impl Into<String>) -> Self {
        Self { secret: SecretBuilder::new(name, SecretType::Tls) }
    }

    pub fn set(&mut self, cert: impl Into<DataValue>, key: impl Into<DataValue>, ca: Option<DataValue>) -> &mut Self {
        if let Some(ca) = ca {
            self.secret.set("ca.crt", ca);
        }
        self.secret.set("tls.crt", cert).set("tls.key", key);
        self
    }
}

impl ManifestBuilder for SecretTls {
    type Object = Secret;

    fn manifest(&self) -> Result<Secret> {
        self.secret.manifest()
    }
}

/// Long-lived token secret bound to a service account; the token controller fills it in.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretServiceAccountToken {
    secret: SecretBuilder,
}

impl_with_metadata!(SecretServiceAccountToken, secret.meta);

impl SecretServiceAccountToken {
    pub const ACCOUNT_ANNOTATION: &'static str = "kubernetes.io/service-account.name";

    pub fn new(name: impl Into<String>, service_account: impl Into<String>) -> Self {
        let mut secret = SecretBuilder::new(name, SecretType::ServiceAccountToken);
        secret.meta.insert_annotation(Self::ACCOUNT_ANNOTATION.to_string(), service_account.into());
        Self { secret }
    }
}

impl ManifestBuilder for SecretServiceAccountToken {
    type Object = Secret;

    fn manifest(&self) -> Result<Secret> {
        self.secret.manifest()
    }
}
