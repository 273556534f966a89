//! kubewright public façade.
//!
//! `KubeApi` binds a client to a default namespace and exposes per-kind create/get/list/delete
//! through the request wrapper, custom objects, data readers, status probes and the
//! long-running ops (exec, copy-out, logs, scaling).

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::time::Instant;

use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DynamicObject, ListParams, ObjectList, PostParams};
use kube::{Client, Resource};
use kubewright_core::{CustomObjectDef, Error, JobStatus, PodStatus, Result, PHASE_UNKNOWN};
use kubewright_kubehub::{custom_object_api, foreground_delete, guard, CallKind, Configuration};
use kubewright_ops::{ExecOptions, ExecOutcome, KubeCluster, LogOptions, Scaled, WaitOptions, WorkloadKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

mod kinds;

pub use kubewright_kubehub::ConfigSource;

/// Per-call overrides. Unset fields fall back to the façade namespace and the
/// operation's own `check_err` default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Call<'a> {
    pub namespace: Option<&'a str>,
    pub check_err: Option<bool>,
    pub label_selector: Option<&'a str>,
    pub field_selector: Option<&'a str>,
}

impl<'a> Call<'a> {
    pub fn ns(namespace: &'a str) -> Self {
        Self { namespace: Some(namespace), ..Default::default() }
    }

    pub fn namespace(mut self, namespace: &'a str) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn check_err(mut self, on: bool) -> Self {
        self.check_err = Some(on);
        self
    }

    pub fn labels(mut self, selector: &'a str) -> Self {
        self.label_selector = Some(selector);
        self
    }

    pub fn fields(mut self, selector: &'a str) -> Self {
        self.field_selector = Some(selector);
        self
    }

    fn list_params(&self) -> ListParams {
        let mut lp = ListParams::default();
        if let Some(l) = self.label_selector {
            lp = lp.labels(l);
        }
        if let Some(f) = self.field_selector {
            lp = lp.fields(f);
        }
        lp
    }
}

/// Client façade bound to a default namespace.
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
    namespace: String,
    config: Option<Configuration>,
}

impl Debug for KubeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApi").field("namespace", &self.namespace).field("config", &self.config).finish()
    }
}

impl KubeApi {
    /// Resolve a configuration (inferred when `None`) and bind the default namespace:
    /// explicit argument, else in-cluster namespace file, else kubeconfig context, else `default`.
    pub async fn new(namespace: Option<&str>, configuration: Option<Configuration>) -> Result<Self> {
        let config = match configuration {
            Some(c) => c,
            None => Configuration::infer().await?,
        };
        let namespace = config.resolve_namespace(namespace);
        let client = config.client()?;
        info!(ns = %namespace, source = ?config.source(), "api: ready");
        Ok(Self { client, namespace, config: Some(config) })
    }

    /// Bearer-token connection; TLS verification is off unless a CA is given.
    pub async fn from_token(host: &str, token: &str, namespace: Option<&str>, ca_cert_data: Option<&str>) -> Result<Self> {
        let config = Configuration::from_token(host, token, namespace, ca_cert_data).await?;
        Self::new(namespace, Some(config)).await
    }

    pub fn from_client(client: Client, namespace: impl Into<String>) -> Self {
        Self { client, namespace: namespace.into(), config: None }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    fn ns<'a>(&'a self, call: &Call<'a>) -> &'a str {
        call.namespace.unwrap_or(&self.namespace)
    }

    fn namespaced<K>(&self, call: &Call<'_>) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), self.ns(call))
    }

    fn cluster<K>(&self) -> Api<K>
    where
        K: Resource,
        K::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    async fn create_in<K>(&self, api: Api<K>, obj: &K, check_err: bool) -> Result<Option<K>>
    where
        K: Resource + Clone + DeserializeOwned + Serialize + Debug,
    {
        let what = format!("{}/{}", api.resource_url(), obj.meta().name.as_deref().unwrap_or_default());
        guard(CallKind::Create, &what, check_err, api.create(&PostParams::default(), obj)).await
    }

    async fn get_in<K>(&self, api: Api<K>, name: &str, check_err: bool) -> Result<Option<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        let what = format!("{}/{}", api.resource_url(), name);
        guard(CallKind::Read, &what, check_err, api.get(name)).await
    }

    async fn list_in<K>(&self, api: Api<K>, call: &Call<'_>) -> Result<ObjectList<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        let t0 = Instant::now();
        let list = api.list(&call.list_params()).await?;
        debug!(url = %api.resource_url(), items = list.items.len(), took_ms = %t0.elapsed().as_millis(), "api: list ok");
        Ok(list)
    }

    async fn delete_in<K>(&self, api: Api<K>, name: &str, check_err: bool) -> Result<Option<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        let what = format!("{}/{}", api.resource_url(), name);
        let dp = foreground_delete();
        let res = guard(CallKind::Delete, &what, check_err, async { api.delete(name, &dp).await.map(|e| e.left()) }).await?;
        Ok(res.flatten())
    }

    fn custom_api(&self, def: &CustomObjectDef, namespaced: bool, call: &Call<'_>) -> Api<DynamicObject> {
        let ns = namespaced.then(|| self.ns(call));
        custom_object_api(self.client.clone(), def, ns)
    }

    pub async fn custom_object_create(&self, body: &DynamicObject, def: &CustomObjectDef, namespaced: bool, call: Call<'_>) -> Result<Option<DynamicObject>> {
        self.create_in(self.custom_api(def, namespaced, &call), body, call.check_err.unwrap_or(true)).await
    }

    pub async fn custom_object_get(&self, name: &str, def: &CustomObjectDef, namespaced: bool, call: Call<'_>) -> Result<Option<DynamicObject>> {
        self.get_in(self.custom_api(def, namespaced, &call), name, call.check_err.unwrap_or(true)).await
    }

    pub async fn custom_object_list(&self, def: &CustomObjectDef, namespaced: bool, call: Call<'_>) -> Result<ObjectList<DynamicObject>> {
        self.list_in(self.custom_api(def, namespaced, &call), &call).await
    }

    pub async fn custom_object_delete(&self, name: &str, def: &CustomObjectDef, namespaced: bool, call: Call<'_>) -> Result<Option<DynamicObject>> {
        self.delete_in(self.custom_api(def, namespaced, &call), name, call.check_err.unwrap_or(false)).await
    }

    /// ConfigMap `data`; `None` when the ConfigMap does not exist.
    pub async fn read_configmap(&self, name: &str, call: Call<'_>) -> Result<Option<BTreeMap<String, String>>> {
        Ok(self.configmap_get(name, call).await?.map(|cm| cm.data.unwrap_or_default()))
    }

    /// Secret `data`, decoded to text; `None` when the Secret does not exist.
    pub async fn read_secret(&self, name: &str, call: Call<'_>) -> Result<Option<BTreeMap<String, String>>> {
        let Some(secret) = self.secret_get(name, call).await? else {
            return Ok(None);
        };
        let mut out = BTreeMap::new();
        for (k, v) in secret.data.unwrap_or_default() {
            let text = String::from_utf8(v.0).map_err(|_| Error::invalid(format!("secret `{name}` key `{k}` is not valid UTF-8")))?;
            out.insert(k, text);
        }
        Ok(Some(out))
    }

    pub async fn pod_status(&self, name: &str, call: Call<'_>) -> Result<Option<PodStatus>> {
        Ok(self.pod_get(name, call).await?.map(|p| {
            PodStatus::new(p.status.and_then(|s| s.phase).unwrap_or_else(|| PHASE_UNKNOWN.to_string()))
        }))
    }

    pub async fn job_status(&self, name: &str, call: Call<'_>) -> Result<Option<JobStatus>> {
        Ok(self.job_get(name, call).await?.map(|j| {
            let s = j.status.unwrap_or_default();
            JobStatus::from_counts(s.active, s.succeeded, s.failed)
        }))
    }

    /// Run `command` in a pod. Preloaded mode captures output and returns the status frame;
    /// streaming mode logs output and fails on a non-success status.
    pub async fn run_command(&self, pod: &str, command: &[String], container: Option<&str>, preload: bool, call: Call<'_>) -> Result<ExecOutcome> {
        let opts = exec_options(container);
        kubewright_ops::run_command(&self.namespaced(&call), pod, command, &opts, preload).await
    }

    pub async fn copy_file_from_pod(&self, pod: &str, remote_path: &str, local_path: &Path, container: Option<&str>, call: Call<'_>) -> Result<()> {
        let opts = exec_options(container);
        kubewright_ops::copy_file_from_pod(&self.namespaced(&call), pod, remote_path, local_path, &opts).await
    }

    pub async fn get_logs(&self, pod: &str, opts: &LogOptions, call: Call<'_>) -> Result<usize> {
        kubewright_ops::get_logs(&self.namespaced(&call), pod, opts).await
    }

    fn scaler(&self, call: &Call<'_>) -> KubeCluster {
        KubeCluster::new(self.client.clone(), self.ns(call))
    }

    pub async fn scale_deployment(&self, name: &str, replicas: i32, wait: bool, call: Call<'_>) -> Result<Scaled> {
        let opts = WaitOptions::default();
        kubewright_ops::scale(&self.scaler(&call), WorkloadKind::Deployment, name, replicas, wait.then_some(&opts)).await
    }

    pub async fn scale_stateful_set(&self, name: &str, replicas: i32, wait: bool, call: Call<'_>) -> Result<Scaled> {
        let opts = WaitOptions::default();
        kubewright_ops::scale(&self.scaler(&call), WorkloadKind::StatefulSet, name, replicas, wait.then_some(&opts)).await
    }

    /// Scale every Deployment and StatefulSet in the call's namespace down to zero.
    pub async fn scale_down_all(&self, call: Call<'_>) -> Result<Vec<Scaled>> {
        kubewright_ops::scale_down_all(&self.scaler(&call)).await
    }

    pub async fn wait_pods(&self, label_selector: &str, msg: Option<&str>, opts: &WaitOptions, call: Call<'_>) -> Result<()> {
        kubewright_ops::wait_pods(&self.scaler(&call), label_selector, msg, opts).await
    }
}

fn exec_options(container: Option<&str>) -> ExecOptions {
    match container {
        Some(c) => ExecOptions::default().container(c),
        None => ExecOptions::default(),
    }
}
