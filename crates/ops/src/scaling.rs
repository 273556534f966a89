//! Replica scaling and the bounded pod-readiness wait.

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use kubewright_core::{dict_to_labels, Error, Result};
use kubewright_kubehub::{guard, CallKind};
use serde_json::json;
use tracing::{debug, info};

/// Pods that completed are ignored by the readiness wait.
pub const NOT_SUCCEEDED: &str = "status.phase!=Succeeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    /// Lowercase kind as used in `kind.apps/name`.
    pub const fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a scale patch returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaled {
    pub kind: WorkloadKind,
    pub name: String,
    pub replicas: i32,
    /// `spec.template.metadata.labels` of the patched object.
    pub template_labels: BTreeMap<String, String>,
}

impl Scaled {
    pub fn message(&self) -> String {
        format!("{}.apps/{} scaled to {} replicas", self.kind, self.name, self.replicas)
    }
}

/// Cluster calls needed by scaling, bound to one namespace.
#[async_trait::async_trait]
pub trait ClusterOps: Send + Sync {
    /// Strategic-merge patch of a workload; returns the patched object's template labels.
    async fn patch_workload(&self, kind: WorkloadKind, name: &str, body: &serde_json::Value) -> Result<BTreeMap<String, String>>;

    /// `(name, spec.replicas)` for every workload of `kind`.
    async fn list_workloads(&self, kind: WorkloadKind) -> Result<Vec<(String, i32)>>;

    async fn list_pods(&self, label_selector: &str, field_selector: &str) -> Result<Vec<Pod>>;
}

/// [`ClusterOps`] over a live client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self { client, namespace: namespace.into() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn stateful_sets(&self) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

fn not_found(kind: WorkloadKind, name: &str) -> Error {
    Error::NotFound(format!("{kind}.apps/{name}"))
}

#[async_trait::async_trait]
impl ClusterOps for KubeCluster {
    async fn patch_workload(&self, kind: WorkloadKind, name: &str, body: &serde_json::Value) -> Result<BTreeMap<String, String>> {
        let pp = PatchParams::default();
        let what = format!("{kind}/{name}");
        let labels = match kind {
            WorkloadKind::Deployment => guard(CallKind::Patch, &what, true, self.deployments().patch(name, &pp, &Patch::Strategic(body)))
                .await?
                .ok_or_else(|| not_found(kind, name))?
                .spec
                .and_then(|s| s.template.metadata)
                .and_then(|m| m.labels),
            WorkloadKind::StatefulSet => guard(CallKind::Patch, &what, true, self.stateful_sets().patch(name, &pp, &Patch::Strategic(body)))
                .await?
                .ok_or_else(|| not_found(kind, name))?
                .spec
                .and_then(|s| s.template.metadata)
                .and_then(|m| m.labels),
        };
        Ok(labels.unwrap_or_default())
    }

    async fn list_workloads(&self, kind: WorkloadKind) -> Result<Vec<(String, i32)>> {
        let lp = ListParams::default();
        let out = match kind {
            WorkloadKind::Deployment => self
                .deployments()
                .list(&lp)
                .await?
                .items
                .into_iter()
                .map(|d| (d.metadata.name.unwrap_or_default(), d.spec.and_then(|s| s.replicas).unwrap_or(0)))
                .collect(),
            WorkloadKind::StatefulSet => self
                .stateful_sets()
                .list(&lp)
                .await?
                .items
                .into_iter()
                .map(|s| (s.metadata.name.unwrap_or_default(), s.spec.and_then(|s| s.replicas).unwrap_or(0)))
                .collect(),
        };
        Ok(out)
    }

    async fn list_pods(&self, label_selector: &str, field_selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let lp = ListParams::default().labels(label_selector).fields(field_selector);
        Ok(api.list(&lp).await?.items)
    }
}

/// Timing for [`wait_pods`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub delay: Duration,
    pub timeout: Duration,
    pub start_delay: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self { delay: Duration::from_secs(3), timeout: Duration::from_secs(120), start_delay: Duration::from_secs(3) }
    }
}

/// Ready: not being deleted and every reported container ready.
pub fn is_pod_ready(pod: &Pod) -> bool {
    if pod.metadata.deletion_timestamp.is_some() {
        return false;
    }
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| cs.iter().all(|c| c.ready))
        .unwrap_or(true)
}

/// Poll pods matching `label_selector` until none remain or all are ready.
/// Total wall time is bounded by `timeout + start_delay`; a zero `delay` is rejected.
pub async fn wait_pods<C>(cluster: &C, label_selector: &str, msg: Option<&str>, opts: &WaitOptions) -> Result<()>
where
    C: ClusterOps + ?Sized,
{
    if opts.delay.is_zero() {
        return Err(Error::invalid("wait_pods: delay must be greater than zero"));
    }
    let info_msg = format!("wait {} ...", msg.filter(|m| !m.is_empty()).unwrap_or("scaling"));
    info!(selector = %label_selector, "{info_msg}");
    let t0 = tokio::time::Instant::now();
    tokio::time::sleep(opts.start_delay).await;

    let deadline = tokio::time::Instant::now() + opts.timeout;
    loop {
        let pods = cluster.list_pods(label_selector, NOT_SUCCEEDED).await?;
        if pods.is_empty() || pods.iter().all(is_pod_ready) {
            debug!(selector = %label_selector, pods = pods.len(), "pods settled");
            metrics::histogram!("wait_pods_ms", t0.elapsed().as_millis() as f64);
            return Ok(());
        }
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            metrics::histogram!("wait_pods_ms", t0.elapsed().as_millis() as f64);
            return Err(Error::Timeout(format!("wait for scaling `{label_selector}`: timeout reached")));
        }
        info!(selector = %label_selector, ready = pods.iter().filter(|p| is_pod_ready(p)).count(), total = pods.len(), "{info_msg}");
        tokio::time::sleep(opts.delay.min(remaining)).await;
    }
}

/// Patch `spec.replicas`; with `wait`, block until the template's pods settle.
pub async fn scale<C>(cluster: &C, kind: WorkloadKind, name: &str, replicas: i32, wait: Option<&WaitOptions>) -> Result<Scaled>
where
    C: ClusterOps + ?Sized,
{
    let body = json!({"spec": {"replicas": replicas}});
    let template_labels = cluster.patch_workload(kind, name, &body).await?;
    let scaled = Scaled { kind, name: name.to_string(), replicas, template_labels };
    let msg = scaled.message();
    info!("{msg}");
    metrics::counter!("scale_ops_total", 1, "kind" => kind.as_str());

    if let Some(opts) = wait {
        wait_pods(cluster, &dict_to_labels(&scaled.template_labels), Some(&msg), opts).await?;
    }
    Ok(scaled)
}

/// Scale every Deployment, then every StatefulSet, with replicas above zero down to zero.
pub async fn scale_down_all<C>(cluster: &C) -> Result<Vec<Scaled>>
where
    C: ClusterOps + ?Sized,
{
    let mut out = Vec::new();
    for kind in [WorkloadKind::Deployment, WorkloadKind::StatefulSet] {
        for (name, replicas) in cluster.list_workloads(kind).await? {
            if replicas > 0 {
                out.push(scale(cluster, kind, &name, 0, None).await?);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCluster {
        patches: Mutex<Vec<(WorkloadKind, String, serde_json::Value)>>,
        workloads: BTreeMap<&'static str, Vec<(String, i32)>>,
        pods: Vec<Pod>,
        pod_lists: AtomicUsize,
        selectors: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl ClusterOps for FakeCluster {
        async fn patch_workload(&self, kind: WorkloadKind, name: &str, body: &serde_json::Value) -> Result<BTreeMap<String, String>> {
            self.patches.lock().unwrap().push((kind, name.to_string(), body.clone()));
            Ok(BTreeMap::from([("app".to_string(), name.to_string())]))
        }

        async fn list_workloads(&self, kind: WorkloadKind) -> Result<Vec<(String, i32)>> {
            Ok(self.workloads.get(kind.as_str()).cloned().unwrap_or_default())
        }

        async fn list_pods(&self, label_selector: &str, field_selector: &str) -> Result<Vec<Pod>> {
            self.pod_lists.fetch_add(1, Ordering::SeqCst);
            self.selectors.lock().unwrap().push((label_selector.to_string(), field_selector.to_string()));
            Ok(self.pods.clone())
        }
    }

    fn pod(ready: &[bool], deleting: bool) -> Pod {
        let statuses: Vec<_> = ready
            .iter()
            .enumerate()
            .map(|(i, r)| json!({"name": format!("c{i}"), "image": "nginx", "imageID": "", "ready": r, "restartCount": 0}))
            .collect();
        let mut v = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web-0"},
            "status": {"containerStatuses": statuses},
        });
        if deleting {
            v["metadata"]["deletionTimestamp"] = json!("2024-01-01T00:00:00Z");
        }
        serde_json::from_value(v).unwrap()
    }

    fn quick() -> WaitOptions {
        WaitOptions { delay: Duration::from_secs(1), timeout: Duration::from_secs(3), start_delay: Duration::from_secs(1) }
    }

    #[tokio::test]
    async fn scale_patch_body_is_exact() {
        let c = FakeCluster::default();
        let s = scale(&c, WorkloadKind::Deployment, "web", 0, None).await.unwrap();
        assert_eq!(s.message(), "deployment.apps/web scaled to 0 replicas");
        let patches = c.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].2, json!({"spec": {"replicas": 0}}));
        assert_eq!(serde_json::to_string(&patches[0].2).unwrap(), r#"{"spec":{"replicas":0}}"#);
        assert_eq!(c.pod_lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_on_never_ready_pod() {
        let c = FakeCluster { pods: vec![pod(&[false], false)], ..Default::default() };
        let t0 = tokio::time::Instant::now();
        let err = wait_pods(&c, "app=web", None, &quick()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(t0.elapsed(), Duration::from_secs(4));
        assert_eq!(c.pod_lists.load(Ordering::SeqCst), 4);
        let selectors = c.selectors.lock().unwrap();
        assert_eq!(selectors[0], ("app=web".to_string(), NOT_SUCCEEDED.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_is_rejected_before_polling() {
        let c = FakeCluster { pods: vec![pod(&[false], false)], ..Default::default() };
        let opts = WaitOptions { delay: Duration::ZERO, ..quick() };
        let err = wait_pods(&c, "app=web", None, &opts).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(c.pod_lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_longer_than_timeout_stays_within_bound() {
        let c = FakeCluster { pods: vec![pod(&[false], false)], ..Default::default() };
        let opts = WaitOptions { delay: Duration::from_secs(10), ..quick() };
        let t0 = tokio::time::Instant::now();
        assert!(matches!(wait_pods(&c, "app=web", None, &opts).await, Err(Error::Timeout(_))));
        assert_eq!(t0.elapsed(), Duration::from_secs(4));
        assert_eq!(c.pod_lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_when_no_pods_remain() {
        let c = FakeCluster::default();
        let t0 = tokio::time::Instant::now();
        wait_pods(&c, "app=web", Some("scale down"), &quick()).await.unwrap();
        assert_eq!(t0.elapsed(), Duration::from_secs(1));
        assert_eq!(c.pod_lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_with_wait_uses_template_selector() {
        let c = FakeCluster { pods: vec![pod(&[true, true], false)], ..Default::default() };
        scale(&c, WorkloadKind::StatefulSet, "db", 2, Some(&quick())).await.unwrap();
        assert_eq!(c.selectors.lock().unwrap()[0].0, "app=db");
    }

    #[tokio::test]
    async fn scale_down_all_skips_idle_workloads() {
        let c = FakeCluster {
            workloads: BTreeMap::from([
                ("deployment", vec![("web".to_string(), 3), ("idle".to_string(), 0)]),
                ("statefulset", vec![("db".to_string(), 1)]),
            ]),
            ..Default::default()
        };
        let scaled = scale_down_all(&c).await.unwrap();
        let names: Vec<_> = scaled.iter().map(|s| (s.kind, s.name.as_str())).collect();
        assert_eq!(names, vec![(WorkloadKind::Deployment, "web"), (WorkloadKind::StatefulSet, "db")]);
        assert!(c.patches.lock().unwrap().iter().all(|p| p.2 == json!({"spec": {"replicas": 0}})));
    }

    #[test]
    fn readiness_rules() {
        assert!(is_pod_ready(&pod(&[], false)));
        assert!(is_pod_ready(&pod(&[true, true], false)));
        assert!(!is_pod_ready(&pod(&[true, false], false)));
        assert!(!is_pod_ready(&pod(&[true], true)));
    }
}
