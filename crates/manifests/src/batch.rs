use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, Job, JobSpec, JobTemplateSpec};
use kubewright_core::{ConcurrencyPolicy, IntoChoice, RestartPolicy, Result};

use crate::container::ContainerBuilder;
use crate::meta::{impl_with_metadata, str_map, MetaMixin};
use crate::pod::{PodSpecBuilder, PodTemplateBuilder};
use crate::ManifestBuilder;

pub const DEFAULT_SCHEDULE: &str = "0 0 * * *";

/// Job spec plus pod template, with the job template's own metadata.
///
/// Pods default to `restartPolicy: Never`, which the batch API requires
/// (it rejects `Always`).
#[derive(Debug, Clone, PartialEq)]
pub struct JobTemplateBuilder {
    meta: MetaMixin,
    template: PodTemplateBuilder,
    spec: JobSpec,
}

impl JobTemplateBuilder {
    pub fn new(container: ContainerBuilder) -> Self {
        let mut template = PodTemplateBuilder::new(container);
        template.spec_mut().restart_policy(RestartPolicy::Never);
        Self { meta: MetaMixin::anonymous(), template, spec: JobSpec::default() }
    }

    pub fn template_mut(&mut self) -> &mut PodTemplateBuilder {
        &mut self.template
    }

    pub fn pod_spec_mut(&mut self) -> &mut PodSpecBuilder {
        self.template.spec_mut()
    }

    pub fn set_job_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.meta.set_labels(str_map(labels)?);
        Ok(self)
    }

    pub fn set_job_annotations<I, K, V>(&mut self, annotations: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.meta.set_annotations(str_map(annotations)?);
        Ok(self)
    }

    pub fn set_pod_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.template.set_pod_labels(labels)?;
        Ok(self)
    }

    pub fn set_pod_annotations<I, K, V>(&mut self, annotations: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.template.set_pod_annotations(annotations)?;
        Ok(self)
    }

    pub fn set_backoff_limit(&mut self, n: i32) -> &mut Self {
        self.spec.backoff_limit = Some(n);
        self
    }

    pub fn set_parallelism(&mut self, n: i32) -> &mut Self {
        self.spec.parallelism = Some(n);
        self
    }

    pub fn set_completions(&mut self, n: i32) -> &mut Self {
        self.spec.completions = Some(n);
        self
    }

    pub fn set_active_deadline_seconds(&mut self, seconds: i64) -> &mut Self {
        self.spec.active_deadline_seconds = Some(seconds);
        self
    }

    pub fn set_ttl_seconds_after_finished(&mut self, seconds: i32) -> &mut Self {
        self.spec.ttl_seconds_after_finished = Some(seconds);
        self
    }

    pub(crate) fn job_spec(&self) -> JobSpec {
        JobSpec { template: self.template.template(), ..self.spec.clone() }
    }
}

impl ManifestBuilder for JobTemplateBuilder {
    type Object = JobTemplateSpec;

    fn manifest(&self) -> Result<JobTemplateSpec> {
        Ok(JobTemplateSpec { metadata: self.meta.object_meta_opt(), spec: Some(self.job_spec()) })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobBuilder {
    meta: MetaMixin,
    job: JobTemplateBuilder,
}

impl_with_metadata!(JobBuilder, meta);

impl JobBuilder {
    pub fn new(name: impl Into<String>, container: ContainerBuilder) -> Self {
        Self { meta: MetaMixin::new(name), job: JobTemplateBuilder::new(container) }
    }

    /// Job spec and pod template knobs.
    pub fn job_mut(&mut self) -> &mut JobTemplateBuilder {
        &mut self.job
    }

    pub fn pod_spec_mut(&mut self) -> &mut PodSpecBuilder {
        self.job.pod_spec_mut()
    }

    pub fn set_backoff_limit(&mut self, n: i32) -> &mut Self {
        self.job.set_backoff_limit(n);
        self
    }

    pub fn set_parallelism(&mut self, n: i32) -> &mut Self {
        self.job.set_parallelism(n);
        self
    }

    pub fn set_ttl_seconds_after_finished(&mut self, seconds: i32) -> &mut Self {
        self.job.set_ttl_seconds_after_finished(seconds);
        self
    }
}

impl ManifestBuilder for JobBuilder {
    type Object = Job;

    fn manifest(&self) -> Result<Job> {
        Ok(Job { metadata: self.meta.object_meta(), spec: Some(self.job.job_spec()), status: None })
    }
}

/// CronJob: `set_labels`/`set_annotations` target the CronJob itself,
/// `set_pod_labels`/`set_pod_annotations` the pods it spawns.
#[derive(Debug, Clone, PartialEq)]
pub struct CronJobBuilder {
    meta: MetaMixin,
    job: JobTemplateBuilder,
    spec: CronJobSpec,
}

impl_with_metadata!(CronJobBuilder, meta);

impl CronJobBuilder {
    pub fn new(name: impl Into<String>, container: ContainerBuilder) -> Self {
        Self {
            meta: MetaMixin::new(name),
            job: JobTemplateBuilder::new(container),
            spec: CronJobSpec { schedule: DEFAULT_SCHEDULE.to_string(), ..Default::default() },
        }
    }

    pub fn job_mut(&mut self) -> &mut JobTemplateBuilder {
        &mut self.job
    }

    pub fn pod_spec_mut(&mut self) -> &mut PodSpecBuilder {
        self.job.pod_spec_mut()
    }

    pub fn set_pod_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.job.set_pod_labels(labels)?;
        Ok(self)
    }

    pub fn set_pod_annotations<I, K, V>(&mut self, annotations: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.job.set_pod_annotations(annotations)?;
        Ok(self)
    }

    pub fn set_schedule(&mut self, cron: impl Into<String>) -> &mut Self {
        self.spec.schedule = cron.into();
        self
    }

    pub fn set_starting_deadline_seconds(&mut self, seconds: i64) -> &mut Self {
        self.spec.starting_deadline_seconds = Some(seconds);
        self
    }

    pub fn set_concurrency_policy(&mut self, policy: impl IntoChoice<ConcurrencyPolicy>) -> Result<&mut Self> {
        self.spec.concurrency_policy = Some(policy.into_choice()?.to_string());
        Ok(self)
    }

    pub fn set_failed_jobs_history_limit(&mut self, n: i32) -> &mut Self {
        self.spec.failed_jobs_history_limit = Some(n);
        self
    }

    pub fn set_successful_jobs_history_limit(&mut self, n: i32) -> &mut Self {
        self.spec.successful_jobs_history_limit = Some(n);
        self
    }

    pub fn set_time_zone(&mut self, tz: impl Into<String>) -> &mut Self {
        self.spec.time_zone = Some(tz.into());
        self
    }

    pub fn set_suspend(&mut self, suspend: bool) -> &mut Self {
        self.spec.suspend = Some(suspend);
        self
    }
}

impl ManifestBuilder for CronJobBuilder {
    type Object = CronJob;

    fn manifest(&self) -> Result<CronJob> {
        Ok(CronJob {
            metadata: self.meta.object_meta(),
            spec: Some(CronJobSpec { job_template: self.job.manifest()?, ..self.spec.clone() }),
            status: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WithMetadata;
    use serde_json::json;

    #[test]
    fn job_spec_fields_land_on_spec() {
        let mut j = JobBuilder::new("migrate", ContainerBuilder::new("m", "migrator:1"));
        j.set_backoff_limit(2).set_parallelism(1).set_ttl_seconds_after_finished(600);
        let v = serde_json::to_value(j.manifest().unwrap()).unwrap();
        assert_eq!(v["spec"]["backoffLimit"], 2);
        assert_eq!(v["spec"]["ttlSecondsAfterFinished"], 600);
        assert_eq!(v["spec"]["template"]["spec"]["restartPolicy"], "Never");
        assert_eq!(v["metadata"]["name"], "migrate");
    }

    #[test]
    fn job_pods_default_to_never_but_accept_on_failure() {
        let c = CronJobBuilder::new("nightly", ContainerBuilder::new("m", "migrator:1"));
        let v = serde_json::to_value(c.manifest().unwrap()).unwrap();
        assert_eq!(v["spec"]["jobTemplate"]["spec"]["template"]["spec"]["restartPolicy"], "Never");

        let mut j = JobBuilder::new("migrate", ContainerBuilder::new("m", "migrator:1"));
        j.pod_spec_mut().set_restart_policy("OnFailure").unwrap();
        let v = serde_json::to_value(j.manifest().unwrap()).unwrap();
        assert_eq!(v["spec"]["template"]["spec"]["restartPolicy"], "OnFailure");
    }

    #[test]
    fn cronjob_labels_split_between_object_and_pods() {
        let mut cj = CronJobBuilder::new("nightly", ContainerBuilder::new("r", "report:2"));
        cj.set_labels([("team", "data")]).unwrap();
        cj.set_pod_labels([("app", "report")]).unwrap();
        cj.job_mut().set_job_labels([("kind", "batch")]).unwrap();
        let v = serde_json::to_value(cj.manifest().unwrap()).unwrap();
        assert_eq!(v["spec"]["schedule"], DEFAULT_SCHEDULE);
        assert_eq!(v["metadata"]["labels"], json!({"team": "data"}));
        assert_eq!(v["spec"]["jobTemplate"]["metadata"]["labels"], json!({"kind": "batch"}));
        assert_eq!(v["spec"]["jobTemplate"]["spec"]["template"]["metadata"]["labels"], json!({"app": "report"}));
    }

    #[test]
    fn cronjob_schedule_and_policy() {
        let mut cj = CronJobBuilder::new("nightly", ContainerBuilder::new("r", "report:2"));
        cj.set_schedule("*/5 * * * *").set_suspend(true).set_time_zone("Etc/UTC");
        assert!(cj.set_concurrency_policy("Sometimes").is_err());
        cj.set_concurrency_policy(ConcurrencyPolicy::Forbid).unwrap();
        let spec = cj.manifest().unwrap().spec.unwrap();
        assert_eq!(spec.schedule, "*/5 * * * *");
        assert_eq!(spec.concurrency_policy.as_deref(), Some("Forbid"));
        assert_eq!(spec.suspend, Some(true));
    }
}
