use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use kubewright_core::{Error, IngressRulePathType, SecretType};
use kubewright_manifests::{
    BackendSpec, ConfigMapBuilder, ContainerBuilder, CronJobBuilder, DeploymentBuilder, IngressBuilder, JobBuilder,
    ManifestBuilder, SecretBuilder, SecretImagePull, WithMetadata,
};
use serde_json::json;

#[test]
fn deployment_rolling_update_manifest() {
    let mut d = DeploymentBuilder::new("web", ContainerBuilder::new("app", "nginx:1.27"));
    d.set_replicas(3);
    d.set_selector_match_labels([("app", "web")]).unwrap();
    d.set_strategy("RollingUpdate", Some(1.into()), Some(0.into())).unwrap();

    let v = serde_json::to_value(d.manifest().unwrap()).unwrap();
    assert_eq!(v["apiVersion"], "apps/v1");
    assert_eq!(v["kind"], "Deployment");
    assert_eq!(v["metadata"]["name"], "web");
    assert_eq!(v["spec"]["replicas"], 3);
    assert_eq!(v["spec"]["selector"]["matchLabels"], json!({"app": "web"}));
    assert_eq!(v["spec"]["strategy"]["type"], "RollingUpdate");
    assert_eq!(v["spec"]["strategy"]["rollingUpdate"], json!({"maxSurge": 1, "maxUnavailable": 0}));
    let containers = v["spec"]["template"]["spec"]["containers"].as_array().unwrap();
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0]["image"], "nginx:1.27");
}

#[test]
fn opaque_secret_data_is_base64_on_the_wire() {
    let mut s = SecretBuilder::new("creds", SecretType::Opaque);
    s.set("password", "s3cret");
    let v = serde_json::to_value(s.manifest().unwrap()).unwrap();
    assert_eq!(v["type"], "Opaque");
    assert_eq!(v["data"], json!({"password": STANDARD.encode("s3cret")}));
    assert!(v.get("stringData").is_none());
}

#[test]
fn image_pull_secret_docker_config() {
    let mut s = SecretImagePull::new("reg");
    s.add_registry("r.io", "u", "p", "e@x");
    s.add_registry("r.io", "other", "creds", "o@x");
    let secret = s.manifest().unwrap();
    assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/dockerconfigjson"));

    let raw = &secret.data.unwrap()[SecretImagePull::KEY].0;
    let doc: serde_json::Value = serde_json::from_slice(raw).unwrap();
    assert_eq!(
        doc,
        json!({"auths": {"r.io": {"username": "u", "password": "p", "email": "e@x", "auth": STANDARD.encode("u:p")}}})
    );
}

#[test]
fn ingress_rules_are_idempotent_and_additive() {
    let mut ing = IngressBuilder::new("web");
    ing.set_labels([("app", "web")]).unwrap();
    let svc = BackendSpec::service("web", 80);
    ing.add_rule("a.example.com", "/", IngressRulePathType::Prefix, &svc).unwrap();
    ing.add_rule("a.example.com", "/", IngressRulePathType::Prefix, &svc).unwrap();
    ing.add_rule("a.example.com", "/api", "Exact", &BackendSpec::service("api", "http")).unwrap();
    ing.add_rule("b.example.com", "/", "Prefix", &svc).unwrap();

    let v = serde_json::to_value(ing.manifest().unwrap()).unwrap();
    let rules = v["spec"]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 2);
    let a_paths = rules[0]["http"]["paths"].as_array().unwrap();
    assert_eq!(a_paths.len(), 2);
    assert_eq!(a_paths[0]["backend"]["service"], json!({"name": "web", "port": {"number": 80}}));
    assert_eq!(a_paths[1]["backend"]["service"], json!({"name": "api", "port": {"name": "http"}}));
    assert_eq!(a_paths[1]["pathType"], "Exact");
    assert_eq!(rules[1]["host"], "b.example.com");
}

#[test]
fn emitting_twice_is_stable() {
    let mut d = DeploymentBuilder::new("web", ContainerBuilder::new("app", "nginx:1.27"));
    d.set_annotations([("owner", "platform")]).unwrap();
    d.add_selector_match_expressions("tier", "In", ["web", "edge"]).unwrap();
    let a = serde_json::to_string(&d.manifest().unwrap()).unwrap();
    let b = serde_json::to_string(&d.manifest().unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn editing_an_emitted_deployment_leaves_the_builder_alone() {
    let mut d = DeploymentBuilder::new("web", ContainerBuilder::new("app", "nginx:1.27"));
    d.set_labels([("app", "web")]).unwrap();
    let before = serde_json::to_value(d.manifest().unwrap()).unwrap();

    let mut out = d.manifest().unwrap();
    out.metadata.labels.get_or_insert_with(Default::default).insert("edited".into(), "yes".into());
    out.spec.as_mut().unwrap().template.spec.as_mut().unwrap().containers[0].image = Some("busybox".into());

    assert_eq!(serde_json::to_value(d.manifest().unwrap()).unwrap(), before);
}

#[test]
fn editing_emitted_jobs_leaves_the_builders_alone() {
    let mut j = JobBuilder::new("migrate", ContainerBuilder::new("m", "migrator:1"));
    j.job_mut().set_pod_labels([("job", "migrate")]).unwrap();
    let job_before = serde_json::to_value(j.manifest().unwrap()).unwrap();

    let mut job = j.manifest().unwrap();
    let pod_meta = job.spec.as_mut().unwrap().template.metadata.as_mut().unwrap();
    pod_meta.labels.get_or_insert_with(Default::default).insert("job".into(), "other".into());
    job.spec.as_mut().unwrap().template.spec.as_mut().unwrap().restart_policy = Some("Always".into());
    assert_eq!(serde_json::to_value(j.manifest().unwrap()).unwrap(), job_before);

    let mut c = CronJobBuilder::new("nightly", ContainerBuilder::new("m", "migrator:1"));
    c.set_pod_labels([("job", "nightly")]).unwrap();
    let cron_before = serde_json::to_value(c.manifest().unwrap()).unwrap();

    let mut cron = c.manifest().unwrap();
    let spec = cron.spec.as_mut().unwrap();
    spec.schedule = "* * * * *".into();
    let pod_meta = spec.job_template.spec.as_mut().unwrap().template.metadata.as_mut().unwrap();
    pod_meta.labels.get_or_insert_with(Default::default).clear();
    assert_eq!(serde_json::to_value(c.manifest().unwrap()).unwrap(), cron_before);
}

#[test]
fn editing_emitted_data_objects_leaves_the_builders_alone() {
    let mut s = SecretBuilder::new("creds", SecretType::Opaque);
    s.set("password", "s3cret").set_string_data("user", "admin");
    let secret_before = serde_json::to_value(s.manifest().unwrap()).unwrap();

    let mut secret = s.manifest().unwrap();
    secret.data.as_mut().unwrap().clear();
    secret.string_data.as_mut().unwrap().insert("user".into(), "root".into());
    assert_eq!(serde_json::to_value(s.manifest().unwrap()).unwrap(), secret_before);

    let mut cm = ConfigMapBuilder::new("settings");
    cm.set("mode", "fast").set("blob", vec![0u8, 1, 2]);
    let cm_before = serde_json::to_value(cm.manifest().unwrap()).unwrap();

    let mut out = cm.manifest().unwrap();
    out.data.as_mut().unwrap().insert("mode".into(), "slow".into());
    out.binary_data.as_mut().unwrap().remove("blob");
    assert_eq!(serde_json::to_value(cm.manifest().unwrap()).unwrap(), cm_before);
}

#[test]
fn enum_mutators_reject_out_of_set_values() {
    let mut d = DeploymentBuilder::new("web", ContainerBuilder::new("app", "nginx"));
    assert!(matches!(d.add_selector_match_expressions("k", "Like", ["v"]), Err(Error::InvalidArgument(_))));
    assert!(matches!(d.set_strategy("Canary", None, None), Err(Error::InvalidArgument(_))));
}
