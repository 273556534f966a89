use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment, RollingUpdateStatefulSetStrategy,
    StatefulSet, StatefulSetPersistentVolumeClaimRetentionPolicy, StatefulSetSpec,
    StatefulSetUpdateStrategy as StsStrategy,
};
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kubewright_core::{
    Error, IntoChoice, MatchExprOperator, PodManagementPolicy, Result, RetentionPolicy, StatefulSetUpdateStrategy,
    UpdateStrategy,
};

use crate::container::ContainerBuilder;
use crate::helpers::IntOrStr;
use crate::meta::{impl_with_metadata, MetaMixin};
use crate::pod::PodTemplateBuilder;
use crate::selector::LabelSelectorBuilder;
use crate::ManifestBuilder;

/// Selector, replica and pod-template setters shared by Deployment and StatefulSet.
macro_rules! workload_common {
    ($ty:ty) => {
        impl $ty {
            pub fn template_mut(&mut self) -> &mut PodTemplateBuilder {
                &mut self.template
            }

            pub fn pod_spec_mut(&mut self) -> &mut crate::pod::PodSpecBuilder {
                self.template.spec_mut()
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

            pub fn set_replicas(&mut self, n: i32) -> &mut Self {
                self.replicas = Some(n);
                self
            }

            pub fn set_revision_history_limit(&mut self, n: i32) -> &mut Self {
                self.revision_history_limit = Some(n);
                self
            }

            pub fn set_selector_match_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
            where
                I: IntoIterator<Item = (K, V)>,
                K: Into<String>,
                V: ToString,
            {
                self.selector.set_match_labels(labels)?;
                Ok(self)
            }

            /// Copy of the selector's `matchLabels`.
            pub fn selector_match_labels(&self) -> BTreeMap<String, String> {
                self.selector.match_labels()
            }

            pub fn add_selector_match_expressions<I, S>(
                &mut self,
                key: impl Into<String>,
                operator: impl IntoChoice<MatchExprOperator>,
                values: I,
            ) -> Result<&mut Self>
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.selector.add_match_expression(key, operator, values)?;
                Ok(self)
            }
        }
    };
}

/// Deployment with a pod template and label selector.
///
/// `spec.selector` is a required field of the typed object, so a builder with no selector
/// emits an empty selector (`{}`) rather than omitting it; the API server rejects or
/// defaults it as it would any empty selector.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentBuilder {
    meta: MetaMixin,
    template: PodTemplateBuilder,
    selector: LabelSelectorBuilder,
    replicas: Option<i32>,
    revision_history_limit: Option<i32>,
    strategy: Option<DeploymentStrategy>,
}

impl_with_metadata!(DeploymentBuilder, meta);
workload_common!(DeploymentBuilder);

impl DeploymentBuilder {
    pub fn new(name: impl Into<String>, container: ContainerBuilder) -> Self {
        Self {
            meta: MetaMixin::new(name),
            template: PodTemplateBuilder::new(container),
            selector: LabelSelectorBuilder::new(),
            replicas: None,
            revision_history_limit: None,
            strategy: None,
        }
    }

    /// Both rolling parameters are stored whatever the strategy type.
    pub fn set_strategy(
        &mut self,
        typ: impl IntoChoice<UpdateStrategy>,
        max_surge: Option<IntOrStr>,
        max_unavailable: Option<IntOrStr>,
    ) -> Result<&mut Self> {
        let typ = typ.into_choice()?;
        self.strategy = Some(DeploymentStrategy {
            type_: Some(typ.to_string()),
            rolling_update: Some(RollingUpdateDeployment {
                max_surge: max_surge.map(Into::into),
                max_unavailable: max_unavailable.map(Into::into),
            }),
        });
        Ok(self)
    }
}

impl ManifestBuilder for DeploymentBuilder {
    type Object = Deployment;

    /// An unset selector is emitted empty and left to server-side defaulting.
    fn manifest(&self) -> Result<Deployment> {
        Ok(Deployment {
            metadata: self.meta.object_meta(),
            spec: Some(DeploymentSpec {
                replicas: self.replicas,
                revision_history_limit: self.revision_history_limit,
                selector: self.selector.selector(),
                strategy: self.strategy.clone(),
                template: self.template.template(),
                ..Default::default()
            }),
            status: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatefulSetBuilder {
    meta: MetaMixin,
    template: PodTemplateBuilder,
    selector: LabelSelectorBuilder,
    replicas: Option<i32>,
    revision_history_limit: Option<i32>,
    service_name: String,
    update_strategy: Option<StsStrategy>,
    pod_management_policy: Option<PodManagementPolicy>,
    retention: Option<StatefulSetPersistentVolumeClaimRetentionPolicy>,
    volume_claim_templates: Vec<PersistentVolumeClaim>,
}

impl_with_metadata!(StatefulSetBuilder, meta);
workload_common!(StatefulSetBuilder);

impl StatefulSetBuilder {
    pub fn new(name: impl Into<String>, container: ContainerBuilder) -> Self {
        Self {
            meta: MetaMixin::new(name),
            template: PodTemplateBuilder::new(container),
            selector: LabelSelectorBuilder::new(),
            replicas: None,
            revision_history_limit: None,
            service_name: String::new(),
            update_strategy: None,
            pod_management_policy: None,
            retention: None,
            volume_claim_templates: Vec::new(),
        }
    }

    pub fn set_service_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.service_name = name.into();
        self
    }

    pub fn set_update_strategy(
        &mut self,
        typ: impl IntoChoice<StatefulSetUpdateStrategy>,
        max_unavailable: Option<IntOrStr>,
        partition: Option<i32>,
    ) -> Result<&mut Self> {
        let typ = typ.into_choice()?;
        let rolling = (max_unavailable.is_some() || partition.is_some()).then(|| RollingUpdateStatefulSetStrategy {
            max_unavailable: max_unavailable.map(Into::into),
            partition,
        });
        self.update_strategy = Some(StsStrategy { type_: Some(typ.to_string()), rolling_update: rolling });
        Ok(self)
    }

    pub fn set_pvc_retention_policy(
        &mut self,
        when_deleted: impl IntoChoice<RetentionPolicy>,
        when_scaled: impl IntoChoice<RetentionPolicy>,
    ) -> Result<&mut Self> {
        self.retention = Some(StatefulSetPersistentVolumeClaimRetentionPolicy {
            when_deleted: Some(when_deleted.into_choice()?.to_string()),
            when_scaled: Some(when_scaled.into_choice()?.to_string()),
        });
        Ok(self)
    }

    pub fn set_pod_management_policy(&mut self, policy: impl IntoChoice<PodManagementPolicy>) -> Result<&mut Self> {
        self.pod_management_policy = Some(policy.into_choice()?);
        Ok(self)
    }

    /// Claim templates are keyed by `metadata.name`; the first one wins.
    pub fn add_volume_claim_template(&mut self, pvc: PersistentVolumeClaim) -> &mut Self {
        if !self.volume_claim_templates.iter().any(|p| p.metadata.name == pvc.metadata.name) {
            self.volume_claim_templates.push(pvc);
        }
        self
    }
}

impl ManifestBuilder for StatefulSetBuilder {
    type Object = StatefulSet;

    fn manifest(&self) -> Result<StatefulSet> {
        if self.service_name.is_empty() {
            return Err(Error::invalid("invalid value for `service_name`, must not be empty"));
        }
        if self.selector.is_empty() {
            return Err(Error::invalid("invalid value for `selector`, must not be empty"));
        }
        Ok(StatefulSet {
            metadata: self.meta.object_meta(),
            spec: Some(StatefulSetSpec {
                replicas: self.replicas,
                revision_history_limit: self.revision_history_limit,
                selector: self.selector.selector(),
                service_name: self.service_name.clone(),
                template: self.template.template(),
                update_strategy: self.update_strategy.clone(),
                pod_management_policy: self.pod_management_policy.map(|p| p.to_string()),
                persistent_volume_claim_retention_policy: self.retention.clone(),
                volume_claim_templates: (!self.volume_claim_templates.is_empty())
                    .then(|| self.volume_claim_templates.clone()),
                ..Default::default()
            }),
            status: None,
        })
    }
}
