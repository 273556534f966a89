use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, TypedLocalObjectReference, TypedObjectReference,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kubewright_core::{IntoChoice, MatchExprOperator, PvcAccessMode, Result, VolumeMode};

use crate::meta::{impl_with_metadata, MetaMixin};
use crate::selector::LabelSelectorBuilder;
use crate::ManifestBuilder;

fn storage(size: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([("storage".to_string(), Quantity(size.to_string()))])
}

#[derive(Debug, Clone, PartialEq)]
pub struct PvcBuilder {
    meta: MetaMixin,
    spec: PersistentVolumeClaimSpec,
    selector: LabelSelectorBuilder,
}

impl_with_metadata!(PvcBuilder, meta);

impl PvcBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: MetaMixin::new(name), spec: PersistentVolumeClaimSpec::default(), selector: LabelSelectorBuilder::new() }
    }

    pub fn set_access_modes<I, M>(&mut self, modes: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = M>,
        M: IntoChoice<PvcAccessMode>,
    {
        let modes = modes
            .into_iter()
            .map(|m| m.into_choice().map(|m| m.to_string()))
            .collect::<Result<Vec<_>>>()?;
        self.spec.access_modes = Some(modes);
        Ok(self)
    }

    pub fn set_data_source(&mut self, name: impl Into<String>, api_group: Option<&str>, kind: impl Into<String>) -> &mut Self {
        self.spec.data_source = Some(TypedLocalObjectReference {
            api_group: api_group.map(str::to_string),
            kind: kind.into(),
            name: name.into(),
        });
        self
    }

    pub fn set_data_source_ref(
        &mut self,
        name: impl Into<String>,
        namespace: Option<&str>,
        api_group: Option<&str>,
        kind: impl Into<String>,
    ) -> &mut Self {
        self.spec.data_source_ref = Some(TypedObjectReference {
            api_group: api_group.map(str::to_string),
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.map(str::to_string),
        });
        self
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

    pub fn set_match_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.selector.set_match_labels(labels)?;
        Ok(self)
    }

    pub fn set_storage_class_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.spec.storage_class_name = Some(name.into());
        self
    }

    pub fn set_volume_mode(&mut self, mode: impl IntoChoice<VolumeMode>) -> Result<&mut Self> {
        self.spec.volume_mode = Some(mode.into_choice()?.to_string());
        Ok(self)
    }

    pub fn set_volume_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.spec.volume_name = Some(name.into());
        self
    }

    /// `requests.storage`, e.g. `"10Gi"`.
    pub fn set_resources_requests(&mut self, size: &str) -> &mut Self {
        self.spec.resources.get_or_insert_with(Default::default).requests = Some(storage(size));
        self
    }

    pub fn set_resources_limits(&mut self, size: &str) -> &mut Self {
        self.spec.resources.get_or_insert_with(Default::default).limits = Some(storage(size));
        self
    }
}

impl ManifestBuilder for PvcBuilder {
    type Object = PersistentVolumeClaim;

    fn manifest(&self) -> Result<PersistentVolumeClaim> {
        let mut spec = self.spec.clone();
        if !self.selector.is_empty() {
            spec.selector = Some(self.selector.selector());
        }
        Ok(PersistentVolumeClaim { metadata: self.meta.object_meta(), spec: Some(spec), status: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pvc_fields() {
        let mut p = PvcBuilder::new("data");
        p.set_access_modes([PvcAccessMode::ReadWriteOnce, PvcAccessMode::ReadOnlyMany]).unwrap();
        p.set_storage_class_name("fast").set_resources_requests("10Gi").set_resources_limits("20Gi");
        p.set_volume_mode("Block").unwrap();
        p.set_data_source("snap-1", Some("snapshot.storage.k8s.io"), "VolumeSnapshot");
        p.add_selector_match_expressions("zone", MatchExprOperator::In, ["a", "b"]).unwrap();

        let v = serde_json::to_value(p.manifest().unwrap()).unwrap();
        let spec = &v["spec"];
        assert_eq!(spec["accessModes"], json!(["ReadWriteOnce", "ReadOnlyMany"]));
        assert_eq!(spec["resources"], json!({"requests": {"storage": "10Gi"}, "limits": {"storage": "20Gi"}}));
        assert_eq!(spec["volumeMode"], "Block");
        assert_eq!(spec["dataSource"]["kind"], "VolumeSnapshot");
        assert_eq!(spec["selector"]["matchExpressions"][0]["values"], json!(["a", "b"]));
    }

    #[test]
    fn pvc_rejects_unknown_modes() {
        let mut p = PvcBuilder::new("data");
        assert!(p.set_access_modes(["ReadWriteSometimes"]).is_err());
        assert!(p.set_volume_mode("Tape").is_err());
        let spec = p.manifest().unwrap().spec.unwrap();
        assert!(spec.access_modes.is_none());
        assert!(spec.selector.is_none());
    }
}
