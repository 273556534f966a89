use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kubewright_core::{Error, Result};

/// Collect `(key, value)` pairs into a string map, coercing values via `ToString`.
pub(crate) fn str_map<I, K, V>(pairs: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    let mut out = BTreeMap::new();
    for (k, v) in pairs {
        let k = k.into();
        if k.is_empty() {
            return Err(Error::invalid("map keys must not be empty"));
        }
        out.insert(k, v.to_string());
    }
    Ok(out)
}

/// Object metadata shared by every builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaMixin {
    meta: ObjectMeta,
}

impl MetaMixin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: ObjectMeta { name: Some(name.into()), ..Default::default() } }
    }

    /// Metadata without a name (pod and job templates).
    pub(crate) fn anonymous() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        self.meta.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.meta.namespace.as_deref()
    }

    pub fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.meta.labels.as_ref()
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.meta.annotations.as_ref()
    }

    pub fn set_namespace(&mut self, ns: impl Into<String>) {
        self.meta.namespace = Some(ns.into());
    }

    pub fn set_labels(&mut self, labels: BTreeMap<String, String>) {
        self.meta.labels = Some(labels);
    }

    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.meta.annotations = Some(annotations);
    }

    pub fn insert_label(&mut self, k: String, v: String) {
        self.meta.labels.get_or_insert_with(BTreeMap::new).insert(k, v);
    }

    pub fn insert_annotation(&mut self, k: String, v: String) {
        self.meta.annotations.get_or_insert_with(BTreeMap::new).insert(k, v);
    }

    pub fn object_meta(&self) -> ObjectMeta {
        self.meta.clone()
    }

    /// `None` when nothing was set; keeps templates compact on the wire.
    pub(crate) fn object_meta_opt(&self) -> Option<ObjectMeta> {
        (self.meta != ObjectMeta::default()).then(|| self.meta.clone())
    }
}

/// Builders whose own object metadata can be edited.
pub trait WithMetadata {
    fn meta_mut(&mut self) -> &mut MetaMixin;
    fn meta(&self) -> &MetaMixin;

    fn name(&self) -> &str {
        self.meta().name()
    }

    fn set_namespace(&mut self, ns: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.meta_mut().set_namespace(ns);
        self
    }

    /// Replace all labels.
    fn set_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let m = str_map(labels)?;
        self.meta_mut().set_labels(m);
        Ok(self)
    }

    /// Replace all annotations.
    fn set_annotations<I, K, V>(&mut self, annotations: I) -> Result<&mut Self>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let m = str_map(annotations)?;
        self.meta_mut().set_annotations(m);
        Ok(self)
    }

    fn add_label(&mut self, key: impl Into<String>, value: impl ToString) -> Result<&mut Self>
    where
        Self: Sized,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::invalid("label key must not be empty"));
        }
        self.meta_mut().insert_label(key, value.to_string());
        Ok(self)
    }

    fn add_annotation(&mut self, key: impl Into<String>, value: impl ToString) -> Result<&mut Self>
    where
        Self: Sized,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::invalid("annotation key must not be empty"));
        }
        self.meta_mut().insert_annotation(key, value.to_string());
        Ok(self)
    }
}

macro_rules! impl_with_metadata {
    ($ty:ty, $($field:tt).+) => {
        impl $crate::meta::WithMetadata for $ty {
            fn meta_mut(&mut self) -> &mut $crate::meta::MetaMixin {
                &mut self.$($field).+
            }
            fn meta(&self) -> &$crate::meta::MetaMixin {
                &self.$($field).+
            }
        }
    };
}
pub(crate) use impl_with_metadata;
