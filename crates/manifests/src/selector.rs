use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use kubewright_core::{IntoChoice, MatchExprOperator, Result};

use crate::meta::str_map;

/// Label selector with deduplicated match expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSelectorBuilder {
    match_labels: Option<BTreeMap<String, String>>,
    match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

impl LabelSelectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_match_labels<I, K, V>(&mut self, labels: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.match_labels = Some(str_map(labels)?);
        Ok(self)
    }

    pub fn match_labels(&self) -> BTreeMap<String, String> {
        self.match_labels.clone().unwrap_or_default()
    }

    /// Adding the same `(key, operator)` twice keeps the first entry.
    pub fn add_match_expression<I, S>(
        &mut self,
        key: impl Into<String>,
        operator: impl IntoChoice<MatchExprOperator>,
        values: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let operator = operator.into_choice()?;
        let key = key.into();
        let exprs = self.match_expressions.get_or_insert_with(Vec::new);
        if exprs.iter().any(|e| e.key == key && e.operator == operator.as_str()) {
            return Ok(self);
        }
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        exprs.push(LabelSelectorRequirement {
            key,
            operator: operator.to_string(),
            values: (!values.is_empty()).then_some(values),
        });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_none() && self.match_expressions.is_none()
    }

    pub fn selector(&self) -> LabelSelector {
        LabelSelector { match_labels: self.match_labels.clone(), match_expressions: self.match_expressions.clone() }
    }
}
