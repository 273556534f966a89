use k8s_openapi::api::core::v1::{LocalObjectReference, Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kubewright_core::{Error, Result};

use crate::meta::{impl_with_metadata, MetaMixin};
use crate::ManifestBuilder;

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceBuilder {
    meta: MetaMixin,
}

impl_with_metadata!(NamespaceBuilder, meta);

impl NamespaceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: MetaMixin::new(name) }
    }
}

impl ManifestBuilder for NamespaceBuilder {
    type Object = Namespace;

    fn manifest(&self) -> Result<Namespace> {
        Ok(Namespace { metadata: self.meta.object_meta(), ..Default::default() })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAccountBuilder {
    meta: MetaMixin,
    image_pull_secrets: Vec<String>,
    automount_token: Option<bool>,
}

impl_with_metadata!(ServiceAccountBuilder, meta);

impl ServiceAccountBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { meta: MetaMixin::new(name), image_pull_secrets: Vec::new(), automount_token: None }
    }

    pub fn add_image_pull_secret(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.image_pull_secrets.contains(&name) {
            self.image_pull_secrets.push(name);
        }
        self
    }

    pub fn set_automount_token(&mut self, on: bool) -> &mut Self {
        self.automount_token = Some(on);
        self
    }
}

impl ManifestBuilder for ServiceAccountBuilder {
    type Object = ServiceAccount;

    fn manifest(&self) -> Result<ServiceAccount> {
        let secrets = self.image_pull_secrets.iter().map(|n| LocalObjectReference { name: Some(n.clone()) }).collect::<Vec<_>>();
        Ok(ServiceAccount {
            metadata: self.meta.object_meta(),
            automount_service_account_token: self.automount_token,
            image_pull_secrets: (!secrets.is_empty()).then_some(secrets),
            ..Default::default()
        })
    }
}

/// Policy rules shared by Role and ClusterRole.
#[derive(Debug, Clone, Default, PartialEq)]
struct Rules(Vec<PolicyRule>);

impl Rules {
    fn add<I, J, K, S, T, U>(&mut self, api_groups: I, resources: J, verbs: K) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        K: IntoIterator<Item = U>,
        S: Into<String>,
        T: Into<String>,
        U: Into<String>,
    {
        let verbs = strings(verbs);
        if verbs.is_empty() {
            return Err(Error::invalid("policy rule needs at least one verb"));
        }
        self.push(PolicyRule {
            api_groups: Some(strings(api_groups)),
            resources: Some(strings(resources)),
            verbs,
            ..Default::default()
        });
        Ok(())
    }

    fn push(&mut self, rule: PolicyRule) {
        if !self.0.contains(&rule) {
            self.0.push(rule);
        }
    }

    fn emit(&self) -> Option<Vec<PolicyRule>> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

macro_rules! role_builder {
    ($name:ident, $obj:ident) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            meta: MetaMixin,
            rules: Rules,
        }

        impl_with_metadata!($name, meta);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self { meta: MetaMixin::new(name), rules: Rules::default() }
            }

            /// `api_groups` uses `""` for the core group.
            pub fn add_rule<I, J, K, S, T, U>(&mut self, api_groups: I, resources: J, verbs: K) -> Result<&mut Self>
            where
                I: IntoIterator<Item = S>,
                J: IntoIterator<Item = T>,
                K: IntoIterator<Item = U>,
                S: Into<String>,
                T: Into<String>,
                U: Into<String>,
            {
                self.rules.add(api_groups, resources, verbs)?;
                Ok(self)
            }

            pub fn add_policy_rule(&mut self, rule: PolicyRule) -> &mut Self {
                self.rules.push(rule);
                self
            }
        }

        impl ManifestBuilder for $name {
            type Object = $obj;

            fn manifest(&self) -> Result<$obj> {
                Ok($obj { metadata: self.meta.object_meta(), rules: self.rules.emit(), ..Default::default() })
            }
        }
    };
}

role_builder!(RoleBuilder, Role);
role_builder!(ClusterRoleBuilder, ClusterRole);

/// Subjects shared by both binding kinds.
#[derive(Debug, Clone, Default, PartialEq)]
struct Subjects(Vec<Subject>);

impl Subjects {
    fn push(&mut self, s: Subject) {
        if !self.0.contains(&s) {
            self.0.push(s);
        }
    }

    fn emit(&self) -> Option<Vec<Subject>> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

macro_rules! binding_builder {
    ($name:ident, $obj:ident) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            meta: MetaMixin,
            role_ref: RoleRef,
            subjects: Subjects,
        }

        impl_with_metadata!($name, meta);

        impl $name {
            pub fn add_service_account(&mut self, name: impl Into<String>, namespace: impl Into<String>) -> &mut Self {
                self.subjects.push(Subject {
                    kind: "ServiceAccount".into(),
                    name: name.into(),
                    namespace: Some(namespace.into()),
                    api_group: None,
                });
                self
            }

            pub fn add_user(&mut self, name: impl Into<String>) -> &mut Self {
                self.subjects.push(Subject {
                    kind: "User".into(),
                    name: name.into(),
                    namespace: None,
                    api_group: Some(RBAC_GROUP.into()),
                });
                self
            }

            pub fn add_group(&mut self, name: impl Into<String>) -> &mut Self {
                self.subjects.push(Subject {
                    kind: "Group".into(),
                    name: name.into(),
                    namespace: None,
                    api_group: Some(RBAC_GROUP.into()),
                });
                self
            }
        }

        impl ManifestBuilder for $name {
            type Object = $obj;

            fn manifest(&self) -> Result<$obj> {
                if self.subjects.0.is_empty() {
                    return Err(Error::invalid(format!("{} `{}` has no subjects", stringify!($obj), self.meta.name())));
                }
                Ok($obj {
                    metadata: self.meta.object_meta(),
                    role_ref: self.role_ref.clone(),
                    subjects: self.subjects.emit(),
                })
            }
        }
    };
}

binding_builder!(RoleBindingBuilder, RoleBinding);
binding_builder!(ClusterRoleBindingBuilder, ClusterRoleBinding);

impl RoleBindingBuilder {
    /// Bind a namespaced `Role`.
    pub fn for_role(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self::with_ref(name, "Role", role)
    }

    /// Bind a `ClusterRole` within one namespace.
    pub fn for_cluster_role(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self::with_ref(name, "ClusterRole", role)
    }

    fn with_ref(name: impl Into<String>, kind: &str, role: impl Into<String>) -> Self {
        Self {
            meta: MetaMixin::new(name),
            role_ref: RoleRef { api_group: RBAC_GROUP.into(), kind: kind.into(), name: role.into() },
            subjects: Subjects::default(),
        }
    }
}

impl ClusterRoleBindingBuilder {
    pub fn new(name: impl Into<String>, cluster_role: impl Into<String>) -> Self {
        Self {
            meta: MetaMixin::new(name),
            role_ref: RoleRef { api_group: RBAC_GROUP.into(), kind: "ClusterRole".into(), name: cluster_role.into() },
            subjects: Subjects::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_rules_dedup_and_need_verbs() {
        let mut r = RoleBuilder::new("pod-reader");
        r.add_rule([""], ["pods", "pods/log"], ["get", "list"]).unwrap();
        r.add_rule([""], ["pods", "pods/log"], ["get", "list"]).unwrap();
        assert!(r.add_rule(["apps"], ["deployments"], Vec::<String>::new()).is_err());
        let v = serde_json::to_value(r.manifest().unwrap()).unwrap();
        assert_eq!(v["rules"], json!([{"apiGroups": [""], "resources": ["pods", "pods/log"], "verbs": ["get", "list"]}]));
    }

    #[test]
    fn bindings_reference_roles_and_subjects() {
        let mut b = RoleBindingBuilder::for_role("read-pods", "pod-reader");
        assert!(b.manifest().is_err());
        b.add_service_account("ci", "build").add_user("jane").add_user("jane");
        let out = b.manifest().unwrap();
        assert_eq!(out.role_ref.kind, "Role");
        assert_eq!(out.role_ref.api_group, RBAC_GROUP);
        assert_eq!(out.subjects.unwrap().len(), 2);

        let mut cb = ClusterRoleBindingBuilder::new("view-all", "view");
        cb.add_group("auditors");
        assert_eq!(cb.manifest().unwrap().role_ref.kind, "ClusterRole");
    }

    #[test]
    fn service_account_pull_secrets() {
        let mut sa = ServiceAccountBuilder::new("builder");
        sa.add_image_pull_secret("regcred").add_image_pull_secret("regcred").set_automount_token(false);
        let v = serde_json::to_value(sa.manifest().unwrap()).unwrap();
        assert_eq!(v["imagePullSecrets"], json!([{"name": "regcred"}]));
        assert_eq!(v["automountServiceAccountToken"], false);
    }
}
