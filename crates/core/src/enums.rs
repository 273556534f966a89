//! Closed string-valued enumerations used by manifest builders.
//!
//! Every enum parses only its own wire strings; anything else is
//! `Error::InvalidArgument` naming the allowed set.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Accept either a typed member or its wire string; strings are validated.
pub trait IntoChoice<E> {
    fn into_choice(self) -> Result<E, Error>;
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// All members in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(Error::invalid_choice($label, other, &[$($wire),+])),
                }
            }
        }

        impl IntoChoice<$name> for $name {
            fn into_choice(self) -> Result<$name, Error> {
                Ok(self)
            }
        }

        impl IntoChoice<$name> for &str {
            fn into_choice(self) -> Result<$name, Error> {
                self.parse()
            }
        }

        impl IntoChoice<$name> for String {
            fn into_choice(self) -> Result<$name, Error> {
                self.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.as_str().to_string()
            }
        }
    };
}

closed_enum! {
    /// Secret `type` field values.
    SecretType, "secret type" {
        BasicAuth => "kubernetes.io/basic-auth",
        BootstrapToken => "bootstrap.kubernetes.io/token",
        DockerConfigJson => "kubernetes.io/dockerconfigjson",
        DockerCfg => "kubernetes.io/dockercfg",
        Helm => "helm.sh/release.v1",
        Opaque => "Opaque",
        ServiceAccountToken => "kubernetes.io/service-account-token",
        SshAuth => "kubernetes.io/ssh-auth",
        Tls => "kubernetes.io/tls",
    }
}

closed_enum! {
    PvcAccessMode, "access mode" {
        ReadWriteOnce => "ReadWriteOnce",
        ReadWriteMany => "ReadWriteMany",
        ReadOnlyMany => "ReadOnlyMany",
    }
}

closed_enum! {
    ServiceType, "service type" {
        ClusterIp => "ClusterIP",
        LoadBalancer => "LoadBalancer",
        NodePort => "NodePort",
        ExternalName => "ExternalName",
    }
}

closed_enum! {
    IngressRulePathType, "path type" {
        ImplementationSpecific => "ImplementationSpecific",
        Exact => "Exact",
        Prefix => "Prefix",
    }
}

closed_enum! {
    ImagePullPolicy, "image pull policy" {
        Always => "Always",
        IfNotPresent => "IfNotPresent",
        Never => "Never",
    }
}

closed_enum! {
    /// Label selector requirement operators.
    MatchExprOperator, "operator" {
        In => "In",
        NotIn => "NotIn",
        Exists => "Exists",
        DoesNotExist => "DoesNotExist",
    }
}

closed_enum! {
    VolumeMode, "volume mode" {
        Filesystem => "Filesystem",
        Block => "Block",
    }
}

closed_enum! {
    /// Deployment rollout strategy.
    UpdateStrategy, "strategy type" {
        RollingUpdate => "RollingUpdate",
        Recreate => "Recreate",
    }
}

closed_enum! {
    StatefulSetUpdateStrategy, "update strategy type" {
        RollingUpdate => "RollingUpdate",
        OnDelete => "OnDelete",
    }
}

closed_enum! {
    PodManagementPolicy, "podManagementPolicy" {
        OrderedReady => "OrderedReady",
        Parallel => "Parallel",
    }
}

closed_enum! {
    ConcurrencyPolicy, "concurrency policy" {
        Allow => "Allow",
        Forbid => "Forbid",
        Replace => "Replace",
    }
}

closed_enum! {
    RestartPolicy, "restart policy" {
        Always => "Always",
        OnFailure => "OnFailure",
        Never => "Never",
    }
}

closed_enum! {
    /// StatefulSet PVC retention (`whenDeleted` / `whenScaled`).
    RetentionPolicy, "retention policy" {
        Retain => "Retain",
        Delete => "Delete",
    }
}

closed_enum! {
    Protocol, "protocol" {
        Tcp => "TCP",
        Udp => "UDP",
        Sctp => "SCTP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_member_back_to_itself() {
        for v in SecretType::ALL {
            assert_eq!(v.as_str().parse::<SecretType>().unwrap(), *v);
        }
        for v in MatchExprOperator::ALL {
            assert_eq!(v.to_string().parse::<MatchExprOperator>().unwrap(), *v);
        }
    }

    #[test]
    fn rejects_values_outside_the_set() {
        let err = "Bogus".parse::<UpdateStrategy>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let msg = err.to_string();
        assert!(msg.contains("Bogus"), "{msg}");
        assert!(msg.contains("RollingUpdate, Recreate"), "{msg}");

        assert!("ordered".parse::<PodManagementPolicy>().is_err());
        assert!("in".parse::<MatchExprOperator>().is_err());
        assert!("".parse::<ServiceType>().is_err());
    }

    #[test]
    fn into_choice_accepts_typed_and_wire_values() {
        let a: UpdateStrategy = UpdateStrategy::Recreate.into_choice().unwrap();
        let b: UpdateStrategy = "Recreate".into_choice().unwrap();
        assert_eq!(a, b);
        let bad: Result<UpdateStrategy, Error> = String::from("Blue").into_choice();
        assert!(bad.is_err());
    }

    #[test]
    fn wire_strings_match_api_values() {
        assert_eq!(SecretType::DockerConfigJson.as_str(), "kubernetes.io/dockerconfigjson");
        assert_eq!(SecretType::Tls.as_str(), "kubernetes.io/tls");
        assert_eq!(SecretType::Helm.as_str(), "helm.sh/release.v1");
        assert_eq!(ServiceType::ClusterIp.as_str(), "ClusterIP");
        assert_eq!(Protocol::Tcp.as_str(), "TCP");
        assert_eq!(serde_json::to_string(&PvcAccessMode::ReadOnlyMany).unwrap(), "\"ReadOnlyMany\"");
    }
}
