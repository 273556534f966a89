use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::ObjectList;
use kubewright_core::Result;

use crate::{Call, KubeApi};

macro_rules! namespaced_kind {
    ($ty:ty, $create:ident, $get:ident, $list:ident, $delete:ident) => {
        pub async fn $create(&self, obj: &$ty, call: Call<'_>) -> Result<Option<$ty>> {
            self.create_in(self.namespaced::<$ty>(&call), obj, call.check_err.unwrap_or(true)).await
        }

        pub async fn $get(&self, name: &str, call: Call<'_>) -> Result<Option<$ty>> {
            self.get_in(self.namespaced::<$ty>(&call), name, call.check_err.unwrap_or(true)).await
        }

        pub async fn $list(&self, call: Call<'_>) -> Result<ObjectList<$ty>> {
            self.list_in(self.namespaced::<$ty>(&call), &call).await
        }

        pub async fn $delete(&self, name: &str, call: Call<'_>) -> Result<Option<$ty>> {
            self.delete_in(self.namespaced::<$ty>(&call), name, call.check_err.unwrap_or(false)).await
        }
    };
}

macro_rules! cluster_kind {
    ($ty:ty, $create:ident, $get:ident, $list:ident, $delete:ident, $check_default:expr) => {
        pub async fn $create(&self, obj: &$ty, call: Call<'_>) -> Result<Option<$ty>> {
            self.create_in(self.cluster::<$ty>(), obj, call.check_err.unwrap_or($check_default)).await
        }

        pub async fn $get(&self, name: &str, call: Call<'_>) -> Result<Option<$ty>> {
            self.get_in(self.cluster::<$ty>(), name, call.check_err.unwrap_or($check_default)).await
        }

        pub async fn $list(&self, call: Call<'_>) -> Result<ObjectList<$ty>> {
            self.list_in(self.cluster::<$ty>(), &call).await
        }

        pub async fn $delete(&self, name: &str, call: Call<'_>) -> Result<Option<$ty>> {
            self.delete_in(self.cluster::<$ty>(), name, call.check_err.unwrap_or(false)).await
        }
    };
}

impl KubeApi {
    namespaced_kind!(Pod, pod_create, pod_get, pod_list, pod_delete);
    namespaced_kind!(Deployment, deployment_create, deployment_get, deployment_list, deployment_delete);
    namespaced_kind!(StatefulSet, stateful_set_create, stateful_set_get, stateful_set_list, stateful_set_delete);
    namespaced_kind!(Job, job_create, job_get, job_list, job_delete);
    namespaced_kind!(CronJob, cron_job_create, cron_job_get, cron_job_list, cron_job_delete);
    namespaced_kind!(Service, service_create, service_get, service_list, service_delete);
    namespaced_kind!(Ingress, ingress_create, ingress_get, ingress_list, ingress_delete);
    namespaced_kind!(ConfigMap, configmap_create, configmap_get, configmap_list, configmap_delete);
    namespaced_kind!(Secret, secret_create, secret_get, secret_list, secret_delete);
    namespaced_kind!(PersistentVolumeClaim, pvc_create, pvc_get, pvc_list, pvc_delete);
    namespaced_kind!(ServiceAccount, service_account_create, service_account_get, service_account_list, service_account_delete);
    namespaced_kind!(Role, role_create, role_get, role_list, role_delete);
    namespaced_kind!(RoleBinding, role_binding_create, role_binding_get, role_binding_list, role_binding_delete);

    // Namespace reads and creates swallow errors unless asked otherwise.
    cluster_kind!(Namespace, namespace_create, namespace_get, namespace_list, namespace_delete, false);
    cluster_kind!(ClusterRole, cluster_role_create, cluster_role_get, cluster_role_list, cluster_role_delete, true);
    cluster_kind!(
        ClusterRoleBinding,
        cluster_role_binding_create,
        cluster_role_binding_get,
        cluster_role_binding_list,
        cluster_role_binding_delete,
        true
    );
}
