//! Uniform outcome policy for API calls: not-found and create-conflicts become `None`,
//! other failures propagate or get logged depending on `check_err`.

use std::future::Future;

use kube::api::{DeleteParams, PropagationPolicy};
use kubewright_core::{Error, Result};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Create,
    Read,
    List,
    Patch,
    Delete,
}

impl CallKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            CallKind::Create => "create",
            CallKind::Read => "read",
            CallKind::List => "list",
            CallKind::Patch => "patch",
            CallKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn record(kind: CallKind, outcome: &'static str) {
    metrics::counter!("kube_requests_total", 1, "op" => kind.as_str(), "outcome" => outcome);
}

/// Map a finished call onto `Ok(Some)`, `Ok(None)` or `Err`.
pub fn classify<T>(kind: CallKind, what: &str, check_err: bool, res: std::result::Result<T, kube::Error>) -> Result<Option<T>> {
    let err = match res {
        Ok(v) => {
            debug!(op = %kind, what = %what, "request ok");
            record(kind, "ok");
            return Ok(Some(v));
        }
        Err(e) => Error::from(e),
    };
    match (err.status_code(), kind) {
        (Some(404), _) => {
            debug!(op = %kind, what = %what, "not found");
            record(kind, "not_found");
            Ok(None)
        }
        (Some(409), CallKind::Create) => {
            debug!(op = %kind, what = %what, "already exists");
            record(kind, "conflict");
            Ok(None)
        }
        _ if check_err => {
            record(kind, "error");
            Err(err)
        }
        _ => {
            error!(op = %kind, what = %what, error = %err, "request failed");
            record(kind, "swallowed");
            Ok(None)
        }
    }
}

/// Await an API call and apply [`classify`].
pub async fn guard<T, F>(kind: CallKind, what: &str, check_err: bool, fut: F) -> Result<Option<T>>
where
    F: Future<Output = std::result::Result<T, kube::Error>>,
{
    classify(kind, what, check_err, fut.await)
}

/// Delete parameters used for every delete: foreground cascading.
pub fn foreground_delete() -> DeleteParams {
    DeleteParams { propagation_policy: Some(PropagationPolicy::Foreground), ..Default::default() }
}
