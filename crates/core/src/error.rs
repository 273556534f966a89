use thiserror::Error;

/// Errors surfaced by builders, the request wrapper and long-running ops.
#[derive(Debug, Error)]
pub enum Error {
    /// Builder validation or emit-time check failed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// API answered 404. Wrapped calls demote this to `None`.
    #[error("not found: {0}")]
    NotFound(String),

    /// API answered 409 on create. Wrapped calls demote this to `None`.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("kubernetes api error: {0}")]
    ApiFailure(#[from] kube::Error),

    #[error("command \"{command}\" ended with status code: {code}")]
    ExecFailure { command: String, code: i32 },

    /// The exec transport closed before a status frame arrived.
    #[error("command \"{0}\" ended without a status frame")]
    MissingStatus(String),

    #[error("{0}")]
    Timeout(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_choice(label: &str, got: &str, allowed: &[&str]) -> Self {
        Error::InvalidArgument(format!(
            "invalid {label} value `{got}`, can be one of `{}`",
            allowed.join(", ")
        ))
    }

    /// HTTP status code when the error came from the API server.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::ApiFailure(kube::Error::Api(ae)) => Some(ae.code),
            Error::NotFound(_) => Some(404),
            Error::AlreadyExists(_) => Some(409),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
