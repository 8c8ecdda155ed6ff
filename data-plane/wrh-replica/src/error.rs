use axum::http::StatusCode;
use axum::response::IntoResponse;
use wrh_models::{ErrorBody, ErrorDetail};

/// Failure reaching or reading from the master.
#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    #[error("No published version of group `{0}`")]
    NotFound(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid controller settings: {0}")]
    InvalidSettings(String),
}

impl ControllerError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControllerError::NotFound(_))
    }
}

impl From<reqwest::Error> for ControllerError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            ControllerError::Transport(format!("request timed out: {value}"))
        } else if value.is_connect() {
            ControllerError::Transport(format!("connection failed: {value}"))
        } else {
            ControllerError::Transport(value.to_string())
        }
    }
}

/// The local storage engine refused to set up or tear down a capability.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CapabilityError {
    pub message: String,
    /// Retryable errors keep the state machine in place for the next
    /// invocation; the rest move it to `FAILED`.
    pub retryable: bool,
}

impl CapabilityError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReplicaError {
    #[error("Controller is not configured; call configure_controller first")]
    NotConfigured,
    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
    #[error("State store error: {0}")]
    StateStore(String),
    #[error("Invalid shard group: {0}")]
    InvalidGroup(#[from] wrh_models::GroupNameError),
}

impl From<std::io::Error> for ReplicaError {
    fn from(value: std::io::Error) -> Self {
        ReplicaError::StateStore(value.to_string())
    }
}

impl From<serde_json::Error> for ReplicaError {
    fn from(value: serde_json::Error) -> Self {
        ReplicaError::StateStore(value.to_string())
    }
}

impl ReplicaError {
    pub fn code(&self) -> &'static str {
        match self {
            ReplicaError::NotConfigured => "NOT_CONFIGURED",
            ReplicaError::Controller(_) => "CONTROLLER_ERROR",
            ReplicaError::StateStore(_) => "STATE_STORE_ERROR",
            ReplicaError::InvalidGroup(_) => "INVALID_GROUP",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ReplicaError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ReplicaError::Controller(ControllerError::InvalidSettings(_)) => {
                StatusCode::BAD_REQUEST
            }
            ReplicaError::Controller(_) => StatusCode::BAD_GATEWAY,
            ReplicaError::StateStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReplicaError::InvalidGroup(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ReplicaError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), axum::Json(body)).into_response()
    }
}
