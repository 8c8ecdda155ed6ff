use axum::response::IntoResponse;
use http::StatusCode;
use wrh_models::{ErrorBody, ErrorDetail, GroupNameError};

#[derive(thiserror::Error, Debug)]
pub enum VersionError {
    #[error(
        "Version of group `{0}` is locked: the pending version is already published, delete it before making further changes"
    )]
    VersionLocked(String),
    #[error("No pending version exists for group `{0}`")]
    NoDraftExists(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid shard host: {0}")]
    InvalidHost(#[from] validator::ValidationErrors),
    #[error("Invalid shard group: {0}")]
    InvalidGroup(#[from] GroupNameError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type VersionResult<T> = Result<T, VersionError>;

impl VersionError {
    pub fn code(&self) -> &'static str {
        match self {
            VersionError::VersionLocked(_) => "VERSION_LOCKED",
            VersionError::NoDraftExists(_) => "NO_DRAFT_EXISTS",
            VersionError::NotFound(_) => "NOT_FOUND",
            VersionError::InvalidHost(_) => "INVALID_HOST",
            VersionError::InvalidGroup(_) => "INVALID_GROUP",
            VersionError::Unauthorized(_) => "UNAUTHORIZED",
            VersionError::Storage(_) => "STORAGE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            VersionError::VersionLocked(_)
            | VersionError::NoDraftExists(_) => StatusCode::CONFLICT,
            VersionError::NotFound(_) => StatusCode::NOT_FOUND,
            VersionError::InvalidHost(_) | VersionError::InvalidGroup(_) => {
                StatusCode::BAD_REQUEST
            }
            VersionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            VersionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for VersionError {
    fn from(value: std::io::Error) -> Self {
        VersionError::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for VersionError {
    fn from(value: serde_json::Error) -> Self {
        VersionError::Storage(value.to_string())
    }
}

impl IntoResponse for VersionError {
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
