use crate::ShardHost;
use serde::{Deserialize, Serialize};

/// Header carrying the caller identity on master requests.
pub const IDENTITY_HEADER: &str = "x-wrh-identity";
/// Header carrying the caller credential on master requests.
pub const CREDENTIAL_HEADER: &str = "x-wrh-credential";

pub type HostRequest = ShardHost;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}
