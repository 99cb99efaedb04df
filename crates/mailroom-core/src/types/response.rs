//! Generic response envelope types.

use serde::{Deserialize, Serialize};

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Stable machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

/// Simple message payload for endpoints with no data to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable outcome description.
    pub message: String,
}
