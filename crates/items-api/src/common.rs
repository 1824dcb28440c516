// Common DTOs for public API

use items_core::FieldViolation;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by failing endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "invalid item: email must be a well-formed email address")]
    pub error: String,
    /// Per-field violations, present on validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }

    pub fn internal() -> Self {
        Self::new("Internal server error")
    }
}
