// Item domain types
//
// The single record managed by the service, plus the request shape used to
// create or replace one. Validation happens here so every entry point
// rejects bad input before touching a store.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Email pattern: local@host, where host is one or more dot-separated labels.
/// A single-label host such as `localhost` is accepted.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .expect("email regex is valid")
});

/// Well-known item status values. Status is free-form text, these are the
/// ones the service itself writes.
pub struct ItemStatus;

impl ItemStatus {
    pub const NEW: &'static str = "NEW";
    pub const PROCESSED: &'static str = "PROCESSED";
}

/// A stored item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Item {
    /// Assigned by the store on first save; `None` for unsaved items.
    #[cfg_attr(feature = "openapi", schema(example = 1))]
    pub id: Option<i64>,
    #[cfg_attr(feature = "openapi", schema(example = "Widget"))]
    pub name: String,
    #[cfg_attr(feature = "openapi", schema(example = "A small widget"))]
    pub description: String,
    #[cfg_attr(feature = "openapi", schema(example = "NEW"))]
    pub status: String,
    #[cfg_attr(feature = "openapi", schema(example = "owner@example.com"))]
    pub email: String,
}

impl Item {
    /// Create an unsaved item
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status: status.into(),
            email: email.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_processed(&self) -> bool {
        self.status == ItemStatus::PROCESSED
    }
}

/// Request body for creating or replacing an item.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation failure, together with any other violations,
/// instead of a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ItemInput {
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "Widget"))]
    pub name: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "A small widget"))]
    pub description: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "NEW"))]
    pub status: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(example = "owner@example.com"))]
    pub email: Option<String>,
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Input rejected at the boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid item: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl ItemInput {
    /// Validate the input and build an unsaved item from it.
    pub fn validate(self) -> Result<Item, ValidationError> {
        let mut violations = Vec::new();

        let name = required("name", self.name, &mut violations);
        let description = required("description", self.description, &mut violations);
        let status = required("status", self.status, &mut violations);
        let email = required("email", self.email, &mut violations);

        if let Some(email) = &email {
            if !is_valid_email(email) {
                violations.push(FieldViolation {
                    field: "email".to_string(),
                    message: "must be a well-formed email address".to_string(),
                });
            }
        }

        match (name, description, status, email) {
            (Some(name), Some(description), Some(status), Some(email))
                if violations.is_empty() =>
            {
                Ok(Item::new(name, description, status, email))
            }
            _ => Err(ValidationError { violations }),
        }
    }
}

impl From<Item> for ItemInput {
    fn from(item: Item) -> Self {
        Self {
            name: Some(item.name),
            description: Some(item.description),
            status: Some(item.status),
            email: Some(item.email),
        }
    }
}

fn required(
    field: &str,
    value: Option<String>,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            violations.push(FieldViolation {
                field: field.to_string(),
                message: "must not be blank".to_string(),
            });
            None
        }
    }
}

/// Check if a string is a well-formed email address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
