//! Domain-level error types for user provisioning.
//!
//! These errors are transport agnostic. The protocol layer maps them to SCIM
//! error envelopes and HTTP status codes using [`ErrorCode`].

use serde::{Deserialize, Serialize};

use super::ports::UserStoreError;
use super::reconcile::ReconcileError;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The resource or request is malformed or violates an invariant.
    BadRequest,
    /// Another live user already owns the requested `userName`.
    Conflict,
    /// No live user has the requested identifier.
    NotFound,
    /// Query parameters are missing or malformed.
    InvalidParameters,
    /// The patch envelope or one of its operations is invalid.
    InvalidPatch,
    /// The query uses a comparison operator other than equality.
    UnsupportedOperator,
    /// The query filters on an attribute that is not indexed.
    UnsupportedFilterAttribute,
    /// The patch request is not a recognised PatchOp message.
    UnsupportedPatchFormat,
    /// The backing store could not be reached.
    ServiceUnavailable,
    /// An unexpected error occurred inside the store.
    InternalError,
}

impl ErrorCode {
    /// HTTP status the protocol layer should report for this code.
    ///
    /// # Examples
    /// ```
    /// use scim_backend::domain::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::Conflict.http_status(), 409);
    /// ```
    pub fn http_status(self) -> u16 {
        match self {
            Self::BadRequest
            | Self::InvalidParameters
            | Self::InvalidPatch
            | Self::UnsupportedFilterAttribute => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::UnsupportedOperator | Self::UnsupportedPatchFormat => 501,
            Self::ServiceUnavailable => 503,
            Self::InternalError => 500,
        }
    }
}

/// Failure returned by every provisioning operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisioningError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("invalid parameters: {message}")]
    InvalidParameters { message: String },
    #[error("invalid patch: {message}")]
    InvalidPatch { message: String },
    #[error("unsupported comparison operator: {operator}")]
    UnsupportedOperator { operator: String },
    #[error("unsupported filter attribute: {attribute}")]
    UnsupportedFilterAttribute { attribute: String },
    #[error("unsupported patch format: {message}")]
    UnsupportedPatchFormat { message: String },
    #[error(transparent)]
    Store(UserStoreError),
}

impl ProvisioningError {
    /// Malformed input such as a blank identifier or repeated item types.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// A uniqueness rule would be broken.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// No user has the requested identifier.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Query parameters or one of their filters are incomplete.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// The patch envelope or one of its operations is unusable.
    pub fn invalid_patch(message: impl Into<String>) -> Self {
        Self::InvalidPatch {
            message: message.into(),
        }
    }

    /// A query filter used an operator other than `eq`.
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    /// A query filter named an attribute that cannot be searched.
    pub fn unsupported_filter_attribute(attribute: impl Into<String>) -> Self {
        Self::UnsupportedFilterAttribute {
            attribute: attribute.into(),
        }
    }

    /// The patch request does not declare the PatchOp message schema.
    pub fn unsupported_patch_format(message: impl Into<String>) -> Self {
        Self::UnsupportedPatchFormat {
            message: message.into(),
        }
    }

    /// Map a store failure, surfacing unique-index violations as conflicts.
    pub fn from_store(error: UserStoreError) -> Self {
        match error {
            UserStoreError::Conflict { message } => Self::conflict(message),
            other => Self::Store(other),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadRequest { .. } => ErrorCode::BadRequest,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidParameters { .. } => ErrorCode::InvalidParameters,
            Self::InvalidPatch { .. } => ErrorCode::InvalidPatch,
            Self::UnsupportedOperator { .. } => ErrorCode::UnsupportedOperator,
            Self::UnsupportedFilterAttribute { .. } => ErrorCode::UnsupportedFilterAttribute,
            Self::UnsupportedPatchFormat { .. } => ErrorCode::UnsupportedPatchFormat,
            Self::Store(UserStoreError::Connection { .. }) => ErrorCode::ServiceUnavailable,
            Self::Store(UserStoreError::Conflict { .. }) => ErrorCode::Conflict,
            Self::Store(UserStoreError::Query { .. }) => ErrorCode::InternalError,
        }
    }
}

impl From<ReconcileError> for ProvisioningError {
    fn from(error: ReconcileError) -> Self {
        Self::bad_request(error.to_string())
    }
}
