//! Domain primitives, services and ports for user provisioning.
//!
//! Purpose: model SCIM users and the rules that keep them consistent, free of
//! any storage or transport concern.
//!
//! Public surface:
//! - User and its owned values (`Name`, `EnterpriseExtension`) plus the four
//!   child record kinds (`Address`, `Email`, `InstantMessaging`,
//!   `PhoneNumber`).
//! - `reconcile`: converges a stored collection onto a desired set.
//! - `Patch` and `apply_patch`: partial updates.
//! - `translate_query`: equality filter translation.
//! - `UserProvisioningService`: the driving port implementation.
//! - `ProvisioningError` and `ErrorCode`: the failure taxonomy.

pub mod attributes;
pub mod correlation;
pub mod error;
pub mod patch;
pub mod ports;
pub mod query;
pub mod reconcile;
pub mod user;
pub mod user_change;
pub mod user_provisioning_service;

pub use self::attributes::{
    Address, AttributeError, Email, InstantMessaging, PhoneNumber, RecordKey, TypedItem,
    sort_by_item_type,
};
pub use self::correlation::{BlankCorrelationId, CorrelationId};
pub use self::error::{ErrorCode, ProvisioningError};
pub use self::patch::{
    PATCH_OP_SCHEMA, Patch, PatchOp, PatchOperation, PatchRequest, UnknownPatchOp, apply_patch,
};
pub use self::query::{
    ComparisonOperator, Filter, QueryParameters, UnknownOperator, UserCriterion, UserLookup,
    translate_query,
};
pub use self::reconcile::{
    ReconcileError, ReconcileSummary, ensure_distinct_item_types, reconcile,
};
pub use self::user::{
    CORE_USER_SCHEMA, ENTERPRISE_USER_SCHEMA, EnterpriseExtension, Manager, Name, ResourceMeta,
    User, UserId, UserValidationError,
};
pub use self::user_change::UserChange;
pub use self::user_provisioning_service::UserProvisioningService;
