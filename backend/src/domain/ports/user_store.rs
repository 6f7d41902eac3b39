//! Driven port for transactional user persistence.
//!
//! Adapters store a user row plus its four child collections and must keep
//! each call atomic: a failed call leaves no partial write behind.

use async_trait::async_trait;

use crate::domain::{ProvisioningError, ReconcileSummary, User, UserChange, UserId, UserLookup};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user store adapters.
    pub enum UserStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Conflict { message: String } => "user store uniqueness violation: {message}",
    }
}

/// Result of applying a [`UserChange`] inside a store transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifyOutcome {
    /// The change was committed; carries the stored form.
    Applied {
        user: User,
        summary: ReconcileSummary,
    },
    /// No live user has the identifier; nothing was written.
    NotFound,
    /// The change itself was rejected; the transaction was rolled back.
    Rejected(ProvisioningError),
}

/// Persistence contract for provisioned users.
///
/// Every method returns owned snapshots; mutating them persists nothing.
/// Child collections come back ordered by item type with untyped records last.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user and its collections in one transaction.
    ///
    /// `user.id` must be set. Returns the stored form with record keys
    /// assigned, or [`UserStoreError::Conflict`] when the identifier or
    /// `userName` is already taken.
    async fn insert(&self, user: &User) -> Result<User, UserStoreError>;

    /// Fetch a user and all its collections.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError>;

    /// Fetch every user matching the lookup, ordered by `userName`.
    async fn find(&self, lookup: &UserLookup) -> Result<Vec<User>, UserStoreError>;

    /// Identifier of the live user owning `user_name`, if any.
    async fn owner_of_user_name(&self, user_name: &str) -> Result<Option<UserId>, UserStoreError>;

    /// Load, mutate and save one user atomically.
    ///
    /// The user row is locked for the duration of the transaction so
    /// concurrent changes to the same user serialise.
    async fn modify(
        &self,
        id: &UserId,
        change: &UserChange,
    ) -> Result<ModifyOutcome, UserStoreError>;

    /// Delete a user; child records go with it. Returns `false` if absent.
    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError>;
}
