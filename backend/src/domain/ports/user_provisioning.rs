//! Driving port exposed to the provisioning protocol layer.
//!
//! The protocol adapter owns request parsing and response envelopes; it
//! calls these operations with domain types and maps
//! [`ProvisioningError::code`] onto protocol status codes.

use async_trait::async_trait;

use crate::domain::{Patch, ProvisioningError, QueryParameters, User};

/// Create, read, replace, patch, delete and query provisioned users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserProvisioning: Send + Sync {
    /// Create a user; the store assigns its identifier.
    async fn create(&self, user: User) -> Result<User, ProvisioningError>;

    /// Fetch one user with all its collections.
    async fn retrieve(&self, id: &str) -> Result<User, ProvisioningError>;

    /// Replace a user wholesale, reconciling its collections.
    async fn replace(&self, user: User) -> Result<User, ProvisioningError>;

    /// Apply a PatchOp request to one user.
    async fn update(&self, patch: &Patch) -> Result<(), ProvisioningError>;

    /// Delete a user together with its collections.
    async fn delete(&self, id: &str) -> Result<(), ProvisioningError>;

    /// Return every user matching the query.
    async fn query(&self, parameters: &QueryParameters) -> Result<Vec<User>, ProvisioningError>;
}
