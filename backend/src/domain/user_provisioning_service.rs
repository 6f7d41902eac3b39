//! User provisioning domain service.
//!
//! Implements the [`UserProvisioning`] driving port on top of a
//! [`UserStore`]. The service owns request validation and the identity and
//! uniqueness rules; the store owns atomicity. The `userName` pre-checks here
//! give clients a clear conflict up front, while the store's unique index
//! settles races between concurrent creates and replaces.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::correlation::current_for_logs;
use crate::domain::ports::{ModifyOutcome, UserProvisioning, UserStore};
use crate::domain::reconcile::ensure_distinct_item_types;
use crate::domain::{
    Patch, ProvisioningError, QueryParameters, ResourceMeta, TypedItem, User, UserChange, UserId,
    translate_query,
};

/// Stored timestamps keep microsecond precision.
const TIMESTAMP_DIGITS: u16 = 6;

/// Provisioning service driving a [`UserStore`].
#[derive(Clone)]
pub struct UserProvisioningService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> UserProvisioningService<S> {
    /// Create a new service with the given store and clock.
    ///
    /// # Examples
    /// ```
    /// # use std::sync::Arc;
    /// # use mockable::DefaultClock;
    /// # use scim_backend::domain::UserProvisioningService;
    /// # use scim_backend::test_support::InMemoryUserStore;
    /// let service = UserProvisioningService::new(
    ///     Arc::new(InMemoryUserStore::default()),
    ///     Arc::new(DefaultClock),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc().trunc_subsecs(TIMESTAMP_DIGITS)
    }
}

fn parse_id(raw: &str) -> Result<UserId, ProvisioningError> {
    UserId::new(raw).map_err(|err| ProvisioningError::bad_request(err.to_string()))
}

fn blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn ensure_distinct_collections(user: &User) -> Result<(), ProvisioningError> {
    ensure_distinct_item_types(&user.addresses)?;
    ensure_distinct_item_types(&user.emails)?;
    ensure_distinct_item_types(&user.ims)?;
    ensure_distinct_item_types(&user.phone_numbers)?;
    Ok(())
}

fn clear_record_keys(user: &mut User) {
    fn clear<T: TypedItem>(items: &mut [T]) {
        for item in items {
            item.set_record_key(None);
        }
    }
    clear(&mut user.addresses);
    clear(&mut user.emails);
    clear(&mut user.ims);
    clear(&mut user.phone_numbers);
}

impl<S> UserProvisioningService<S>
where
    S: UserStore,
{
    /// Reject a `userName` held by any user other than `except`.
    async fn ensure_user_name_available(
        &self,
        user_name: &str,
        except: Option<&UserId>,
    ) -> Result<(), ProvisioningError> {
        let owner = self
            .store
            .owner_of_user_name(user_name)
            .await
            .map_err(ProvisioningError::from_store)?;
        match owner {
            Some(owner) if Some(&owner) != except => {
                warn!(
                    correlation_id = %current_for_logs(),
                    owner_id = %owner,
                    "userName already provisioned"
                );
                Err(ProvisioningError::conflict(format!(
                    "userName {user_name} is already in use"
                )))
            }
            _ => Ok(()),
        }
    }

    async fn modify(&self, id: &UserId, change: UserChange) -> Result<User, ProvisioningError> {
        let outcome = self
            .store
            .modify(id, &change)
            .await
            .map_err(ProvisioningError::from_store)?;
        match outcome {
            ModifyOutcome::Applied { user, summary } => {
                info!(
                    correlation_id = %current_for_logs(),
                    user_id = %id,
                    operation = change.kind(),
                    inserted = summary.inserted,
                    updated = summary.updated,
                    removed = summary.removed,
                    "user modified"
                );
                Ok(user)
            }
            ModifyOutcome::NotFound => Err(ProvisioningError::not_found(format!(
                "user {id} does not exist"
            ))),
            ModifyOutcome::Rejected(error) => {
                debug!(
                    correlation_id = %current_for_logs(),
                    user_id = %id,
                    operation = change.kind(),
                    %error,
                    "user change rejected"
                );
                Err(error)
            }
        }
    }
}

#[async_trait]
impl<S> UserProvisioning for UserProvisioningService<S>
where
    S: UserStore,
{
    async fn create(&self, mut user: User) -> Result<User, ProvisioningError> {
        if user.id.is_some() {
            return Err(ProvisioningError::bad_request(
                "id must not be supplied when creating a user",
            ));
        }
        if blank(&user.user_name) {
            return Err(ProvisioningError::bad_request("userName must not be blank"));
        }
        ensure_distinct_collections(&user)?;
        self.ensure_user_name_available(&user.user_name, None)
            .await?;

        let now = self.now();
        user.id = Some(UserId::generate());
        user.meta = Some(ResourceMeta {
            created: now,
            last_modified: now,
        });
        clear_record_keys(&mut user);
        user.enterprise.prune_manager();

        let stored = self
            .store
            .insert(&user)
            .await
            .map_err(ProvisioningError::from_store)?;
        info!(
            correlation_id = %current_for_logs(),
            user_id = ?stored.id.as_ref().map(UserId::as_str),
            "user created"
        );
        Ok(stored)
    }

    async fn retrieve(&self, id: &str) -> Result<User, ProvisioningError> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(&id)
            .await
            .map_err(ProvisioningError::from_store)?
            .ok_or_else(|| ProvisioningError::not_found(format!("user {id} does not exist")))
    }

    async fn replace(&self, user: User) -> Result<User, ProvisioningError> {
        let id = user
            .id
            .clone()
            .ok_or_else(|| ProvisioningError::bad_request("id is required to replace a user"))?;
        if blank(&user.user_name) {
            return Err(ProvisioningError::bad_request("userName must not be blank"));
        }
        self.ensure_user_name_available(&user.user_name, Some(&id))
            .await?;

        let now = self.now();
        self.modify(&id, UserChange::replace(user, now)).await
    }

    async fn update(&self, patch: &Patch) -> Result<(), ProvisioningError> {
        let (id, request) = patch.validate()?;
        let now = self.now();
        self.modify(&id, UserChange::patch(request.clone(), now))
            .await
            .map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), ProvisioningError> {
        let id = parse_id(id)?;
        let deleted = self
            .store
            .delete(&id)
            .await
            .map_err(ProvisioningError::from_store)?;
        if !deleted {
            return Err(ProvisioningError::not_found(format!(
                "user {id} does not exist"
            )));
        }
        info!(correlation_id = %current_for_logs(), user_id = %id, "user deleted");
        Ok(())
    }

    async fn query(&self, parameters: &QueryParameters) -> Result<Vec<User>, ProvisioningError> {
        let lookup = translate_query(parameters)?;
        let users = self
            .store
            .find(&lookup)
            .await
            .map_err(ProvisioningError::from_store)?;
        debug!(
            correlation_id = %current_for_logs(),
            matches = users.len(),
            "user query evaluated"
        );
        Ok(users)
    }
}

#[cfg(test)]
#[path = "user_provisioning_service_tests.rs"]
mod tests;
