//! Test utilities for the backend crate.
//!
//! Shared by unit tests in `src/` and integration tests in `tests/`. Compiled
//! only for tests or with the `test-support` feature.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{ModifyOutcome, UserStore, UserStoreError};
use crate::domain::{RecordKey, TypedItem, User, UserChange, UserCriterion, UserId, UserLookup};

/// Clock returning a settable instant.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock() += TimeDelta::seconds(seconds);
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    failure: Option<UserStoreError>,
}

/// In-memory [`UserStore`] with the same observable rules as the database
/// adapter: identifier and `userName` uniqueness, record keys assigned on
/// write, collections ordered by item type and all-or-nothing changes.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    state: Mutex<StoreState>,
}

fn assign_keys<T: TypedItem>(items: &mut [T]) {
    for item in items.iter_mut() {
        if item.record_key().is_none() {
            item.set_record_key(Some(RecordKey::generate()));
        }
    }
    crate::domain::sort_by_item_type(items);
}

fn stored_form(mut user: User) -> User {
    assign_keys(&mut user.addresses);
    assign_keys(&mut user.emails);
    assign_keys(&mut user.ims);
    assign_keys(&mut user.phone_numbers);
    user
}

fn matches(user: &User, criterion: &UserCriterion) -> bool {
    match criterion {
        UserCriterion::UserName(value) => user.user_name == *value,
        UserCriterion::ExternalId(value) => user.external_id.as_deref() == Some(value.as_str()),
    }
}

impl StoreState {
    fn check(&self) -> Result<(), UserStoreError> {
        self.failure.clone().map_or(Ok(()), Err)
    }

    fn owner_of(&self, user_name: &str) -> Option<&UserId> {
        self.users
            .iter()
            .find(|(_, user)| user.user_name == user_name)
            .map(|(id, _)| id)
    }
}

impl InMemoryUserStore {
    /// Make every subsequent call fail with `error` until cleared.
    pub fn fail_with(&self, error: Option<UserStoreError>) {
        self.lock().failure = error;
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.lock().users.len()
    }

    /// True when no users are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: &User) -> Result<User, UserStoreError> {
        let mut state = self.lock();
        state.check()?;
        let id = user
            .id
            .clone()
            .ok_or_else(|| UserStoreError::query("user must carry an id"))?;
        if state.users.contains_key(&id) {
            return Err(UserStoreError::conflict("scim_users_pkey"));
        }
        if state.owner_of(&user.user_name).is_some() {
            return Err(UserStoreError::conflict("scim_users_user_name_key"));
        }
        let stored = stored_form(user.clone());
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        let state = self.lock();
        state.check()?;
        Ok(state.users.get(id).cloned())
    }

    async fn find(&self, lookup: &UserLookup) -> Result<Vec<User>, UserStoreError> {
        let state = self.lock();
        state.check()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|user| match lookup {
                UserLookup::All => true,
                UserLookup::Matching(criteria) => {
                    criteria.iter().all(|criterion| matches(user, criterion))
                }
            })
            .cloned()
            .collect();
        users.sort_by(|left, right| left.user_name.cmp(&right.user_name));
        Ok(users)
    }

    async fn owner_of_user_name(&self, user_name: &str) -> Result<Option<UserId>, UserStoreError> {
        let state = self.lock();
        state.check()?;
        Ok(state.owner_of(user_name).cloned())
    }

    async fn modify(
        &self,
        id: &UserId,
        change: &UserChange,
    ) -> Result<ModifyOutcome, UserStoreError> {
        let mut state = self.lock();
        state.check()?;
        let Some(mut user) = state.users.get(id).cloned() else {
            return Ok(ModifyOutcome::NotFound);
        };
        let summary = match change.apply(&mut user) {
            Ok(summary) => summary,
            Err(error) => return Ok(ModifyOutcome::Rejected(error)),
        };
        if state
            .owner_of(&user.user_name)
            .is_some_and(|owner| owner != id)
        {
            return Err(UserStoreError::conflict("scim_users_user_name_key"));
        }
        let user = stored_form(user);
        state.users.insert(id.clone(), user.clone());
        Ok(ModifyOutcome::Applied { user, summary })
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError> {
        let mut state = self.lock();
        state.check()?;
        Ok(state.users.remove(id).is_some())
    }
}
