//! PostgreSQL-backed [`UserStore`] adapter.
//!
//! Each call runs in its own transaction on one pooled connection. Changes
//! lock the user row with `SELECT ... FOR UPDATE`, so concurrent changes to the
//! same user serialise while different users proceed independently. Reads run
//! in a read-only repeatable-read transaction so a user and its collections
//! come from one snapshot.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{ModifyOutcome, UserStore, UserStoreError};
use crate::domain::{ProvisioningError, User, UserChange, UserCriterion, UserId, UserLookup};

use super::child_rows::{attach_collections, sync_collections};
use super::models::{UserRecord, UserRow};
use super::pool::DbPool;
use super::schema::scim_users;
use super::user_store_error_mapping::{map_diesel_error, map_pool_error};

/// Diesel-backed implementation of the user store port.
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    /// Create a new store with the given connection pool.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use scim_backend::outbound::persistence::{DbPool, DieselUserStore, PoolConfig};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = DbPool::new(PoolConfig::new("postgres://localhost/scim")).await?;
    /// let store = DieselUserStore::new(pool);
    /// # let _ = store;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a modify transaction.
///
/// Both variants roll the transaction back; only `Database` is a store error.
enum ModifyError {
    Database(DieselError),
    Rejected(ProvisioningError),
}

impl From<DieselError> for ModifyError {
    fn from(error: DieselError) -> Self {
        Self::Database(error)
    }
}

fn row_into_user(row: UserRow) -> Result<User, DieselError> {
    row.into_user()
        .map_err(|message| DieselError::DeserializationError(message.into()))
}

async fn load_user(
    conn: &mut AsyncPgConnection,
    id: &UserId,
) -> Result<Option<User>, DieselError> {
    let Some(row) = scim_users::table
        .find(id.as_str())
        .select(UserRow::as_select())
        .first(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };
    let mut users = vec![row_into_user(row)?];
    attach_collections(conn, &mut users).await?;
    Ok(users.pop())
}

async fn load_matching(
    conn: &mut AsyncPgConnection,
    lookup: &UserLookup,
) -> Result<Vec<User>, DieselError> {
    let mut query = scim_users::table
        .select(UserRow::as_select())
        .order(scim_users::user_name)
        .into_boxed();
    if let UserLookup::Matching(criteria) = lookup {
        for criterion in criteria {
            query = match criterion {
                UserCriterion::UserName(value) => {
                    query.filter(scim_users::user_name.eq(value.as_str()))
                }
                UserCriterion::ExternalId(value) => {
                    query.filter(scim_users::external_id.eq(value.as_str()))
                }
            };
        }
    }

    let rows: Vec<UserRow> = query.load(conn).await?;
    let mut users = rows
        .into_iter()
        .map(row_into_user)
        .collect::<Result<Vec<_>, _>>()?;
    attach_collections(conn, &mut users).await?;
    Ok(users)
}

#[async_trait]
impl UserStore for DieselUserStore {
    async fn insert(&self, user: &User) -> Result<User, UserStoreError> {
        let record = UserRecord::from_user(user)
            .ok_or_else(|| UserStoreError::query("user must carry an id and metadata"))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(scim_users::table)
                    .values(&record)
                    .execute(conn)
                    .await?;
                let mut stored = user.clone();
                sync_collections(conn, &mut stored).await?;
                Ok(stored)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.build_transaction()
            .read_only()
            .repeatable_read()
            .run(|conn| load_user(conn, id).scope_boxed())
            .await
            .map_err(map_diesel_error)
    }

    async fn find(&self, lookup: &UserLookup) -> Result<Vec<User>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let users = conn
            .build_transaction()
            .read_only()
            .repeatable_read()
            .run(|conn| load_matching(conn, lookup).scope_boxed())
            .await
            .map_err(map_diesel_error)?;
        debug!(matches = users.len(), "user lookup evaluated");
        Ok(users)
    }

    async fn owner_of_user_name(&self, user_name: &str) -> Result<Option<UserId>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let owner: Option<String> = scim_users::table
            .filter(scim_users::user_name.eq(user_name))
            .select(scim_users::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        owner
            .map(|id| {
                UserId::new(&id)
                    .map_err(|err| UserStoreError::query(format!("stored user id {id:?}: {err}")))
            })
            .transpose()
    }

    async fn modify(
        &self,
        id: &UserId,
        change: &UserChange,
    ) -> Result<ModifyOutcome, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let result = conn
            .transaction::<_, ModifyError, _>(|conn| {
                async move {
                    let Some(row) = scim_users::table
                        .find(id.as_str())
                        .select(UserRow::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(ModifyOutcome::NotFound);
                    };
                    let mut users = vec![row_into_user(row)?];
                    attach_collections(conn, &mut users).await?;
                    let Some(mut user) = users.pop() else {
                        return Ok(ModifyOutcome::NotFound);
                    };

                    let summary = change.apply(&mut user).map_err(ModifyError::Rejected)?;

                    {
                        let record = UserRecord::from_user(&user).ok_or_else(|| {
                            DieselError::QueryBuilderError("modified user lost its metadata".into())
                        })?;
                        diesel::update(scim_users::table.find(id.as_str()))
                            .set(&record)
                            .execute(conn)
                            .await?;
                    }
                    sync_collections(conn, &mut user).await?;
                    Ok(ModifyOutcome::Applied { user, summary })
                }
                .scope_boxed()
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(ModifyError::Rejected(error)) => Ok(ModifyOutcome::Rejected(error)),
            Err(ModifyError::Database(error)) => Err(map_diesel_error(error)),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<bool, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(scim_users::table.find(id.as_str()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
