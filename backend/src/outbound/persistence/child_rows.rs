//! Loading and syncing of the four child attribute tables.
//!
//! Each table gets a `load_*` function that fetches the records of many users
//! in one query and a `sync_*` function that makes the stored rows of one user
//! match a reconciled collection. Records carrying a key are updated in place,
//! keyless records are inserted with a fresh key, and rows whose key is absent
//! from the collection are deleted.

use std::collections::HashMap;

use diesel::QueryResult;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::{
    Address, Email, InstantMessaging, PhoneNumber, RecordKey, TypedItem, User, sort_by_item_type,
};

use super::models::{AddressRow, ChildRow, EmailRow, InstantMessagingRow, PhoneNumberRow};
use super::schema::{scim_user_addresses, scim_user_emails, scim_user_ims, scim_user_phone_numbers};

fn group_by_owner<R>(rows: Vec<R>) -> HashMap<String, Vec<R::Item>>
where
    R: ChildRow,
    R::Item: TypedItem,
{
    let mut grouped: HashMap<String, Vec<R::Item>> = HashMap::new();
    for row in rows {
        let owner = row.owner().to_owned();
        grouped.entry(owner).or_default().push(row.into_item());
    }
    for items in grouped.values_mut() {
        sort_by_item_type(items);
    }
    grouped
}

fn kept_keys<T: TypedItem>(items: &[T]) -> Vec<Uuid> {
    items
        .iter()
        .filter_map(TypedItem::record_key)
        .map(|key| *key.as_uuid())
        .collect()
}

macro_rules! child_table {
    ($kind:ident, $table:ident, $row:ident, $item:ident) => {
        ::paste::paste! {
            pub(super) async fn [<load_ $kind>](
                conn: &mut AsyncPgConnection,
                owners: &[String],
            ) -> QueryResult<HashMap<String, Vec<$item>>> {
                let rows: Vec<$row> = $table::table
                    .filter($table::user_id.eq_any(owners))
                    .order(($table::user_id, $table::id))
                    .select($row::as_select())
                    .load(conn)
                    .await?;
                Ok(group_by_owner(rows))
            }

            pub(super) async fn [<sync_ $kind>](
                conn: &mut AsyncPgConnection,
                user_id: &str,
                items: &[$item],
            ) -> QueryResult<Vec<$item>> {
                diesel::delete(
                    $table::table
                        .filter($table::user_id.eq(user_id))
                        .filter($table::id.ne_all(kept_keys(items))),
                )
                .execute(conn)
                .await?;

                let mut stored = Vec::with_capacity(items.len());
                let mut fresh = Vec::new();
                for item in items {
                    match item.record_key() {
                        Some(key) => {
                            let row = $row::from_item(user_id, key, item);
                            diesel::update(
                                $table::table
                                    .filter($table::id.eq(row.id))
                                    .filter($table::user_id.eq(user_id)),
                            )
                            .set(&row)
                            .execute(conn)
                            .await?;
                            stored.push(item.clone());
                        }
                        None => {
                            let key = RecordKey::generate();
                            fresh.push($row::from_item(user_id, key, item));
                            let mut item = item.clone();
                            item.set_record_key(Some(key));
                            stored.push(item);
                        }
                    }
                }

                if !fresh.is_empty() {
                    diesel::insert_into($table::table)
                        .values(&fresh)
                        .execute(conn)
                        .await?;
                }

                sort_by_item_type(&mut stored);
                Ok(stored)
            }
        }
    };
}

child_table!(addresses, scim_user_addresses, AddressRow, Address);
child_table!(emails, scim_user_emails, EmailRow, Email);
child_table!(ims, scim_user_ims, InstantMessagingRow, InstantMessaging);
child_table!(
    phone_numbers,
    scim_user_phone_numbers,
    PhoneNumberRow,
    PhoneNumber
);

/// Attach the stored collections to already-loaded users.
pub(super) async fn attach_collections(
    conn: &mut AsyncPgConnection,
    users: &mut [User],
) -> QueryResult<()> {
    let owners: Vec<String> = users
        .iter()
        .filter_map(|user| user.id.as_ref().map(|id| id.as_str().to_owned()))
        .collect();
    if owners.is_empty() {
        return Ok(());
    }

    let mut addresses = load_addresses(conn, &owners).await?;
    let mut emails = load_emails(conn, &owners).await?;
    let mut ims = load_ims(conn, &owners).await?;
    let mut phone_numbers = load_phone_numbers(conn, &owners).await?;

    for user in users.iter_mut() {
        let Some(id) = user.id.as_ref().map(|id| id.as_str().to_owned()) else {
            continue;
        };
        user.addresses = addresses.remove(&id).unwrap_or_default();
        user.emails = emails.remove(&id).unwrap_or_default();
        user.ims = ims.remove(&id).unwrap_or_default();
        user.phone_numbers = phone_numbers.remove(&id).unwrap_or_default();
    }
    Ok(())
}

/// Write every collection of `user` and replace them with their stored form.
pub(super) async fn sync_collections(
    conn: &mut AsyncPgConnection,
    user: &mut User,
) -> QueryResult<()> {
    let Some(id) = user.id.as_ref().map(|id| id.as_str().to_owned()) else {
        return Ok(());
    };
    user.addresses = sync_addresses(conn, &id, &user.addresses).await?;
    user.emails = sync_emails(conn, &id, &user.emails).await?;
    user.ims = sync_ims(conn, &id, &user.ims).await?;
    user.phone_numbers = sync_phone_numbers(conn, &id, &user.phone_numbers).await?;
    Ok(())
}
