//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Address, Email, EnterpriseExtension, InstantMessaging, Manager, Name, PhoneNumber, RecordKey,
    ResourceMeta, User, UserId,
};

use super::schema::{
    scim_user_addresses, scim_user_emails, scim_user_ims, scim_user_phone_numbers, scim_users,
};

// ---------------------------------------------------------------------------
// User models
// ---------------------------------------------------------------------------

/// Row struct for reading from the scim_users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = scim_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: String,
    pub user_name: String,
    pub external_id: Option<String>,
    pub display_name: Option<String>,
    pub nick_name: Option<String>,
    pub profile_url: Option<String>,
    pub title: Option<String>,
    pub user_type: Option<String>,
    pub preferred_language: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub active: Option<bool>,
    pub name_formatted: Option<String>,
    pub name_family_name: Option<String>,
    pub name_given_name: Option<String>,
    pub name_middle_name: Option<String>,
    pub name_honorific_prefix: Option<String>,
    pub name_honorific_suffix: Option<String>,
    pub enterprise_employee_number: Option<String>,
    pub enterprise_cost_center: Option<String>,
    pub enterprise_organization: Option<String>,
    pub enterprise_division: Option<String>,
    pub enterprise_department: Option<String>,
    pub enterprise_manager_value: Option<String>,
    pub enterprise_manager_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert into a domain user with empty collections.
    ///
    /// Rows whose identifier fails validation are reported rather than
    /// silently skipped.
    pub(crate) fn into_user(self) -> Result<User, String> {
        let id = UserId::new(&self.id)
            .map_err(|err| format!("stored user id {:?}: {err}", self.id))?;
        let manager = match (self.enterprise_manager_value, self.enterprise_manager_display_name) {
            (None, None) => None,
            (value, display_name) => Some(Manager {
                value,
                display_name,
            }),
        };

        Ok(User {
            id: Some(id),
            user_name: self.user_name,
            external_id: self.external_id,
            display_name: self.display_name,
            nick_name: self.nick_name,
            profile_url: self.profile_url,
            title: self.title,
            user_type: self.user_type,
            preferred_language: self.preferred_language,
            locale: self.locale,
            timezone: self.timezone,
            active: self.active,
            name: Name {
                formatted: self.name_formatted,
                family_name: self.name_family_name,
                given_name: self.name_given_name,
                middle_name: self.name_middle_name,
                honorific_prefix: self.name_honorific_prefix,
                honorific_suffix: self.name_honorific_suffix,
            },
            enterprise: EnterpriseExtension {
                employee_number: self.enterprise_employee_number,
                cost_center: self.enterprise_cost_center,
                organization: self.enterprise_organization,
                division: self.enterprise_division,
                department: self.enterprise_department,
                manager,
            },
            meta: Some(ResourceMeta {
                created: self.created_at,
                last_modified: self.last_modified_at,
            }),
            ..User::default()
        })
    }
}

/// Insertable and changeset struct for writing user records.
///
/// `None` values are written as `NULL` so that cleared attributes do not
/// survive a replace.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = scim_users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserRecord<'a> {
    pub id: &'a str,
    pub user_name: &'a str,
    pub external_id: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub nick_name: Option<&'a str>,
    pub profile_url: Option<&'a str>,
    pub title: Option<&'a str>,
    pub user_type: Option<&'a str>,
    pub preferred_language: Option<&'a str>,
    pub locale: Option<&'a str>,
    pub timezone: Option<&'a str>,
    pub active: Option<bool>,
    pub name_formatted: Option<&'a str>,
    pub name_family_name: Option<&'a str>,
    pub name_given_name: Option<&'a str>,
    pub name_middle_name: Option<&'a str>,
    pub name_honorific_prefix: Option<&'a str>,
    pub name_honorific_suffix: Option<&'a str>,
    pub enterprise_employee_number: Option<&'a str>,
    pub enterprise_cost_center: Option<&'a str>,
    pub enterprise_organization: Option<&'a str>,
    pub enterprise_division: Option<&'a str>,
    pub enterprise_department: Option<&'a str>,
    pub enterprise_manager_value: Option<&'a str>,
    pub enterprise_manager_display_name: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl<'a> UserRecord<'a> {
    /// Borrow the scalar columns of a stored user.
    ///
    /// Returns `None` for users without an identifier or metadata, which
    /// never reach the store through the provisioning service.
    pub(crate) fn from_user(user: &'a User) -> Option<Self> {
        let id = user.id.as_ref()?;
        let meta = user.meta?;
        let manager = user.enterprise.manager.as_ref();
        Some(Self {
            id: id.as_str(),
            user_name: user.user_name.as_str(),
            external_id: user.external_id.as_deref(),
            display_name: user.display_name.as_deref(),
            nick_name: user.nick_name.as_deref(),
            profile_url: user.profile_url.as_deref(),
            title: user.title.as_deref(),
            user_type: user.user_type.as_deref(),
            preferred_language: user.preferred_language.as_deref(),
            locale: user.locale.as_deref(),
            timezone: user.timezone.as_deref(),
            active: user.active,
            name_formatted: user.name.formatted.as_deref(),
            name_family_name: user.name.family_name.as_deref(),
            name_given_name: user.name.given_name.as_deref(),
            name_middle_name: user.name.middle_name.as_deref(),
            name_honorific_prefix: user.name.honorific_prefix.as_deref(),
            name_honorific_suffix: user.name.honorific_suffix.as_deref(),
            enterprise_employee_number: user.enterprise.employee_number.as_deref(),
            enterprise_cost_center: user.enterprise.cost_center.as_deref(),
            enterprise_organization: user.enterprise.organization.as_deref(),
            enterprise_division: user.enterprise.division.as_deref(),
            enterprise_department: user.enterprise.department.as_deref(),
            enterprise_manager_value: manager.and_then(|m| m.value.as_deref()),
            enterprise_manager_display_name: manager.and_then(|m| m.display_name.as_deref()),
            created_at: meta.created,
            last_modified_at: meta.last_modified,
        })
    }
}

// ---------------------------------------------------------------------------
// Child attribute models
// ---------------------------------------------------------------------------

/// Conversion between a child row and its domain record.
pub(crate) trait ChildRow: Sized {
    type Item;

    fn owner(&self) -> &str;

    fn into_item(self) -> Self::Item;

    fn from_item(user_id: &str, key: RecordKey, item: &Self::Item) -> Self;
}

/// Row struct for the scim_user_addresses table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = scim_user_addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AddressRow {
    pub id: Uuid,
    pub user_id: String,
    pub item_type: Option<String>,
    pub formatted: Option<String>,
    pub street_address: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_primary: Option<bool>,
}

impl ChildRow for AddressRow {
    type Item = Address;

    fn owner(&self) -> &str {
        self.user_id.as_str()
    }

    fn into_item(self) -> Address {
        Address {
            key: Some(RecordKey::from_uuid(self.id)),
            item_type: self.item_type,
            formatted: self.formatted,
            street_address: self.street_address,
            locality: self.locality,
            region: self.region,
            postal_code: self.postal_code,
            country: self.country,
            primary: self.is_primary,
        }
    }

    fn from_item(user_id: &str, key: RecordKey, item: &Address) -> Self {
        Self {
            id: *key.as_uuid(),
            user_id: user_id.to_owned(),
            item_type: item.item_type.clone(),
            formatted: item.formatted.clone(),
            street_address: item.street_address.clone(),
            locality: item.locality.clone(),
            region: item.region.clone(),
            postal_code: item.postal_code.clone(),
            country: item.country.clone(),
            is_primary: item.primary,
        }
    }
}

/// Declares the row struct of a value-style child table.
macro_rules! value_row {
    ($(#[$meta:meta])* $row:ident, $table:ident, $item:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
        #[diesel(table_name = $table)]
        #[diesel(check_for_backend(diesel::pg::Pg))]
        #[diesel(treat_none_as_null = true)]
        pub(crate) struct $row {
            pub id: Uuid,
            pub user_id: String,
            pub item_type: Option<String>,
            pub value: Option<String>,
            pub display: Option<String>,
            pub is_primary: Option<bool>,
        }

        impl ChildRow for $row {
            type Item = $item;

            fn owner(&self) -> &str {
                self.user_id.as_str()
            }

            fn into_item(self) -> $item {
                $item {
                    key: Some(RecordKey::from_uuid(self.id)),
                    item_type: self.item_type,
                    value: self.value,
                    display: self.display,
                    primary: self.is_primary,
                }
            }

            fn from_item(user_id: &str, key: RecordKey, item: &$item) -> Self {
                Self {
                    id: *key.as_uuid(),
                    user_id: user_id.to_owned(),
                    item_type: item.item_type.clone(),
                    value: item.value.clone(),
                    display: item.display.clone(),
                    is_primary: item.primary,
                }
            }
        }
    };
}

value_row! {
    /// Row struct for the scim_user_emails table.
    EmailRow, scim_user_emails, Email
}

value_row! {
    /// Row struct for the scim_user_ims table.
    InstantMessagingRow, scim_user_ims, InstantMessaging
}

value_row! {
    /// Row struct for the scim_user_phone_numbers table.
    PhoneNumberRow, scim_user_phone_numbers, PhoneNumber
}
