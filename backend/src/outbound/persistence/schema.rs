//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Provisioned users.
    ///
    /// Name and enterprise extension values are flattened into prefixed
    /// columns. `user_name` carries the `scim_users_user_name_key` unique index.
    scim_users (id) {
        /// Primary key: opaque server-assigned identifier.
        id -> Text,
        user_name -> Text,
        external_id -> Nullable<Text>,
        display_name -> Nullable<Text>,
        nick_name -> Nullable<Text>,
        profile_url -> Nullable<Text>,
        title -> Nullable<Text>,
        user_type -> Nullable<Text>,
        preferred_language -> Nullable<Text>,
        locale -> Nullable<Text>,
        timezone -> Nullable<Text>,
        active -> Nullable<Bool>,
        name_formatted -> Nullable<Text>,
        name_family_name -> Nullable<Text>,
        name_given_name -> Nullable<Text>,
        name_middle_name -> Nullable<Text>,
        name_honorific_prefix -> Nullable<Text>,
        name_honorific_suffix -> Nullable<Text>,
        enterprise_employee_number -> Nullable<Text>,
        enterprise_cost_center -> Nullable<Text>,
        enterprise_organization -> Nullable<Text>,
        enterprise_division -> Nullable<Text>,
        enterprise_department -> Nullable<Text>,
        enterprise_manager_value -> Nullable<Text>,
        enterprise_manager_display_name -> Nullable<Text>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        last_modified_at -> Timestamptz,
    }
}

diesel::table! {
    /// Postal addresses owned by a user (cascade delete).
    scim_user_addresses (id) {
        /// Surrogate key assigned on insert.
        id -> Uuid,
        user_id -> Text,
        /// Reconciliation tag such as `work` or `home`.
        item_type -> Nullable<Text>,
        formatted -> Nullable<Text>,
        street_address -> Nullable<Text>,
        locality -> Nullable<Text>,
        region -> Nullable<Text>,
        postal_code -> Nullable<Text>,
        country -> Nullable<Text>,
        is_primary -> Nullable<Bool>,
    }
}

diesel::table! {
    /// Email addresses owned by a user (cascade delete).
    scim_user_emails (id) {
        id -> Uuid,
        user_id -> Text,
        item_type -> Nullable<Text>,
        value -> Nullable<Text>,
        display -> Nullable<Text>,
        is_primary -> Nullable<Bool>,
    }
}

diesel::table! {
    /// Instant messaging handles owned by a user (cascade delete).
    scim_user_ims (id) {
        id -> Uuid,
        user_id -> Text,
        item_type -> Nullable<Text>,
        value -> Nullable<Text>,
        display -> Nullable<Text>,
        is_primary -> Nullable<Bool>,
    }
}

diesel::table! {
    /// Phone numbers owned by a user (cascade delete).
    scim_user_phone_numbers (id) {
        id -> Uuid,
        user_id -> Text,
        item_type -> Nullable<Text>,
        value -> Nullable<Text>,
        display -> Nullable<Text>,
        is_primary -> Nullable<Bool>,
    }
}

diesel::joinable!(scim_user_addresses -> scim_users (user_id));
diesel::joinable!(scim_user_emails -> scim_users (user_id));
diesel::joinable!(scim_user_ims -> scim_users (user_id));
diesel::joinable!(scim_user_phone_numbers -> scim_users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    scim_users,
    scim_user_addresses,
    scim_user_emails,
    scim_user_ims,
    scim_user_phone_numbers,
);
