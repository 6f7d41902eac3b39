//! SCIM user resource model.
//!
//! The resource is a plain data aggregate: the root user record, its owned
//! name and enterprise extension values, and four owned child collections.
//! Invariants that span the store (identifier uniqueness, `userName`
//! uniqueness) are enforced by the provisioning service, not by these types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attributes::{Address, Email, InstantMessaging, PhoneNumber};

/// Schema URN of the core user resource.
pub const CORE_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// Schema URN of the enterprise user extension.
pub const ENTERPRISE_USER_SCHEMA: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("user id must not be blank")]
    BlankId,
}

/// Opaque server-assigned user identifier.
///
/// Freshly issued identifiers are UUID v4 strings, but any non-blank string
/// read back from the store is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    ///
    /// # Examples
    /// ```
    /// use scim_backend::domain::UserId;
    ///
    /// assert!(UserId::new("2819c223").is_ok());
    /// assert!(UserId::new("  ").is_err());
    /// ```
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Issue a fresh identifier that has never been handed out before.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.trim().is_empty() {
            return Err(UserValidationError::BlankId);
        }
        Ok(Self(id))
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Structured personal name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honorific_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honorific_suffix: Option<String>,
}

impl Name {
    /// True when no name component is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reference to the user's manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Enterprise user extension attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseExtension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<Manager>,
}

impl EnterpriseExtension {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop a manager reference left with no attributes.
    ///
    /// The store keeps the manager as nullable columns, so an empty reference
    /// cannot survive a round trip.
    pub fn prune_manager(&mut self) {
        if self.manager.as_ref() == Some(&Manager::default()) {
            self.manager = None;
        }
    }
}

/// Audit timestamps maintained by the provisioning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// A provisioned user together with its owned collections.
///
/// ## Invariants
/// - `id` is absent on create input and present on every stored user.
/// - `user_name` is non-blank and unique among live users once stored.
///
/// # Examples
/// ```
/// use scim_backend::domain::{Email, User};
///
/// let mut user = User::new("alice");
/// user.emails.push(Email::tagged("work", "alice@example.com"));
/// assert!(user.id.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Name::is_empty")]
    pub name: Name,
    #[serde(
        rename = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
        default,
        skip_serializing_if = "EnterpriseExtension::is_empty"
    )]
    pub enterprise: EnterpriseExtension,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<Email>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ims: Vec<InstantMessaging>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResourceMeta>,
}

impl User {
    /// Build an unsaved user with only a `userName`.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Self::default()
        }
    }

    /// Overwrite every top-level scalar and owned value from `source`.
    ///
    /// The identifier, metadata and child collections are left untouched.
    pub fn assign_scalars_from(&mut self, source: &Self) {
        self.user_name.clone_from(&source.user_name);
        self.external_id.clone_from(&source.external_id);
        self.display_name.clone_from(&source.display_name);
        self.nick_name.clone_from(&source.nick_name);
        self.profile_url.clone_from(&source.profile_url);
        self.title.clone_from(&source.title);
        self.user_type.clone_from(&source.user_type);
        self.preferred_language.clone_from(&source.preferred_language);
        self.locale.clone_from(&source.locale);
        self.timezone.clone_from(&source.timezone);
        self.active = source.active;
        self.name.clone_from(&source.name);
        self.enterprise.clone_from(&source.enterprise);
        self.enterprise.prune_manager();
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", UserValidationError::BlankId)]
    #[case("   ", UserValidationError::BlankId)]
    #[case("\t\n", UserValidationError::BlankId)]
    fn user_id_rejects_invalid_input(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(UserId::new(raw), Err(expected));
    }

    #[rstest]
    fn user_id_keeps_non_blank_input_verbatim() {
        let id = UserId::new(" abc").expect("non-blank id");
        assert_eq!(id.as_str(), " abc");
    }

    #[rstest]
    fn assigning_an_empty_manager_clears_it() {
        let mut stored = User::new("alice");
        stored.enterprise.manager = Some(Manager {
            value: Some("m-1".to_owned()),
            display_name: None,
        });
        let mut source = User::new("alice");
        source.enterprise.manager = Some(Manager::default());

        stored.assign_scalars_from(&source);

        assert_eq!(stored.enterprise.manager, None);
    }

    #[rstest]
    fn generated_ids_are_distinct_uuids() {
        let first = UserId::generate();
        let second = UserId::generate();
        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[rstest]
    fn user_deserialises_scim_json() {
        let user: User = serde_json::from_value(json!({
            "userName": "bjensen",
            "externalId": "bj",
            "name": { "givenName": "Barbara" },
            "emails": [{ "type": "work", "value": "bjensen@example.com", "primary": true }],
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User": {
                "department": "Tour Operations",
                "manager": { "value": "26118915", "displayName": "John Smith" }
            }
        }))
        .expect("valid user json");

        assert_eq!(user.user_name, "bjensen");
        assert_eq!(user.name.given_name.as_deref(), Some("Barbara"));
        assert_eq!(user.emails.len(), 1);
        assert_eq!(
            user.enterprise.department.as_deref(),
            Some("Tour Operations")
        );
        assert_eq!(
            user.enterprise
                .manager
                .as_ref()
                .and_then(|m| m.display_name.as_deref()),
            Some("John Smith")
        );
    }

    #[rstest]
    fn assign_scalars_preserves_identity_and_collections() {
        let id = UserId::generate();
        let mut stored = User {
            id: Some(id.clone()),
            emails: vec![crate::domain::Email::tagged("work", "a@example.com")],
            ..User::new("old")
        };
        let incoming = User {
            display_name: Some("New".to_owned()),
            ..User::new("new")
        };

        stored.assign_scalars_from(&incoming);

        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.user_name, "new");
        assert_eq!(stored.display_name.as_deref(), Some("New"));
        assert_eq!(stored.emails.len(), 1);
    }
}
