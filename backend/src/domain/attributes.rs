//! Multi-valued child attribute records owned by a user.
//!
//! Each record carries an optional item type tag (`"work"`, `"home"`, ...)
//! which identifies it within one user's collection of one kind. The tag is
//! the reconciliation key used by [`crate::domain::reconcile`]; it is not a
//! storage key. Stored records additionally carry a [`RecordKey`] assigned by
//! the store, which never appears on the wire.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Store-assigned surrogate key of a persisted child record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(Uuid);

impl RecordKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a key read back from the store.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when editing a single sub-attribute of a child record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("{kind} has no sub-attribute named {name}")]
    UnknownSubAttribute { kind: &'static str, name: String },
    #[error("{kind}.{name} expects {expected}")]
    InvalidValue {
        kind: &'static str,
        name: String,
        expected: &'static str,
    },
}

/// Behaviour shared by every kind of child attribute record.
pub trait TypedItem: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// SCIM attribute name of the collection holding this kind.
    const KIND: &'static str;

    fn item_type(&self) -> Option<&str>;

    fn set_item_type(&mut self, item_type: Option<String>);

    fn record_key(&self) -> Option<RecordKey>;

    fn set_record_key(&mut self, key: Option<RecordKey>);

    /// Copy every settable field from `other` onto `self`.
    ///
    /// The surrogate key of `self` is left untouched.
    fn assign_from(&mut self, other: &Self);

    /// Overwrite one sub-attribute by its SCIM name. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError`] when the name is unknown for this kind or the
    /// value has the wrong JSON type.
    fn set_sub_attribute(
        &mut self,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), AttributeError>;
}

/// Order records by item type with untyped records last.
///
/// The sort is stable, so records sharing a tag keep their relative order.
pub fn sort_by_item_type<T: TypedItem>(items: &mut [T]) {
    items.sort_by(|left, right| match (left.item_type(), right.item_type()) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn string_value(
    kind: &'static str,
    name: &str,
    value: Option<&Value>,
) -> Result<Option<String>, AttributeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(AttributeError::InvalidValue {
            kind,
            name: name.to_owned(),
            expected: "a string",
        }),
    }
}

fn bool_value(
    kind: &'static str,
    name: &str,
    value: Option<&Value>,
) -> Result<Option<bool>, AttributeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(_) => Err(AttributeError::InvalidValue {
            kind,
            name: name.to_owned(),
            expected: "a boolean",
        }),
    }
}

/// Postal address of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip)]
    pub key: Option<RecordKey>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl TypedItem for Address {
    const KIND: &'static str = "addresses";

    fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    fn set_item_type(&mut self, item_type: Option<String>) {
        self.item_type = item_type;
    }

    fn record_key(&self) -> Option<RecordKey> {
        self.key
    }

    fn set_record_key(&mut self, key: Option<RecordKey>) {
        self.key = key;
    }

    fn assign_from(&mut self, other: &Self) {
        self.item_type.clone_from(&other.item_type);
        self.formatted.clone_from(&other.formatted);
        self.street_address.clone_from(&other.street_address);
        self.locality.clone_from(&other.locality);
        self.region.clone_from(&other.region);
        self.postal_code.clone_from(&other.postal_code);
        self.country.clone_from(&other.country);
        self.primary = other.primary;
    }

    fn set_sub_attribute(
        &mut self,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), AttributeError> {
        let kind = Self::KIND;
        let slot = match name.to_ascii_lowercase().as_str() {
            "type" => &mut self.item_type,
            "formatted" => &mut self.formatted,
            "streetaddress" => &mut self.street_address,
            "locality" => &mut self.locality,
            "region" => &mut self.region,
            "postalcode" => &mut self.postal_code,
            "country" => &mut self.country,
            "primary" => {
                self.primary = bool_value(kind, name, value)?;
                return Ok(());
            }
            _ => {
                return Err(AttributeError::UnknownSubAttribute {
                    kind,
                    name: name.to_owned(),
                });
            }
        };
        *slot = string_value(kind, name, value)?;
        Ok(())
    }
}

/// Declares a value-style child record: `type`, `value`, `display`, `primary`.
macro_rules! value_attribute {
    ($(#[$meta:meta])* $name:ident => $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            #[serde(skip)]
            pub key: Option<RecordKey>,
            #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
            pub item_type: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub value: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub display: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub primary: Option<bool>,
        }

        impl $name {
            /// Build a record with a type tag and value.
            pub fn tagged(item_type: impl Into<String>, value: impl Into<String>) -> Self {
                Self {
                    item_type: Some(item_type.into()),
                    value: Some(value.into()),
                    ..Self::default()
                }
            }
        }

        impl TypedItem for $name {
            const KIND: &'static str = $kind;

            fn item_type(&self) -> Option<&str> {
                self.item_type.as_deref()
            }

            fn set_item_type(&mut self, item_type: Option<String>) {
                self.item_type = item_type;
            }

            fn record_key(&self) -> Option<RecordKey> {
                self.key
            }

            fn set_record_key(&mut self, key: Option<RecordKey>) {
                self.key = key;
            }

            fn assign_from(&mut self, other: &Self) {
                self.item_type.clone_from(&other.item_type);
                self.value.clone_from(&other.value);
                self.display.clone_from(&other.display);
                self.primary = other.primary;
            }

            fn set_sub_attribute(
                &mut self,
                name: &str,
                value: Option<&Value>,
            ) -> Result<(), AttributeError> {
                let kind = Self::KIND;
                match name.to_ascii_lowercase().as_str() {
                    "type" => self.item_type = string_value(kind, name, value)?,
                    "value" => self.value = string_value(kind, name, value)?,
                    "display" => self.display = string_value(kind, name, value)?,
                    "primary" => self.primary = bool_value(kind, name, value)?,
                    _ => {
                        return Err(AttributeError::UnknownSubAttribute {
                            kind,
                            name: name.to_owned(),
                        });
                    }
                }
                Ok(())
            }
        }
    };
}

value_attribute! {
    /// Email address of a user.
    Email => "emails"
}

value_attribute! {
    /// Instant messaging handle of a user.
    InstantMessaging => "ims"
}

value_attribute! {
    /// Phone number of a user.
    PhoneNumber => "phoneNumbers"
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn assign_from_keeps_the_record_key() {
        let key = RecordKey::generate();
        let mut stored = Email {
            key: Some(key),
            ..Email::tagged("work", "old@example.com")
        };
        let desired = Email {
            key: Some(RecordKey::generate()),
            primary: Some(true),
            ..Email::tagged("work", "new@example.com")
        };

        stored.assign_from(&desired);

        assert_eq!(stored.key, Some(key));
        assert_eq!(stored.value.as_deref(), Some("new@example.com"));
        assert_eq!(stored.primary, Some(true));
    }

    #[rstest]
    fn sort_places_untyped_records_last() {
        let mut phones = vec![
            PhoneNumber {
                value: Some("1".to_owned()),
                ..PhoneNumber::default()
            },
            PhoneNumber::tagged("work", "2"),
            PhoneNumber::tagged("home", "3"),
        ];

        sort_by_item_type(&mut phones);

        let tags: Vec<_> = phones.iter().map(|p| p.item_type.as_deref()).collect();
        assert_eq!(tags, vec![Some("home"), Some("work"), None]);
    }

    #[rstest]
    #[case("value", json!("x@example.com"))]
    #[case("Display", json!("X"))]
    #[case("primary", json!("True"))]
    fn sub_attributes_accept_matching_values(#[case] name: &str, #[case] value: Value) {
        let mut email = Email::default();
        email
            .set_sub_attribute(name, Some(&value))
            .expect("sub-attribute should be accepted");
    }

    #[rstest]
    fn sub_attribute_rejects_unknown_names() {
        let mut address = Address::default();
        let err = address
            .set_sub_attribute("planet", Some(&json!("Mars")))
            .expect_err("unknown sub-attribute");
        assert!(matches!(err, AttributeError::UnknownSubAttribute { .. }));
    }

    #[rstest]
    fn sub_attribute_rejects_wrong_types() {
        let mut address = Address::default();
        let err = address
            .set_sub_attribute("postalCode", Some(&json!(12345)))
            .expect_err("numeric postal code");
        assert!(matches!(err, AttributeError::InvalidValue { .. }));
    }

    #[rstest]
    fn wire_form_uses_type_and_hides_key() {
        let email = Email {
            key: Some(RecordKey::generate()),
            ..Email::tagged("work", "a@example.com")
        };
        let value = serde_json::to_value(&email).expect("serialise email");
        assert_eq!(value, json!({ "type": "work", "value": "a@example.com" }));
    }
}
