//! Parsing of patch attribute paths.
//!
//! Supported forms, all matched case-insensitively:
//!
//! - `userName`, `displayName`, `active`, ... (optionally prefixed with the
//!   core user schema URN and a colon);
//! - `name`, `name.givenName`, ...;
//! - the enterprise extension URN on its own, or followed by `:department`,
//!   `:manager`, `:manager.value`, ...;
//! - `emails`, `emails[type eq "work"]` and `emails[type eq "work"].value`
//!   for each of the four collections.

use crate::domain::ProvisioningError;
use crate::domain::user::{CORE_USER_SCHEMA, ENTERPRISE_USER_SCHEMA};

/// Optional text attributes addressable by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextField {
    ExternalId,
    DisplayName,
    NickName,
    ProfileUrl,
    Title,
    UserType,
    PreferredLanguage,
    Locale,
    Timezone,
    NameFormatted,
    NameFamilyName,
    NameGivenName,
    NameMiddleName,
    NameHonorificPrefix,
    NameHonorificSuffix,
    EmployeeNumber,
    CostCenter,
    Organization,
    Division,
    Department,
    ManagerValue,
    ManagerDisplayName,
}

/// The four owned collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectionKind {
    Addresses,
    Emails,
    Ims,
    PhoneNumbers,
}

/// Path into one of the owned collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CollectionPath {
    pub(crate) kind: CollectionKind,
    /// Item type selected by a `[type eq "..."]` filter.
    pub(crate) selector: Option<String>,
    pub(crate) sub_attribute: Option<String>,
}

/// A resolved attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttributePath {
    Id,
    UserName,
    Active,
    Text(TextField),
    Name,
    Enterprise,
    Manager,
    Collection(CollectionPath),
}

impl AttributePath {
    /// Parse a raw patch path.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidPatch`] for paths naming no
    /// supported attribute or using an unsupported filter.
    pub(crate) fn parse(raw: &str) -> Result<Self, ProvisioningError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProvisioningError::invalid_patch(
                "patch path must not be blank",
            ));
        }

        if let Some(rest) = strip_prefix_ignore_case(trimmed, ENTERPRISE_USER_SCHEMA) {
            return match rest.strip_prefix(':') {
                Some(attribute) => parse_enterprise(attribute, raw),
                None if rest.is_empty() => Ok(Self::Enterprise),
                None => Err(unknown_path(raw)),
            };
        }

        let local = strip_prefix_ignore_case(trimmed, CORE_USER_SCHEMA)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(trimmed);

        if let Some(open) = local.find('[') {
            return parse_filtered(local, open, raw);
        }

        let (head, sub) = split_sub_attribute(local);
        if let Some(kind) = collection_kind(head) {
            return Ok(Self::Collection(CollectionPath {
                kind,
                selector: None,
                sub_attribute: sub.map(str::to_owned),
            }));
        }

        match (head.to_ascii_lowercase().as_str(), sub) {
            ("name", None) => Ok(Self::Name),
            ("name", Some(field)) => {
                let text = name_field(field).ok_or_else(|| unknown_path(raw))?;
                Ok(Self::Text(text))
            }
            (_, Some(_)) => Err(unknown_path(raw)),
            (other, None) => top_level(other).ok_or_else(|| unknown_path(raw)),
        }
    }
}

fn unknown_path(raw: &str) -> ProvisioningError {
    ProvisioningError::invalid_patch(format!("unsupported patch path: {raw}"))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

fn split_sub_attribute(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, sub)) => (head, Some(sub)),
        None => (path, None),
    }
}

fn top_level(name: &str) -> Option<AttributePath> {
    let path = match name {
        "id" => AttributePath::Id,
        "username" => AttributePath::UserName,
        "active" => AttributePath::Active,
        "externalid" => AttributePath::Text(TextField::ExternalId),
        "displayname" => AttributePath::Text(TextField::DisplayName),
        "nickname" => AttributePath::Text(TextField::NickName),
        "profileurl" => AttributePath::Text(TextField::ProfileUrl),
        "title" => AttributePath::Text(TextField::Title),
        "usertype" => AttributePath::Text(TextField::UserType),
        "preferredlanguage" => AttributePath::Text(TextField::PreferredLanguage),
        "locale" => AttributePath::Text(TextField::Locale),
        "timezone" => AttributePath::Text(TextField::Timezone),
        _ => return None,
    };
    Some(path)
}

fn name_field(field: &str) -> Option<TextField> {
    let field = match field.to_ascii_lowercase().as_str() {
        "formatted" => TextField::NameFormatted,
        "familyname" => TextField::NameFamilyName,
        "givenname" => TextField::NameGivenName,
        "middlename" => TextField::NameMiddleName,
        "honorificprefix" => TextField::NameHonorificPrefix,
        "honorificsuffix" => TextField::NameHonorificSuffix,
        _ => return None,
    };
    Some(field)
}

fn collection_kind(name: &str) -> Option<CollectionKind> {
    let kind = match name.to_ascii_lowercase().as_str() {
        "addresses" => CollectionKind::Addresses,
        "emails" => CollectionKind::Emails,
        "ims" => CollectionKind::Ims,
        "phonenumbers" => CollectionKind::PhoneNumbers,
        _ => return None,
    };
    Some(kind)
}

fn parse_enterprise(attribute: &str, raw: &str) -> Result<AttributePath, ProvisioningError> {
    let path = match attribute.to_ascii_lowercase().as_str() {
        "employeenumber" => AttributePath::Text(TextField::EmployeeNumber),
        "costcenter" => AttributePath::Text(TextField::CostCenter),
        "organization" => AttributePath::Text(TextField::Organization),
        "division" => AttributePath::Text(TextField::Division),
        "department" => AttributePath::Text(TextField::Department),
        "manager" => AttributePath::Manager,
        "manager.value" => AttributePath::Text(TextField::ManagerValue),
        "manager.displayname" => AttributePath::Text(TextField::ManagerDisplayName),
        _ => return Err(unknown_path(raw)),
    };
    Ok(path)
}

fn parse_filtered(local: &str, open: usize, raw: &str) -> Result<AttributePath, ProvisioningError> {
    let (head, tail) = local.split_at(open);
    let kind = collection_kind(head).ok_or_else(|| unknown_path(raw))?;
    let tail = tail.strip_prefix('[').unwrap_or(tail);
    let (filter, after) = tail.split_once(']').ok_or_else(|| {
        ProvisioningError::invalid_patch(format!("unterminated value filter in path: {raw}"))
    })?;

    let sub_attribute = match after {
        "" => None,
        rest => Some(
            rest.strip_prefix('.')
                .filter(|sub| !sub.is_empty())
                .ok_or_else(|| unknown_path(raw))?
                .to_owned(),
        ),
    };

    Ok(AttributePath::Collection(CollectionPath {
        kind,
        selector: Some(parse_type_filter(filter, raw)?),
        sub_attribute,
    }))
}

/// Parse `type eq "work"`, the only value filter accepted in patch paths.
fn parse_type_filter(filter: &str, raw: &str) -> Result<String, ProvisioningError> {
    let unsupported =
        || ProvisioningError::invalid_patch(format!("unsupported value filter in path: {raw}"));

    let mut parts = filter.trim().splitn(3, char::is_whitespace);
    let attribute = parts.next().ok_or_else(unsupported)?;
    let operator = parts.next().ok_or_else(unsupported)?;
    let operand = parts.next().map(str::trim).ok_or_else(unsupported)?;

    if !attribute.eq_ignore_ascii_case("type") || !operator.eq_ignore_ascii_case("eq") {
        return Err(unsupported());
    }

    operand
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_owned)
        .ok_or_else(unsupported)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("userName", AttributePath::UserName)]
    #[case("USERNAME", AttributePath::UserName)]
    #[case(
        "urn:ietf:params:scim:schemas:core:2.0:User:displayName",
        AttributePath::Text(TextField::DisplayName)
    )]
    #[case("name", AttributePath::Name)]
    #[case("name.givenName", AttributePath::Text(TextField::NameGivenName))]
    #[case(
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
        AttributePath::Enterprise
    )]
    #[case(
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:department",
        AttributePath::Text(TextField::Department)
    )]
    #[case(
        "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager",
        AttributePath::Manager
    )]
    #[case("id", AttributePath::Id)]
    fn parses_scalar_paths(#[case] raw: &str, #[case] expected: AttributePath) {
        assert_eq!(AttributePath::parse(raw).expect("supported path"), expected);
    }

    #[rstest]
    fn parses_filtered_collection_paths() {
        let path = AttributePath::parse(r#"emails[type eq "work"].value"#).expect("supported");
        assert_eq!(
            path,
            AttributePath::Collection(CollectionPath {
                kind: CollectionKind::Emails,
                selector: Some("work".to_owned()),
                sub_attribute: Some("value".to_owned()),
            })
        );
    }

    #[rstest]
    fn parses_whole_collection_paths() {
        let path = AttributePath::parse("phoneNumbers").expect("supported");
        assert_eq!(
            path,
            AttributePath::Collection(CollectionPath {
                kind: CollectionKind::PhoneNumbers,
                selector: None,
                sub_attribute: None,
            })
        );
    }

    #[rstest]
    #[case("")]
    #[case("favouriteColour")]
    #[case("name.nickname")]
    #[case(r#"emails[value eq "a@example.com"]"#)]
    #[case(r#"emails[type eq work]"#)]
    #[case(r#"emails[type eq "work""#)]
    #[case(r#"groups[type eq "work"]"#)]
    fn rejects_unsupported_paths(#[case] raw: &str) {
        let err = AttributePath::parse(raw).expect_err("unsupported path");
        assert!(matches!(err, ProvisioningError::InvalidPatch { .. }));
    }
}
