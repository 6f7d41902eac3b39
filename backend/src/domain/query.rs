//! Query translation.
//!
//! Only equality filters on `userName` and `externalId` are supported, which
//! is what provisioning clients use to look up an account before creating
//! it. Each filter is validated independently; several filters narrow the
//! result conjunctively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ProvisioningError;

/// Comparison operators a filter may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Present,
}

impl ComparisonOperator {
    /// SCIM operator keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "eq",
            Self::NotEquals => "ne",
            Self::Contains => "co",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "ge",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "le",
            Self::Present => "pr",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operator token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown comparison operator: {0}")]
pub struct UnknownOperator(pub String);

impl FromStr for ComparisonOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let operator = match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Self::Equals,
            "ne" => Self::NotEquals,
            "co" => Self::Contains,
            "sw" => Self::StartsWith,
            "ew" => Self::EndsWith,
            "gt" => Self::GreaterThan,
            "ge" => Self::GreaterThanOrEqual,
            "lt" => Self::LessThan,
            "le" => Self::LessThanOrEqual,
            "pr" => Self::Present,
            _ => return Err(UnknownOperator(s.to_owned())),
        };
        Ok(operator)
    }
}

impl TryFrom<String> for ComparisonOperator {
    type Error = UnknownOperator;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComparisonOperator> for String {
    fn from(value: ComparisonOperator) -> Self {
        value.as_str().to_owned()
    }
}

/// One `attributePath operator value` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub attribute_path: Option<String>,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub comparison_value: Option<String>,
}

impl Filter {
    /// Build an equality filter.
    pub fn equals(attribute_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute_path: Some(attribute_path.into()),
            operator: ComparisonOperator::Equals,
            comparison_value: Some(value.into()),
        }
    }
}

/// Parameters of a user query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    #[serde(default)]
    pub schema_identifier: Option<String>,
    #[serde(default)]
    pub filters: Option<Vec<Filter>>,
}

impl QueryParameters {
    /// Parameters selecting every user of `schema`.
    pub fn all(schema: impl Into<String>) -> Self {
        Self {
            schema_identifier: Some(schema.into()),
            filters: Some(Vec::new()),
        }
    }

    /// Parameters with one filter.
    pub fn filtered(schema: impl Into<String>, filter: Filter) -> Self {
        Self {
            schema_identifier: Some(schema.into()),
            filters: Some(vec![filter]),
        }
    }
}

/// One equality criterion the store can evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCriterion {
    UserName(String),
    ExternalId(String),
}

/// A translated lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// Every live user.
    All,
    /// Users matching every criterion.
    Matching(Vec<UserCriterion>),
}

/// Translate query parameters into a store lookup.
///
/// # Errors
///
/// - [`ProvisioningError::InvalidParameters`] when the filter set or schema is
///   unset, or a filter has a blank path or value.
/// - [`ProvisioningError::UnsupportedOperator`] for anything but `eq`.
/// - [`ProvisioningError::UnsupportedFilterAttribute`] for paths other than
///   `userName` and `externalId`.
///
/// # Examples
/// ```
/// use scim_backend::domain::{Filter, QueryParameters, UserCriterion, UserLookup, translate_query};
///
/// let params = QueryParameters::filtered(
///     "urn:ietf:params:scim:schemas:core:2.0:User",
///     Filter::equals("userName", "alice"),
/// );
/// assert_eq!(
///     translate_query(&params).expect("supported filter"),
///     UserLookup::Matching(vec![UserCriterion::UserName("alice".into())]),
/// );
/// ```
pub fn translate_query(parameters: &QueryParameters) -> Result<UserLookup, ProvisioningError> {
    let filters = parameters
        .filters
        .as_ref()
        .ok_or_else(|| ProvisioningError::invalid_parameters("filters are required"))?;
    let schema = parameters.schema_identifier.as_deref().unwrap_or_default();
    if schema.trim().is_empty() {
        return Err(ProvisioningError::invalid_parameters(
            "schema identifier is required",
        ));
    }

    if filters.is_empty() {
        return Ok(UserLookup::All);
    }

    filters
        .iter()
        .map(translate_filter)
        .collect::<Result<Vec<_>, _>>()
        .map(UserLookup::Matching)
}

fn translate_filter(filter: &Filter) -> Result<UserCriterion, ProvisioningError> {
    let Some(path) = non_blank(filter.attribute_path.as_deref()) else {
        return Err(required("filter attribute path"));
    };
    let Some(value) = non_blank(filter.comparison_value.as_deref()) else {
        return Err(required("filter comparison value"));
    };

    if filter.operator != ComparisonOperator::Equals {
        let operator = filter.operator.as_str();
        return Err(ProvisioningError::unsupported_operator(operator));
    }

    if path.eq_ignore_ascii_case("userName") {
        Ok(UserCriterion::UserName(value.to_owned()))
    } else if path.eq_ignore_ascii_case("externalId") {
        Ok(UserCriterion::ExternalId(value.to_owned()))
    } else {
        Err(ProvisioningError::unsupported_filter_attribute(path))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

fn required(what: &str) -> ProvisioningError {
    ProvisioningError::invalid_parameters(format!("{what} is required"))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::user::CORE_USER_SCHEMA;
    use rstest::rstest;

    fn filter(path: Option<&str>, operator: ComparisonOperator, value: Option<&str>) -> Filter {
        Filter {
            attribute_path: path.map(str::to_owned),
            operator,
            comparison_value: value.map(str::to_owned),
        }
    }

    #[rstest]
    fn unset_filters_are_invalid() {
        let params = QueryParameters {
            schema_identifier: Some(CORE_USER_SCHEMA.to_owned()),
            filters: None,
        };
        let err = translate_query(&params).expect_err("missing filters");
        assert!(matches!(err, ProvisioningError::InvalidParameters { .. }));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(" "))]
    fn unset_schema_is_invalid(#[case] schema: Option<&str>) {
        let params = QueryParameters {
            schema_identifier: schema.map(str::to_owned),
            filters: Some(Vec::new()),
        };
        let err = translate_query(&params).expect_err("missing schema");
        assert!(matches!(err, ProvisioningError::InvalidParameters { .. }));
    }

    #[rstest]
    fn no_filter_selects_everyone() {
        let lookup = translate_query(&QueryParameters::all(CORE_USER_SCHEMA)).expect("valid");
        assert_eq!(lookup, UserLookup::All);
    }

    #[rstest]
    #[case("userName", UserCriterion::UserName("alice".to_owned()))]
    #[case("USERNAME", UserCriterion::UserName("alice".to_owned()))]
    #[case("externalId", UserCriterion::ExternalId("alice".to_owned()))]
    fn equality_filters_translate(#[case] path: &str, #[case] expected: UserCriterion) {
        let params = QueryParameters::filtered(CORE_USER_SCHEMA, Filter::equals(path, "alice"));
        assert_eq!(
            translate_query(&params).expect("supported"),
            UserLookup::Matching(vec![expected])
        );
    }

    #[rstest]
    fn several_filters_combine() {
        let params = QueryParameters {
            schema_identifier: Some(CORE_USER_SCHEMA.to_owned()),
            filters: Some(vec![
                Filter::equals("userName", "alice"),
                Filter::equals("externalId", "a-1"),
            ]),
        };
        assert_eq!(
            translate_query(&params).expect("supported"),
            UserLookup::Matching(vec![
                UserCriterion::UserName("alice".to_owned()),
                UserCriterion::ExternalId("a-1".to_owned()),
            ])
        );
    }

    #[rstest]
    #[case(filter(None, ComparisonOperator::Equals, Some("alice")))]
    #[case(filter(Some(""), ComparisonOperator::Equals, Some("alice")))]
    #[case(filter(Some("userName"), ComparisonOperator::Equals, Some("  ")))]
    #[case(filter(Some("userName"), ComparisonOperator::Present, None))]
    fn blank_parts_are_invalid_before_operator_checks(#[case] filter: Filter) {
        let params = QueryParameters::filtered(CORE_USER_SCHEMA, filter);
        let err = translate_query(&params).expect_err("blank part");
        assert!(matches!(err, ProvisioningError::InvalidParameters { .. }));
    }

    #[rstest]
    fn non_equality_operators_are_unsupported() {
        let params = QueryParameters::filtered(
            CORE_USER_SCHEMA,
            filter(Some("userName"), ComparisonOperator::StartsWith, Some("al")),
        );
        let err = translate_query(&params).expect_err("sw");
        assert_eq!(err, ProvisioningError::unsupported_operator("sw"));
    }

    #[rstest]
    fn operator_is_checked_before_attribute() {
        let params = QueryParameters::filtered(
            CORE_USER_SCHEMA,
            filter(Some("title"), ComparisonOperator::Contains, Some("x")),
        );
        let err = translate_query(&params).expect_err("co");
        assert!(matches!(err, ProvisioningError::UnsupportedOperator { .. }));
    }

    #[rstest]
    fn other_attributes_are_unsupported() {
        let params = QueryParameters::filtered(CORE_USER_SCHEMA, Filter::equals("title", "x"));
        let err = translate_query(&params).expect_err("title");
        assert_eq!(
            err,
            ProvisioningError::unsupported_filter_attribute("title")
        );
    }

    #[rstest]
    fn operators_parse_case_insensitively() {
        assert_eq!(
            "EQ".parse::<ComparisonOperator>(),
            Ok(ComparisonOperator::Equals)
        );
        assert!("like".parse::<ComparisonOperator>().is_err());
    }
}
