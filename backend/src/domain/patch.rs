//! Partial updates of a user resource.
//!
//! A [`Patch`] pairs the target identifier with a SCIM PatchOp request. The
//! envelope is validated by [`Patch::validate`]; the operations are then
//! applied in document order by [`apply_patch`]. Scalar paths overwrite or
//! clear one field. Collection paths compute a desired set and hand it to
//! [`crate::domain::reconcile`], so patches and full replacement converge
//! collections the same way.

mod path;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use self::path::{AttributePath, CollectionKind, CollectionPath, TextField};
use super::ProvisioningError;
use super::attributes::TypedItem;
use super::reconcile::{ReconcileSummary, reconcile};
use super::user::{ENTERPRISE_USER_SCHEMA, EnterpriseExtension, Manager, Name, User, UserId};

/// Message schema URN every supported patch request must declare.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Kind of a single patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

impl PatchOp {
    /// Lower-case operation name as written on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown patch operation: {0}")]
pub struct UnknownPatchOp(pub String);

impl FromStr for PatchOp {
    type Err = UnknownPatchOp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "replace" => Ok(Self::Replace),
            "remove" => Ok(Self::Remove),
            _ => Err(UnknownPatchOp(s.to_owned())),
        }
    }
}

impl TryFrom<String> for PatchOp {
    type Error = UnknownPatchOp;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PatchOp> for String {
    fn from(value: PatchOp) -> Self {
        value.as_str().to_owned()
    }
}

/// One operation of a patch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Build one operation; `path` and `value` are optional on the wire.
    pub fn new(op: PatchOp, path: Option<&str>, value: Option<Value>) -> Self {
        Self {
            op,
            path: path.map(str::to_owned),
            value,
        }
    }
}

/// SCIM PatchOp message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations", default)]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Build a request declaring the PatchOp message schema.
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_owned()],
            operations,
        }
    }

    fn is_patch_op(&self) -> bool {
        self.schemas
            .iter()
            .any(|schema| schema.trim().eq_ignore_ascii_case(PATCH_OP_SCHEMA))
    }
}

/// A patch addressed to one user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    pub resource_identifier: Option<String>,
    pub request: Option<PatchRequest>,
}

impl Patch {
    /// Address `request` to the user `resource_identifier`.
    pub fn new(resource_identifier: impl Into<String>, request: PatchRequest) -> Self {
        Self {
            resource_identifier: Some(resource_identifier.into()),
            request: Some(request),
        }
    }

    /// Check the envelope and return the target and request.
    ///
    /// # Errors
    ///
    /// - [`ProvisioningError::InvalidPatch`] when the identifier is missing or
    ///   blank, or no request is attached.
    /// - [`ProvisioningError::UnsupportedPatchFormat`] when the request does not
    ///   declare the PatchOp message schema.
    pub fn validate(&self) -> Result<(UserId, &PatchRequest), ProvisioningError> {
        let id = self
            .resource_identifier
            .as_deref()
            .ok_or_else(|| ProvisioningError::invalid_patch("patch has no resource identifier"))?;
        let id = UserId::new(id)
            .map_err(|err| ProvisioningError::invalid_patch(err.to_string()))?;
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| ProvisioningError::invalid_patch("null patch request"))?;
        if !request.is_patch_op() {
            return Err(ProvisioningError::unsupported_patch_format(format!(
                "patch request must declare {PATCH_OP_SCHEMA}"
            )));
        }
        Ok((id, request))
    }
}

/// Apply every operation of `request` to `user` in document order.
///
/// On error `user` may be partially modified; callers apply patches to a
/// working copy and discard it on failure.
///
/// # Errors
///
/// Returns [`ProvisioningError::InvalidPatch`] for unsupported paths or
/// malformed values, and [`ProvisioningError::BadRequest`] when a collection
/// would end up with repeated item types.
pub fn apply_patch(
    user: &mut User,
    request: &PatchRequest,
) -> Result<ReconcileSummary, ProvisioningError> {
    let mut summary = ReconcileSummary::default();
    for operation in &request.operations {
        let value = operation.value.as_ref();
        match operation.path.as_deref() {
            Some(raw) => apply_path(user, operation.op, raw, value, &mut summary)?,
            None => apply_without_path(user, operation.op, value, &mut summary)?,
        }
    }
    Ok(summary)
}

fn apply_without_path(
    user: &mut User,
    op: PatchOp,
    value: Option<&Value>,
    summary: &mut ReconcileSummary,
) -> Result<(), ProvisioningError> {
    if op == PatchOp::Remove {
        return Err(ProvisioningError::invalid_patch("remove requires a path"));
    }
    let members = object_value(value, "an operation without a path")?;
    apply_members(user, op, "", members, summary)
}

/// Apply each member of a complex value as its own path under `prefix`.
fn apply_members(
    user: &mut User,
    op: PatchOp,
    prefix: &str,
    members: &Map<String, Value>,
    summary: &mut ReconcileSummary,
) -> Result<(), ProvisioningError> {
    for (name, member) in members {
        let path = format!("{prefix}{name}");
        apply_path(user, op, &path, Some(member), summary)?;
    }
    Ok(())
}

fn apply_path(
    user: &mut User,
    op: PatchOp,
    raw: &str,
    value: Option<&Value>,
    summary: &mut ReconcileSummary,
) -> Result<(), ProvisioningError> {
    match AttributePath::parse(raw)? {
        AttributePath::Id => Err(ProvisioningError::invalid_patch("id is immutable")),
        AttributePath::UserName => {
            if op == PatchOp::Remove {
                return Err(ProvisioningError::invalid_patch(
                    "userName cannot be removed",
                ));
            }
            user.user_name = string_value(value, raw)?
                .ok_or_else(|| ProvisioningError::invalid_patch("userName requires a value"))?;
            Ok(())
        }
        AttributePath::Active => {
            user.active = match op {
                PatchOp::Remove => None,
                PatchOp::Add | PatchOp::Replace => bool_value(value, raw)?,
            };
            Ok(())
        }
        AttributePath::Text(field) => {
            let next = match op {
                PatchOp::Remove => None,
                PatchOp::Add | PatchOp::Replace => string_value(value, raw)?,
            };
            *text_slot(user, field) = next;
            user.enterprise.prune_manager();
            Ok(())
        }
        AttributePath::Name => match op {
            PatchOp::Remove => {
                user.name = Name::default();
                Ok(())
            }
            PatchOp::Add | PatchOp::Replace => {
                let members = object_value(value, raw)?;
                apply_members(user, op, "name.", members, summary)
            }
        },
        AttributePath::Enterprise => match op {
            PatchOp::Remove => {
                user.enterprise = EnterpriseExtension::default();
                Ok(())
            }
            PatchOp::Add | PatchOp::Replace => {
                let members = object_value(value, raw)?;
                let prefix = format!("{ENTERPRISE_USER_SCHEMA}:");
                apply_members(user, op, &prefix, members, summary)
            }
        },
        AttributePath::Manager => apply_manager(user, op, raw, value, summary),
        AttributePath::Collection(path) => {
            let applied = match path.kind {
                CollectionKind::Addresses => {
                    apply_collection(&mut user.addresses, op, &path, value, raw)
                }
                CollectionKind::Emails => apply_collection(&mut user.emails, op, &path, value, raw),
                CollectionKind::Ims => apply_collection(&mut user.ims, op, &path, value, raw),
                CollectionKind::PhoneNumbers => {
                    apply_collection(&mut user.phone_numbers, op, &path, value, raw)
                }
            }?;
            summary.absorb(applied);
            Ok(())
        }
    }
}

fn apply_manager(
    user: &mut User,
    op: PatchOp,
    raw: &str,
    value: Option<&Value>,
    summary: &mut ReconcileSummary,
) -> Result<(), ProvisioningError> {
    if op == PatchOp::Remove {
        user.enterprise.manager = None;
        return Ok(());
    }
    match value {
        // A bare string is shorthand for the manager's identifier.
        Some(Value::String(manager_id)) => {
            user.enterprise
                .manager
                .get_or_insert_with(Manager::default)
                .value = Some(manager_id.clone());
            Ok(())
        }
        Some(Value::Null) | None => {
            user.enterprise.manager = None;
            Ok(())
        }
        Some(_) => {
            let members = object_value(value, raw)?;
            let prefix = format!("{ENTERPRISE_USER_SCHEMA}:manager.");
            apply_members(user, op, &prefix, members, summary)
        }
    }
}

fn apply_collection<T>(
    current: &mut Vec<T>,
    op: PatchOp,
    path: &CollectionPath,
    value: Option<&Value>,
    raw: &str,
) -> Result<ReconcileSummary, ProvisioningError>
where
    T: TypedItem + Default + DeserializeOwned,
{
    let Some(selector) = path.selector.as_deref() else {
        if path.sub_attribute.is_some() {
            return Err(ProvisioningError::invalid_patch(format!(
                "sub-attribute paths need a value filter: {raw}"
            )));
        }
        let desired = match (op, value) {
            (PatchOp::Remove, _) | (_, None | Some(Value::Null)) => None,
            (PatchOp::Add | PatchOp::Replace, Some(items)) => Some(records_value::<T>(items, raw)?),
        };
        return Ok(reconcile(current, desired.as_deref())?);
    };

    let mut desired = current.clone();
    let position = desired
        .iter()
        .position(|item| item.item_type() == Some(selector));

    match (path.sub_attribute.as_deref(), op) {
        (None, PatchOp::Remove) => {
            if let Some(index) = position {
                desired.remove(index);
            }
        }
        (None, PatchOp::Add | PatchOp::Replace) => {
            let members = object_value(value, raw)?;
            if let Some(target) = selected_or_fresh(&mut desired, position, selector) {
                for (name, member) in members {
                    set_sub_attribute(target, name, Some(member))?;
                }
                // The filter names the record; a `type` member cannot move it.
                target.set_item_type(Some(selector.to_owned()));
            }
        }
        (Some(sub), PatchOp::Remove) => {
            if let Some(existing) = position.and_then(|index| desired.get_mut(index)) {
                set_sub_attribute(existing, sub, None)?;
            }
        }
        (Some(sub), PatchOp::Add | PatchOp::Replace) => {
            if let Some(target) = selected_or_fresh(&mut desired, position, selector) {
                set_sub_attribute(target, sub, value)?;
            }
        }
    }

    Ok(reconcile(current, Some(&desired))?)
}

/// Record matched by a value filter, or a new one tagged `selector`.
fn selected_or_fresh<'a, T: TypedItem + Default>(
    items: &'a mut Vec<T>,
    position: Option<usize>,
    selector: &str,
) -> Option<&'a mut T> {
    match position {
        Some(index) => items.get_mut(index),
        None => {
            let mut fresh = T::default();
            fresh.set_item_type(Some(selector.to_owned()));
            items.push(fresh);
            items.last_mut()
        }
    }
}

fn set_sub_attribute<T: TypedItem>(
    item: &mut T,
    name: &str,
    value: Option<&Value>,
) -> Result<(), ProvisioningError> {
    item.set_sub_attribute(name, value)
        .map_err(|err| ProvisioningError::invalid_patch(err.to_string()))
}

fn text_slot(user: &mut User, field: TextField) -> &mut Option<String> {
    match field {
        TextField::ExternalId => &mut user.external_id,
        TextField::DisplayName => &mut user.display_name,
        TextField::NickName => &mut user.nick_name,
        TextField::ProfileUrl => &mut user.profile_url,
        TextField::Title => &mut user.title,
        TextField::UserType => &mut user.user_type,
        TextField::PreferredLanguage => &mut user.preferred_language,
        TextField::Locale => &mut user.locale,
        TextField::Timezone => &mut user.timezone,
        TextField::NameFormatted => &mut user.name.formatted,
        TextField::NameFamilyName => &mut user.name.family_name,
        TextField::NameGivenName => &mut user.name.given_name,
        TextField::NameMiddleName => &mut user.name.middle_name,
        TextField::NameHonorificPrefix => &mut user.name.honorific_prefix,
        TextField::NameHonorificSuffix => &mut user.name.honorific_suffix,
        TextField::EmployeeNumber => &mut user.enterprise.employee_number,
        TextField::CostCenter => &mut user.enterprise.cost_center,
        TextField::Organization => &mut user.enterprise.organization,
        TextField::Division => &mut user.enterprise.division,
        TextField::Department => &mut user.enterprise.department,
        TextField::ManagerValue => {
            &mut user
                .enterprise
                .manager
                .get_or_insert_with(Manager::default)
                .value
        }
        TextField::ManagerDisplayName => {
            &mut user
                .enterprise
                .manager
                .get_or_insert_with(Manager::default)
                .display_name
        }
    }
}

fn string_value(value: Option<&Value>, path: &str) -> Result<Option<String>, ProvisioningError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ProvisioningError::invalid_patch(format!(
            "{path} expects a string value"
        ))),
    }
}

fn bool_value(value: Option<&Value>, path: &str) -> Result<Option<bool>, ProvisioningError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(text)) if text.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(_) => Err(ProvisioningError::invalid_patch(format!(
            "{path} expects a boolean value"
        ))),
    }
}

fn object_value<'a>(
    value: Option<&'a Value>,
    path: &str,
) -> Result<&'a Map<String, Value>, ProvisioningError> {
    value
        .and_then(Value::as_object)
        .ok_or_else(|| ProvisioningError::invalid_patch(format!("{path} expects an object value")))
}

/// Read a collection value: an array of records or a single record.
fn records_value<T: DeserializeOwned>(
    value: &Value,
    path: &str,
) -> Result<Vec<T>, ProvisioningError> {
    let parsed = match value {
        Value::Array(_) => serde_json::from_value(value.clone()),
        _ => serde_json::from_value(value.clone()).map(|record| vec![record]),
    };
    parsed.map_err(|err| malformed(path, &err))
}

fn malformed(path: &str, err: &serde_json::Error) -> ProvisioningError {
    ProvisioningError::invalid_patch(format!("{path}: {err}"))
}
