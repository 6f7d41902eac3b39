//! Mutations applied to a stored user inside a store transaction.
//!
//! The store loads the current user with its collections, calls
//! [`UserChange::apply`] on it and writes the result back atomically, so a
//! change is either fully committed or not visible at all.

use chrono::{DateTime, Utc};

use super::ProvisioningError;
use super::patch::{PatchRequest, apply_patch};
use super::reconcile::{ReconcileSummary, reconcile};
use super::user::{ResourceMeta, User};

/// A full replacement or a partial patch of one user.
#[derive(Debug, Clone, PartialEq)]
pub enum UserChange {
    Replace { resource: User, at: DateTime<Utc> },
    Patch {
        request: PatchRequest,
        at: DateTime<Utc>,
    },
}

impl UserChange {
    /// Replace every attribute of the stored user with `resource`.
    pub fn replace(resource: User, at: DateTime<Utc>) -> Self {
        Self::Replace { resource, at }
    }

    /// Apply `request` to the stored user.
    pub fn patch(request: PatchRequest, at: DateTime<Utc>) -> Self {
        Self::Patch { request, at }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Replace { .. } => "replace",
            Self::Patch { .. } => "patch",
        }
    }

    fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Replace { at, .. } | Self::Patch { at, .. } => *at,
        }
    }

    /// Mutate `user` in place.
    ///
    /// The identifier and creation time of `user` are preserved.
    ///
    /// # Errors
    ///
    /// Propagates patch and reconciliation failures, and returns
    /// [`ProvisioningError::BadRequest`] when the result has a blank
    /// `userName`.
    pub fn apply(&self, user: &mut User) -> Result<ReconcileSummary, ProvisioningError> {
        let summary = match self {
            Self::Replace { resource, .. } => replace_in_place(user, resource)?,
            Self::Patch { request, .. } => apply_patch(user, request)?,
        };

        if user.user_name.trim().is_empty() {
            return Err(ProvisioningError::bad_request("userName must not be blank"));
        }

        let at = self.at();
        user.meta = Some(match user.meta {
            Some(meta) => ResourceMeta {
                last_modified: at,
                ..meta
            },
            None => ResourceMeta {
                created: at,
                last_modified: at,
            },
        });
        Ok(summary)
    }
}

fn replace_in_place(
    user: &mut User,
    resource: &User,
) -> Result<ReconcileSummary, ProvisioningError> {
    let mut summary = ReconcileSummary::default();
    summary.absorb(reconcile(&mut user.addresses, Some(&resource.addresses))?);
    summary.absorb(reconcile(&mut user.emails, Some(&resource.emails))?);
    summary.absorb(reconcile(&mut user.ims, Some(&resource.ims))?);
    let phone_numbers = reconcile(&mut user.phone_numbers, Some(&resource.phone_numbers))?;
    summary.absorb(phone_numbers);
    user.assign_scalars_from(resource);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::attributes::{Email, InstantMessaging, RecordKey};
    use crate::domain::patch::{PatchOp, PatchOperation};
    use crate::domain::user::UserId;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn stored() -> User {
        User {
            id: Some(UserId::generate()),
            emails: vec![Email {
                key: Some(RecordKey::generate()),
                ..Email::tagged("work", "old@example.com")
            }],
            ims: vec![InstantMessaging::tagged("xmpp", "alice@chat")],
            meta: Some(ResourceMeta {
                created: at(1),
                last_modified: at(1),
            }),
            ..User::new("alice")
        }
    }

    #[rstest]
    fn replace_overwrites_scalars_and_reconciles_collections(mut stored: User) {
        let id = stored.id.clone();
        let work_key = stored.emails[0].key;
        let resource = User {
            id: id.clone(),
            display_name: Some("Alice".to_owned()),
            emails: vec![Email::tagged("work", "new@example.com")],
            ..User::new("alice.smith")
        };

        let summary = UserChange::replace(resource, at(2))
            .apply(&mut stored)
            .expect("replace applies");

        assert_eq!(stored.id, id);
        assert_eq!(stored.user_name, "alice.smith");
        assert_eq!(stored.display_name.as_deref(), Some("Alice"));
        assert_eq!(stored.emails[0].key, work_key);
        assert!(stored.ims.is_empty());
        assert_eq!(summary.removed, 1);
        assert_eq!(
            stored.meta,
            Some(ResourceMeta {
                created: at(1),
                last_modified: at(2)
            })
        );
    }

    #[rstest]
    fn blank_user_name_is_rejected(mut stored: User) {
        let err = UserChange::replace(User::new("  "), at(2))
            .apply(&mut stored)
            .expect_err("blank userName");
        assert!(matches!(err, ProvisioningError::BadRequest { .. }));
    }

    #[rstest]
    fn patch_changes_are_stamped(mut stored: User) {
        let request = PatchRequest::new(vec![PatchOperation::new(
            PatchOp::Replace,
            Some("title"),
            Some(json!("Lead")),
        )]);

        UserChange::patch(request, at(3))
            .apply(&mut stored)
            .expect("patch applies");

        assert_eq!(stored.title.as_deref(), Some("Lead"));
        assert_eq!(stored.meta.map(|meta| meta.last_modified), Some(at(3)));
    }
}
