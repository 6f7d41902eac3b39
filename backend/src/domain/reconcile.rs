//! Attribute collection differ.
//!
//! Converges one stored child collection onto a desired set, keyed by item
//! type. Records whose tag survives are edited in place so they keep their
//! store key; records whose tag disappears are dropped; new tags are appended
//! without a key so the store assigns one on commit.

use std::collections::HashSet;

use super::attributes::TypedItem;

/// Counts of the edits made by one [`reconcile`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records appended without a store key.
    pub inserted: usize,
    /// Kept records whose fields changed.
    pub updated: usize,
    /// Records dropped from the collection.
    pub removed: usize,
}

impl ReconcileSummary {
    /// Fold another summary into this one.
    pub fn absorb(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.removed += other.removed;
    }
}

/// Desired collections the differ refuses to converge onto.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("{kind} lists item type {} more than once", display_tag(.item_type.as_deref()))]
    DuplicateItemType {
        kind: &'static str,
        item_type: Option<String>,
    },
}

fn display_tag(tag: Option<&str>) -> String {
    tag.map_or_else(|| "(untyped)".to_owned(), |value| format!("\"{value}\""))
}

/// Reject collections in which two records share an item type.
///
/// # Errors
///
/// Returns [`ReconcileError::DuplicateItemType`] naming the first repeated tag.
pub fn ensure_distinct_item_types<T: TypedItem>(items: &[T]) -> Result<(), ReconcileError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.item_type()) {
            return Err(ReconcileError::DuplicateItemType {
                kind: T::KIND,
                item_type: item.item_type().map(str::to_owned),
            });
        }
    }
    Ok(())
}

/// Converge `current` onto `desired`.
///
/// `None` means the collection is absent from the incoming resource, which
/// clears it. Nothing is mutated when `desired` is rejected.
///
/// # Errors
///
/// Returns [`ReconcileError::DuplicateItemType`] when `desired` repeats a tag.
///
/// # Examples
/// ```
/// use scim_backend::domain::{Email, reconcile};
///
/// let mut current = vec![Email::tagged("home", "h@example.com")];
/// let desired = [Email::tagged("work", "w@example.com")];
/// let summary = reconcile(&mut current, Some(&desired)).expect("distinct tags");
/// assert_eq!((summary.inserted, summary.removed), (1, 1));
/// assert_eq!(current[0].value.as_deref(), Some("w@example.com"));
/// ```
pub fn reconcile<T: TypedItem>(
    current: &mut Vec<T>,
    desired: Option<&[T]>,
) -> Result<ReconcileSummary, ReconcileError> {
    let Some(desired) = desired else {
        let removed = current.len();
        current.clear();
        return Ok(ReconcileSummary {
            removed,
            ..ReconcileSummary::default()
        });
    };
    ensure_distinct_item_types(desired)?;

    let before = current.len();
    let mut kept: HashSet<Option<String>> = HashSet::with_capacity(current.len());
    // The first stored record of a tag carries its identity; later duplicates go.
    current.retain(|item| {
        let tag = item.item_type();
        desired.iter().any(|target| target.item_type() == tag)
            && kept.insert(tag.map(str::to_owned))
    });

    let mut summary = ReconcileSummary {
        removed: before - current.len(),
        ..ReconcileSummary::default()
    };

    for target in desired {
        match current
            .iter_mut()
            .find(|item| item.item_type() == target.item_type())
        {
            Some(existing) => {
                let before = existing.clone();
                existing.assign_from(target);
                if *existing != before {
                    summary.updated += 1;
                }
            }
            None => {
                let mut fresh = target.clone();
                fresh.set_record_key(None);
                current.push(fresh);
                summary.inserted += 1;
            }
        }
    }

    Ok(summary)
}
