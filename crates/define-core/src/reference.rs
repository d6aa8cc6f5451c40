//! Reference tracking for shared entities.
//!
//! A shared entity stays alive exactly as long as its `sources` lists at
//! least one owner. [`add_reference`] and [`remove_reference`] are the pure
//! primitives; [`retain`] and [`release`] apply them to an entity stored in
//! an OID-keyed map, which is what the mutation engine works with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use define_model::{Oid, Referenced, SourceKind};

/// Rule deciding when removing a reference deletes the entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePolicy {
    /// Delete when the entity has at most one reference left, whichever
    /// owner type that reference belongs to.
    #[default]
    AsObserved,
    /// Delete only when the removed edge is the entity's sole edge.
    Strict,
}

impl ReferencePolicy {
    /// Whether removing `(kind, owner)` from `entity` deletes it.
    pub fn deletes<T: Referenced>(&self, entity: &T, kind: SourceKind, owner: &str) -> bool {
        let sources = entity.sources();
        match self {
            ReferencePolicy::AsObserved => sources.total() <= 1,
            ReferencePolicy::Strict => sources.total() == 1 && sources.contains(kind, owner),
        }
    }
}

/// Record `owner` as a referencing source of `entity`.
///
/// Already present owners leave the entity unchanged.
pub fn add_reference<T: Referenced>(mut entity: T, kind: SourceKind, owner: &str) -> T {
    entity.sources_mut().push(kind, owner);
    entity
}

/// Remove `owner` from the sources of `entity`.
///
/// Returns `None` when the entity lost its last reference and must be
/// deleted. The count is checked before list membership, so an entity with a
/// single reference is deleted even if that reference has another owner type.
pub fn remove_reference<T: Referenced>(entity: T, kind: SourceKind, owner: &str) -> Option<T> {
    remove_reference_with(entity, kind, owner, ReferencePolicy::AsObserved)
}

/// [`remove_reference`] under an explicit [`ReferencePolicy`].
pub fn remove_reference_with<T: Referenced>(
    mut entity: T,
    kind: SourceKind,
    owner: &str,
    policy: ReferencePolicy,
) -> Option<T> {
    if policy.deletes(&entity, kind, owner) {
        return None;
    }
    entity.sources_mut().remove(kind, owner);
    Some(entity)
}

/// Add an edge to the entity stored under `oid`.
///
/// Returns `false` when no such entity exists.
pub fn retain<T: Referenced>(
    entities: &mut BTreeMap<Oid, T>,
    oid: &str,
    kind: SourceKind,
    owner: &str,
) -> bool {
    match entities.get_mut(oid) {
        Some(entity) => {
            entity.sources_mut().push(kind, owner);
            true
        }
        None => false,
    }
}

/// Outcome of releasing one edge of a stored entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Released<T> {
    /// The entity is still referenced by other owners.
    Kept,
    /// The edge was the last one; the entity was removed from the map and is
    /// handed back so the caller can cascade into what it referenced.
    Deleted(T),
    /// No entity with that OID exists.
    Missing,
}

impl<T> Released<T> {
    pub fn into_deleted(self) -> Option<T> {
        match self {
            Released::Deleted(entity) => Some(entity),
            Released::Kept | Released::Missing => None,
        }
    }
}

/// Remove an edge from the entity stored under `oid`, deleting the entity
/// when the policy says it lost its last reference.
pub fn release<T: Referenced>(
    entities: &mut BTreeMap<Oid, T>,
    oid: &str,
    kind: SourceKind,
    owner: &str,
    policy: ReferencePolicy,
) -> Released<T> {
    let Some(entity) = entities.get_mut(oid) else {
        return Released::Missing;
    };
    if policy.deletes(entity, kind, owner) {
        debug!(oid, %kind, owner, "last reference released");
        return match entities.remove(oid) {
            Some(entity) => Released::Deleted(entity),
            None => Released::Missing,
        };
    }
    entity.sources_mut().remove(kind, owner);
    Released::Kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use define_model::{Comment, Sources, WhereClause};

    fn comment_with(owners: &[(SourceKind, &str)]) -> Comment {
        let mut comment = Comment::new("COM.1", "Derived from the CRF");
        for (kind, owner) in owners {
            comment.sources.push(*kind, *owner);
        }
        comment
    }

    #[test]
    fn add_reference_appends_once() {
        let comment = comment_with(&[(SourceKind::ItemDefs, "IT.A")]);
        let comment = add_reference(comment, SourceKind::ItemDefs, "IT.B");
        let comment = add_reference(comment, SourceKind::ItemDefs, "IT.A");
        assert_eq!(comment.sources.owners(SourceKind::ItemDefs), ["IT.A", "IT.B"]);
    }

    #[test]
    fn sole_reference_removal_deletes() {
        let comment = comment_with(&[(SourceKind::ItemDefs, "IT.A")]);
        assert_eq!(remove_reference(comment, SourceKind::ItemDefs, "IT.A"), None);
    }

    #[test]
    fn absent_owner_is_a_no_op() {
        let comment = comment_with(&[
            (SourceKind::ItemDefs, "IT.A"),
            (SourceKind::ItemGroups, "IG.AE"),
        ]);
        let after = remove_reference(comment.clone(), SourceKind::ItemDefs, "IT.Z");
        assert_eq!(after, Some(comment));
    }

    #[test]
    fn observed_rule_ignores_owner_type_of_last_reference() {
        let comment = comment_with(&[(SourceKind::ItemGroups, "IG.AE")]);
        assert_eq!(
            remove_reference(comment.clone(), SourceKind::ItemDefs, "IT.A"),
            None
        );
        assert_eq!(
            remove_reference_with(comment.clone(), SourceKind::ItemDefs, "IT.A", ReferencePolicy::Strict),
            Some(comment)
        );
    }

    #[test]
    fn where_clause_shared_by_two_value_lists_survives_one_release() {
        let mut where_clause = WhereClause::new("WC.1", Vec::new());
        where_clause.sources = Sources::single(SourceKind::ValueLists, "VL.A");
        where_clause.sources.push(SourceKind::ValueLists, "VL.B");
        let after = remove_reference(where_clause, SourceKind::ValueLists, "VL.A")
            .expect("where clause kept");
        assert_eq!(after.sources.owners(SourceKind::ValueLists), ["VL.B"]);
    }

    #[test]
    fn release_hands_back_deleted_entity() {
        let mut comments = BTreeMap::new();
        comments.insert(
            Oid::from("COM.1"),
            comment_with(&[(SourceKind::ItemDefs, "IT.A"), (SourceKind::ItemDefs, "IT.B")]),
        );
        let policy = ReferencePolicy::default();
        assert_eq!(
            release(&mut comments, "COM.1", SourceKind::ItemDefs, "IT.A", policy),
            Released::Kept
        );
        let deleted = release(&mut comments, "COM.1", SourceKind::ItemDefs, "IT.B", policy)
            .into_deleted()
            .expect("comment deleted");
        assert_eq!(deleted.oid, "COM.1");
        assert!(comments.is_empty());
        assert_eq!(
            release(&mut comments, "COM.1", SourceKind::ItemDefs, "IT.B", policy),
            Released::Missing
        );
    }
}
