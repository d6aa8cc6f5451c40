//! Error types for metadata graph operations.

use thiserror::Error;

use define_model::{EntityKind, Oid, VariableScope};

/// Error returned when an operation cannot be applied to a document.
///
/// Every variant describes a broken precondition of the caller; the state the
/// operation was applied to is left untouched.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DefineError {
    /// An action names an entity that does not exist.
    #[error("{kind} not found: {oid}")]
    MissingEntity {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// OID named by the action.
        oid: Oid,
    },

    /// An item ref is not part of the dataset or value list it was looked up in.
    #[error("Item ref {oid} not found in {scope}")]
    MissingItemRef {
        /// Item ref OID named by the action.
        oid: Oid,
        /// Container that was searched.
        scope: VariableScope,
    },

    /// The variable already has value-level metadata.
    #[error("Variable {item_oid} already has value list {value_list_oid}")]
    ValueListExists {
        /// Variable the value list was requested for.
        item_oid: Oid,
        /// Value list already attached to it.
        value_list_oid: Oid,
    },

    /// An OID chosen by the caller is already taken.
    #[error("{kind} {oid} already exists")]
    DuplicateOid {
        /// Kind of the entity being created.
        kind: EntityKind,
        /// The colliding OID.
        oid: Oid,
    },

    /// Two codelists cannot be linked.
    #[error("Cannot link codelist {oid} to {partner}: {reason}")]
    InvalidCodeListLink {
        /// Codelist being linked.
        oid: Oid,
        /// Intended partner.
        partner: Oid,
        /// Why the pair is rejected.
        reason: String,
    },

    /// A raw document could not be rebuilt into typed entities.
    #[error("Failed to deserialize document: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl DefineError {
    pub(crate) fn missing(kind: EntityKind, oid: &Oid) -> Self {
        DefineError::MissingEntity {
            kind,
            oid: oid.clone(),
        }
    }
}

/// Result type alias for metadata graph operations.
pub type Result<T> = std::result::Result<T, DefineError>;
