#![deny(unsafe_code)]

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Opaque identifier of a document entity, unique within one MetaDataVersion.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidOid(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for Oid {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Oid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Oid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&Oid> for Oid {
    fn from(value: &Oid) -> Self {
        value.clone()
    }
}

impl From<String> for Oid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Oid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Oid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Kinds of entities that own an OID namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    ItemGroup,
    ItemDef,
    ItemRef,
    CodeList,
    CodeListItem,
    ValueList,
    WhereClause,
    Comment,
    Method,
    ResultDisplay,
    AnalysisResult,
}

impl EntityKind {
    /// Prefix used when minting OIDs of this kind.
    pub fn oid_prefix(&self) -> &'static str {
        match self {
            EntityKind::ItemGroup => "IG.",
            EntityKind::ItemDef => "IT.",
            EntityKind::ItemRef => "IR.",
            EntityKind::CodeList => "CL.",
            EntityKind::CodeListItem => "CLI.",
            EntityKind::ValueList => "VL.",
            EntityKind::WhereClause => "WC.",
            EntityKind::Comment => "COM.",
            EntityKind::Method => "MT.",
            EntityKind::ResultDisplay => "RD.",
            EntityKind::AnalysisResult => "AR.",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::ItemGroup => "item group",
            EntityKind::ItemDef => "item def",
            EntityKind::ItemRef => "item ref",
            EntityKind::CodeList => "code list",
            EntityKind::CodeListItem => "code list item",
            EntityKind::ValueList => "value list",
            EntityKind::WhereClause => "where clause",
            EntityKind::Comment => "comment",
            EntityKind::Method => "method",
            EntityKind::ResultDisplay => "result display",
            EntityKind::AnalysisResult => "analysis result",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mint `<prefix><n>` with the smallest `n >= 1` not present in `existing`.
pub fn mint_oid<'a, I>(kind: EntityKind, existing: I) -> Oid
where
    I: IntoIterator<Item = &'a Oid>,
{
    let taken: BTreeSet<&str> = existing.into_iter().map(Oid::as_str).collect();
    let prefix = kind.oid_prefix();
    let mut counter = 1usize;
    loop {
        let candidate = format!("{prefix}{counter}");
        if !taken.contains(candidate.as_str()) {
            return Oid(candidate);
        }
        counter += 1;
    }
}

/// Mint `<prefix><suffix>`, appending `.2`, `.3`, ... until it is unused.
///
/// Keeps OIDs readable for entities that have a natural name, e.g. `IT.AE.AESEV`.
pub fn mint_oid_with_suffix<'a, I>(kind: EntityKind, suffix: &str, existing: I) -> Oid
where
    I: IntoIterator<Item = &'a Oid>,
{
    let taken: BTreeSet<&str> = existing.into_iter().map(Oid::as_str).collect();
    let base = format!("{}{}", kind.oid_prefix(), suffix.trim());
    if !taken.contains(base.as_str()) {
        return Oid(base);
    }
    let mut counter = 2usize;
    loop {
        let candidate = format!("{base}.{counter}");
        if !taken.contains(candidate.as_str()) {
            return Oid(candidate);
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_oid() {
        assert_eq!(
            Oid::new("   "),
            Err(ModelError::InvalidOid("   ".to_string()))
        );
        assert_eq!(Oid::new(" IT.AE.AETERM ").unwrap().as_str(), "IT.AE.AETERM");
    }

    #[test]
    fn mints_smallest_free_counter() {
        let existing = vec![Oid::from("WC.1"), Oid::from("WC.2"), Oid::from("WC.4")];
        assert_eq!(mint_oid(EntityKind::WhereClause, &existing), "WC.3");
        assert_eq!(mint_oid(EntityKind::Comment, &existing), "COM.1");
    }

    #[test]
    fn suffix_minting_appends_counter_on_collision() {
        let existing = vec![Oid::from("IT.AE.AESEV"), Oid::from("IT.AE.AESEV.2")];
        assert_eq!(
            mint_oid_with_suffix(EntityKind::ItemDef, "AE.AESEV", &existing),
            "IT.AE.AESEV.3"
        );
        assert_eq!(
            mint_oid_with_suffix(EntityKind::ItemDef, "AE.AETERM", &existing),
            "IT.AE.AETERM"
        );
    }
}
