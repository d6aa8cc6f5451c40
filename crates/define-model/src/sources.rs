//! Back-reference bookkeeping for shared entities.
//!
//! Comments, methods, where clauses, codelists, value lists and variable
//! definitions can be pointed to by several owners at once. Each of them
//! carries a [`Sources`] value listing every current owner, partitioned by
//! owner type, so that the last release of an entity can be detected without
//! scanning the whole document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::oid::Oid;

/// Owner partition of a [`Sources`] structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    ItemDefs,
    ItemGroups,
    ItemRefs,
    ValueLists,
    CodeLists,
    WhereClauses,
    AnalysisResults,
    ResultDisplays,
    MetaDataVersion,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::ItemDefs => "itemDefs",
            SourceKind::ItemGroups => "itemGroups",
            SourceKind::ItemRefs => "itemRefs",
            SourceKind::ValueLists => "valueLists",
            SourceKind::CodeLists => "codeLists",
            SourceKind::WhereClauses => "whereClauses",
            SourceKind::AnalysisResults => "analysisResults",
            SourceKind::ResultDisplays => "resultDisplays",
            SourceKind::MetaDataVersion => "metaDataVersion",
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "itemDefs" => Ok(SourceKind::ItemDefs),
            "itemGroups" => Ok(SourceKind::ItemGroups),
            "itemRefs" => Ok(SourceKind::ItemRefs),
            "valueLists" => Ok(SourceKind::ValueLists),
            "codeLists" => Ok(SourceKind::CodeLists),
            "whereClauses" => Ok(SourceKind::WhereClauses),
            "analysisResults" => Ok(SourceKind::AnalysisResults),
            "resultDisplays" => Ok(SourceKind::ResultDisplays),
            "metaDataVersion" => Ok(SourceKind::MetaDataVersion),
            _ => Err(format!("Unknown source kind: {s}")),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owners of a shared entity, grouped by owner type.
///
/// Lists keep insertion order. Empty partitions are dropped so that two
/// structurally equal owner sets always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Sources(BTreeMap<SourceKind, Vec<Oid>>);

impl<'de> Deserialize<'de> for Sources {
    /// Unknown partitions are skipped, duplicates and empty lists collapse.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<Oid>>::deserialize(deserializer)?;
        let mut sources = Sources::new();
        for (key, owners) in raw {
            let Ok(kind) = key.parse::<SourceKind>() else {
                continue;
            };
            for owner in owners {
                sources.push(kind, owner);
            }
        }
        Ok(sources)
    }
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources with exactly one owner.
    pub fn single(kind: SourceKind, owner: impl Into<Oid>) -> Self {
        let mut sources = Self::new();
        sources.push(kind, owner);
        sources
    }

    pub fn owners(&self, kind: SourceKind) -> &[Oid] {
        self.0.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: SourceKind, owner: &str) -> bool {
        self.owners(kind).iter().any(|oid| oid.as_str() == owner)
    }

    /// Total number of references across all partitions.
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Append `owner` to the `kind` partition unless it is already present.
    ///
    /// Returns `true` when the owner was added.
    pub fn push(&mut self, kind: SourceKind, owner: impl Into<Oid>) -> bool {
        let owner = owner.into();
        let list = self.0.entry(kind).or_default();
        if list.contains(&owner) {
            return false;
        }
        list.push(owner);
        true
    }

    /// Remove `owner` from the `kind` partition.
    ///
    /// Returns `true` when something was removed.
    pub fn remove(&mut self, kind: SourceKind, owner: &str) -> bool {
        let Some(list) = self.0.get_mut(&kind) else {
            return false;
        };
        let Some(position) = list.iter().position(|oid| oid.as_str() == owner) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            self.0.remove(&kind);
        }
        true
    }

    /// Iterate over `(kind, owner)` edges.
    pub fn edges(&self) -> impl Iterator<Item = (SourceKind, &Oid)> {
        self.0
            .iter()
            .flat_map(|(kind, owners)| owners.iter().map(move |owner| (*kind, owner)))
    }
}

/// Entities that carry a [`Sources`] back-reference structure.
pub trait Referenced {
    fn sources(&self) -> &Sources;
    fn sources_mut(&mut self) -> &mut Sources;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_presence_checked() {
        let mut sources = Sources::new();
        assert!(sources.push(SourceKind::ValueLists, "VL.A"));
        assert!(!sources.push(SourceKind::ValueLists, "VL.A"));
        assert!(sources.push(SourceKind::ValueLists, "VL.B"));
        assert_eq!(sources.owners(SourceKind::ValueLists), ["VL.A", "VL.B"]);
        assert_eq!(sources.total(), 2);
    }

    #[test]
    fn remove_drops_empty_partition() {
        let mut sources = Sources::single(SourceKind::ItemDefs, "IT.DM.SEX");
        assert!(!sources.remove(SourceKind::ItemGroups, "IT.DM.SEX"));
        assert!(sources.remove(SourceKind::ItemDefs, "IT.DM.SEX"));
        assert!(sources.is_empty());
        assert_eq!(sources, Sources::new());
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut sources = Sources::single(SourceKind::ValueLists, "VL.LB.LBORRES");
        sources.push(SourceKind::AnalysisResults, "AR.1");
        let json = serde_json::to_string(&sources).expect("serialize sources");
        assert_eq!(
            json,
            r#"{"valueLists":["VL.LB.LBORRES"],"analysisResults":["AR.1"]}"#
        );
        let round: Sources = serde_json::from_str(&json).expect("deserialize sources");
        assert_eq!(round, sources);
    }

    #[test]
    fn deserialize_normalizes_raw_partitions() {
        let raw = r#"{"itemDefs":[],"valueLists":["VL.A","VL.A"],"standards":["STD.1"]}"#;
        let sources: Sources = serde_json::from_str(raw).expect("deserialize sources");
        assert_eq!(sources, Sources::single(SourceKind::ValueLists, "VL.A"));
    }
}
