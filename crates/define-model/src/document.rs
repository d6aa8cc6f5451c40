use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::arm::AnalysisResultDisplays;
use crate::code_list::CodeList;
use crate::item::{ItemDef, ItemGroup, ItemRef, ItemRefContainer, ValueList};
use crate::oid::Oid;
use crate::shared::{Comment, Method, WhereClause};

/// Define-XML schema version of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DefineVersion {
    #[default]
    #[serde(rename = "2.0.0")]
    V2_0,
    #[serde(rename = "2.1.0")]
    V2_1,
}

impl DefineVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefineVersion::V2_0 => "2.0.0",
            DefineVersion::V2_1 => "2.1.0",
        }
    }

    /// `def:HasNoData` only exists from Define-XML 2.1 on.
    pub fn allows_has_no_data(&self) -> bool {
        matches!(self, DefineVersion::V2_1)
    }
}

impl fmt::Display for DefineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefineVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2.0" | "2.0.0" => Ok(DefineVersion::V2_0),
            "2.1" | "2.1.0" => Ok(DefineVersion::V2_1),
            other => Err(ModelError::UnknownDefineVersion(other.to_string())),
        }
    }
}

/// Where a variable lives: directly in a dataset or in a value list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableScope {
    ItemGroup(Oid),
    ValueList(Oid),
}

impl VariableScope {
    pub fn oid(&self) -> &Oid {
        match self {
            VariableScope::ItemGroup(oid) | VariableScope::ValueList(oid) => oid,
        }
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableScope::ItemGroup(oid) => write!(f, "item group {oid}"),
            VariableScope::ValueList(oid) => write!(f, "value list {oid}"),
        }
    }
}

/// The document aggregate: every entity map plus the order lists that
/// define display and serialization order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaDataVersion {
    pub oid: Oid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub define_version: DefineVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_oid: Option<Oid>,
    pub item_groups: BTreeMap<Oid, ItemGroup>,
    pub item_group_order: Vec<Oid>,
    pub item_defs: BTreeMap<Oid, ItemDef>,
    pub code_lists: BTreeMap<Oid, CodeList>,
    pub code_list_order: Vec<Oid>,
    pub value_lists: BTreeMap<Oid, ValueList>,
    pub where_clauses: BTreeMap<Oid, WhereClause>,
    pub comments: BTreeMap<Oid, Comment>,
    pub methods: BTreeMap<Oid, Method>,
    #[serde(skip_serializing_if = "AnalysisResultDisplays::is_empty")]
    pub analysis_result_displays: AnalysisResultDisplays,
}

impl MetaDataVersion {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Item refs of a dataset or value list.
    pub fn item_refs_in(&self, scope: &VariableScope) -> Option<&BTreeMap<Oid, ItemRef>> {
        match scope {
            VariableScope::ItemGroup(oid) => self.item_groups.get(oid.as_str()).map(|ig| &ig.item_refs),
            VariableScope::ValueList(oid) => self.value_lists.get(oid.as_str()).map(|vl| &vl.item_refs),
        }
    }

    /// Every item ref OID in the document, datasets and value lists alike.
    pub fn item_ref_oids(&self) -> Vec<&Oid> {
        self.item_groups
            .values()
            .flat_map(|ig| ig.item_refs.keys())
            .chain(self.value_lists.values().flat_map(|vl| vl.item_refs.keys()))
            .collect()
    }

    /// Every `(scope, item ref OID, item ref)` triple in the document.
    pub fn all_item_refs(&self) -> Vec<(VariableScope, &Oid, &ItemRef)> {
        let mut refs = Vec::new();
        for (ig_oid, group) in &self.item_groups {
            for (oid, item_ref) in group.item_refs() {
                refs.push((VariableScope::ItemGroup(ig_oid.clone()), oid, item_ref));
            }
        }
        for (vl_oid, value_list) in &self.value_lists {
            for (oid, item_ref) in value_list.item_refs() {
                refs.push((VariableScope::ValueList(vl_oid.clone()), oid, item_ref));
            }
        }
        refs
    }

    /// Dataset whose name matches `name` case-insensitively.
    pub fn item_group_by_name(&self, name: &str) -> Option<&ItemGroup> {
        self.item_groups
            .values()
            .find(|group| group.name.eq_ignore_ascii_case(name))
    }
}

/// ODM envelope around a MetaDataVersion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefineDocument {
    pub file_oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date_time: Option<DateTime<Utc>>,
    pub study_oid: String,
    pub study_name: String,
    pub meta_data_version: MetaDataVersion,
}

impl DefineDocument {
    pub fn new(study_oid: impl Into<String>, meta_data_version: MetaDataVersion) -> Self {
        let study_oid = study_oid.into();
        Self {
            file_oid: format!("{study_oid}.Define-XML_{}", meta_data_version.define_version),
            study_name: study_oid.clone(),
            study_oid,
            creation_date_time: None,
            meta_data_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_version_round_trips_through_strings() {
        assert_eq!("2.1".parse::<DefineVersion>(), Ok(DefineVersion::V2_1));
        assert_eq!("2.0.0".parse::<DefineVersion>(), Ok(DefineVersion::V2_0));
        assert_eq!(
            "3.0".parse::<DefineVersion>(),
            Err(ModelError::UnknownDefineVersion("3.0".to_string()))
        );
        assert!(!DefineVersion::V2_0.allows_has_no_data());
        assert!(DefineVersion::V2_1.allows_has_no_data());
    }

    #[test]
    fn scope_serializes_externally_tagged() {
        let scope = VariableScope::ValueList(Oid::from("VL.LB.LBORRES"));
        let json = serde_json::to_string(&scope).expect("serialize scope");
        assert_eq!(json, r#"{"valueList":"VL.LB.LBORRES"}"#);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let raw = r#"{"oid":"MDV.1","itemGroups":{"IG.DM":{"oid":"IG.DM","name":"DM"}}}"#;
        let mdv: MetaDataVersion = serde_json::from_str(raw).expect("deserialize mdv");
        assert_eq!(mdv.define_version, DefineVersion::V2_0);
        let group = &mdv.item_groups["IG.DM"];
        assert!(group.item_refs.is_empty());
        assert!(!group.has_no_data);
        assert!(mdv.analysis_result_displays.is_empty());
    }
}
