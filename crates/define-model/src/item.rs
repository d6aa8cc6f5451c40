//! Datasets, value lists and variable definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::oid::Oid;
use crate::sources::{Referenced, Sources};
use crate::text::TranslatedText;

/// Define-XML data types for ItemDef and CodeList.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    #[default]
    Text,
    Integer,
    Float,
    Date,
    Datetime,
    Time,
    PartialDate,
    PartialTime,
    PartialDatetime,
    IncompleteDatetime,
    DurationDatetime,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
            DataType::Time => "time",
            DataType::PartialDate => "partialDate",
            DataType::PartialTime => "partialTime",
            DataType::PartialDatetime => "partialDatetime",
            DataType::IncompleteDatetime => "incompleteDatetime",
            DataType::DurationDatetime => "durationDatetime",
        }
    }

    /// Types for which Define-XML requires a Length attribute.
    pub fn requires_length(&self) -> bool {
        matches!(self, DataType::Text | DataType::Integer | DataType::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "text" => Ok(DataType::Text),
            "integer" => Ok(DataType::Integer),
            "float" => Ok(DataType::Float),
            "date" => Ok(DataType::Date),
            "datetime" => Ok(DataType::Datetime),
            "time" => Ok(DataType::Time),
            "partialdate" => Ok(DataType::PartialDate),
            "partialtime" => Ok(DataType::PartialTime),
            "partialdatetime" => Ok(DataType::PartialDatetime),
            "incompletedatetime" => Ok(DataType::IncompleteDatetime),
            "durationdatetime" => Ok(DataType::DurationDatetime),
            _ => Err(format!("Unknown data type: {s}")),
        }
    }
}

/// Reference from a dataset or value list to a variable definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRef {
    pub item_oid: Oid,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_oid: Option<Oid>,
    /// Only set for value-level item refs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_clause_oid: Option<Oid>,
    pub has_no_data: bool,
}

impl ItemRef {
    pub fn new(item_oid: impl Into<Oid>) -> Self {
        Self {
            item_oid: item_oid.into(),
            ..Self::default()
        }
    }
}

/// Shared shape of datasets and value lists: an ordered set of item refs.
pub trait ItemRefContainer {
    fn item_refs(&self) -> &BTreeMap<Oid, ItemRef>;
    fn item_ref_order(&self) -> &[Oid];

    /// Item refs in display order.
    fn ordered_item_refs(&self) -> Vec<(&Oid, &ItemRef)> {
        self.item_ref_order()
            .iter()
            .filter_map(|oid| self.item_refs().get_key_value(oid.as_str()))
            .collect()
    }

    /// Whether any item ref other than `except` points at `item_def_oid`.
    fn references_item_def(&self, item_def_oid: &str, except: Option<&str>) -> bool {
        self.item_refs()
            .iter()
            .any(|(oid, item_ref)| Some(oid.as_str()) != except && item_ref.item_oid == item_def_oid)
    }
}

/// A dataset (`ItemGroupDef`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemGroup {
    pub oid: Oid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
    pub descriptions: Vec<TranslatedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_oid: Option<Oid>,
    pub is_reference_data: bool,
    pub repeating: bool,
    /// Define-XML 2.1 `def:HasNoData`.
    pub has_no_data: bool,
    pub item_refs: BTreeMap<Oid, ItemRef>,
    pub item_ref_order: Vec<Oid>,
    /// Key variables, a subset of `item_ref_order`.
    pub key_order: Vec<Oid>,
}

impl ItemGroup {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

impl ItemRefContainer for ItemGroup {
    fn item_refs(&self) -> &BTreeMap<Oid, ItemRef> {
        &self.item_refs
    }

    fn item_ref_order(&self) -> &[Oid] {
        &self.item_ref_order
    }
}

/// Value-level metadata container attached to one or more variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueList {
    pub oid: Oid,
    pub item_refs: BTreeMap<Oid, ItemRef>,
    pub item_ref_order: Vec<Oid>,
    pub sources: Sources,
}

impl ValueList {
    pub fn new(oid: impl Into<Oid>) -> Self {
        Self {
            oid: oid.into(),
            ..Self::default()
        }
    }

    /// Whether an item ref other than `except` still uses `where_clause_oid`.
    pub fn uses_where_clause(&self, where_clause_oid: &str, except: Option<&str>) -> bool {
        self.item_refs.iter().any(|(oid, item_ref)| {
            Some(oid.as_str()) != except
                && item_ref
                    .where_clause_oid
                    .as_ref()
                    .is_some_and(|wc| wc == where_clause_oid)
        })
    }
}

impl ItemRefContainer for ValueList {
    fn item_refs(&self) -> &BTreeMap<Oid, ItemRef> {
        &self.item_refs
    }

    fn item_ref_order(&self) -> &[Oid] {
        &self.item_ref_order
    }
}

impl Referenced for ValueList {
    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn sources_mut(&mut self) -> &mut Sources {
        &mut self.sources
    }
}

/// A variable definition (`ItemDef`).
///
/// Item defs are shared: several datasets or value lists may reference the
/// same definition, which is recorded in `sources.itemGroups` and
/// `sources.valueLists`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemDef {
    pub oid: Oid,
    pub name: String,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction_digits: Option<u32>,
    pub descriptions: Vec<TranslatedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_oid: Option<Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_list_oid: Option<Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_list_oid: Option<Oid>,
    /// Set on value-level item defs: the variable whose value list holds them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_item_def_oid: Option<Oid>,
    /// Derive `length` from the longest coded value of the codelist on save.
    pub length_as_code_list: bool,
    pub sources: Sources,
}

impl ItemDef {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            data_type,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.descriptions = vec![TranslatedText::new(label)];
        self
    }

    pub fn label(&self) -> Option<&str> {
        crate::text::first_text(&self.descriptions)
    }
}

impl Referenced for ItemDef {
    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn sources_mut(&mut self) -> &mut Sources {
        &mut self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_parses_case_insensitively() {
        assert_eq!("partialDate".parse::<DataType>(), Ok(DataType::PartialDate));
        assert_eq!(" TEXT ".parse::<DataType>(), Ok(DataType::Text));
        assert!("blob".parse::<DataType>().is_err());
    }

    #[test]
    fn ordered_item_refs_follow_order_list() {
        let mut group = ItemGroup::new("IG.AE", "AE");
        for (ir, item) in [("IR.2", "IT.AE.AETERM"), ("IR.1", "IT.AE.STUDYID")] {
            group.item_refs.insert(Oid::from(ir), ItemRef::new(item));
        }
        group.item_ref_order = vec![Oid::from("IR.2"), Oid::from("IR.1")];
        let names: Vec<&str> = group
            .ordered_item_refs()
            .into_iter()
            .map(|(_, item_ref)| item_ref.item_oid.as_str())
            .collect();
        assert_eq!(names, ["IT.AE.AETERM", "IT.AE.STUDYID"]);
    }
}
