//! Codelists and their coded values.
//!
//! A codelist is either *decoded* (coded value plus decode text), *enumerated*
//! (coded values only) or *external* (a reference to a dictionary such as
//! MedDRA). An enumerated and a decoded codelist may be linked to each other,
//! in which case the enumerated one mirrors the coded values of its partner.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::DataType;
use crate::oid::Oid;
use crate::sources::{Referenced, Sources};
use crate::text::TranslatedText;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodeListType {
    #[default]
    Decoded,
    Enumerated,
    External,
}

impl CodeListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeListType::Decoded => "decoded",
            CodeListType::Enumerated => "enumerated",
            CodeListType::External => "external",
        }
    }
}

impl fmt::Display for CodeListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded value with its decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeListItem {
    pub coded_value: String,
    pub decodes: Vec<TranslatedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
    /// Sponsor extension of an extensible controlled terminology codelist.
    pub extended_value: bool,
}

/// A coded value without decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnumeratedItem {
    pub coded_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
    pub extended_value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalCodeList {
    pub dictionary: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeList {
    pub oid: Oid,
    pub name: String,
    pub data_type: DataType,
    pub code_list_type: CodeListType,
    pub code_list_items: BTreeMap<Oid, CodeListItem>,
    pub enumerated_items: BTreeMap<Oid, EnumeratedItem>,
    /// Display order of whichever item map matches `code_list_type`.
    pub item_order: Vec<Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_code_list: Option<ExternalCodeList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_code_list_oid: Option<Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_oid: Option<Oid>,
    pub sources: Sources,
}

impl CodeList {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>, code_list_type: CodeListType) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            code_list_type,
            ..Self::default()
        }
    }

    /// Coded values in `item_order`.
    pub fn coded_values(&self) -> Vec<&str> {
        self.item_order
            .iter()
            .filter_map(|oid| match self.code_list_type {
                CodeListType::Decoded => self
                    .code_list_items
                    .get(oid.as_str())
                    .map(|item| item.coded_value.as_str()),
                CodeListType::Enumerated => self
                    .enumerated_items
                    .get(oid.as_str())
                    .map(|item| item.coded_value.as_str()),
                CodeListType::External => None,
            })
            .collect()
    }

    /// OIDs of the item map that `item_order` indexes.
    pub fn item_keys(&self) -> Vec<&Oid> {
        match self.code_list_type {
            CodeListType::Decoded => self.code_list_items.keys().collect(),
            CodeListType::Enumerated => self.enumerated_items.keys().collect(),
            CodeListType::External => Vec::new(),
        }
    }

    /// Longest coded value in UTF-8 bytes, `None` when the codelist is empty.
    pub fn max_coded_value_width(&self) -> Option<u32> {
        self.coded_values()
            .into_iter()
            .map(|value| u32::try_from(value.len()).unwrap_or(u32::MAX))
            .max()
    }
}

impl Referenced for CodeList {
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

    fn severity() -> CodeList {
        let mut code_list = CodeList::new("CL.SEVERITY", "Severity", CodeListType::Decoded);
        for (oid, value) in [("CLI.1", "MILD"), ("CLI.2", "MODERATE"), ("CLI.3", "SEVERE")] {
            code_list.code_list_items.insert(
                Oid::from(oid),
                CodeListItem {
                    coded_value: value.to_string(),
                    ..CodeListItem::default()
                },
            );
            code_list.item_order.push(Oid::from(oid));
        }
        code_list
    }

    #[test]
    fn coded_values_follow_item_order() {
        let mut code_list = severity();
        code_list.item_order.reverse();
        assert_eq!(code_list.coded_values(), ["SEVERE", "MODERATE", "MILD"]);
    }

    #[test]
    fn max_width_uses_encoded_bytes() {
        let mut code_list = severity();
        assert_eq!(code_list.max_coded_value_width(), Some(8));
        code_list.code_list_items.insert(
            Oid::from("CLI.4"),
            CodeListItem {
                coded_value: "ÄÖÜÄÖ".to_string(),
                ..CodeListItem::default()
            },
        );
        code_list.item_order.push(Oid::from("CLI.4"));
        assert_eq!(code_list.max_coded_value_width(), Some(10));
    }

    #[test]
    fn external_codelist_has_no_width() {
        let code_list = CodeList::new("CL.MEDDRA", "MedDRA", CodeListType::External);
        assert_eq!(code_list.max_coded_value_width(), None);
    }
}
