//! Analysis Results Metadata (ARM) subgraph.
//!
//! Result displays list analysis results through `analysis_result_order`;
//! analysis results live in one flat map and point back at their display
//! through `sources.resultDisplays`. Analysis datasets reference datasets and
//! where clauses of the main document by OID.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::oid::Oid;
use crate::sources::{Referenced, Sources};
use crate::text::{DocumentRef, TranslatedText};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResultDisplays {
    pub result_displays: BTreeMap<Oid, ResultDisplay>,
    pub result_display_order: Vec<Oid>,
    pub analysis_results: BTreeMap<Oid, AnalysisResult>,
}

impl AnalysisResultDisplays {
    pub fn is_empty(&self) -> bool {
        self.result_displays.is_empty() && self.analysis_results.is_empty()
    }

    /// Display whose `analysis_result_order` lists `analysis_result_oid`.
    pub fn display_of(&self, analysis_result_oid: &str) -> Option<&Oid> {
        self.result_display_order
            .iter()
            .chain(self.result_displays.keys())
            .find(|oid| {
                self.result_displays.get(oid.as_str()).is_some_and(|display| {
                    display
                        .analysis_result_order
                        .iter()
                        .any(|ar| ar == analysis_result_oid)
                })
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultDisplay {
    pub oid: Oid,
    pub name: String,
    pub descriptions: Vec<TranslatedText>,
    pub documents: Vec<DocumentRef>,
    pub analysis_result_order: Vec<Oid>,
}

impl ResultDisplay {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Dataset used by an analysis result, optionally subset by a where clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisDataset {
    pub item_group_oid: Oid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_clause_oid: Option<Oid>,
    pub analysis_variable_oids: Vec<Oid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub oid: Oid,
    pub descriptions: Vec<TranslatedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_oid: Option<Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_purpose: Option<String>,
    /// Keyed by the dataset (ItemGroup) OID.
    pub analysis_datasets: BTreeMap<Oid, AnalysisDataset>,
    pub analysis_dataset_order: Vec<Oid>,
    /// Comment attached to the `def:AnalysisDatasets` element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_datasets_comment_oid: Option<Oid>,
    pub sources: Sources,
}

impl AnalysisResult {
    pub fn new(oid: impl Into<Oid>, description: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            descriptions: vec![TranslatedText::new(description)],
            ..Self::default()
        }
    }

    /// Whether a dataset other than `except` still uses `where_clause_oid`.
    pub fn uses_where_clause(&self, where_clause_oid: &str, except: Option<&str>) -> bool {
        self.analysis_datasets.iter().any(|(oid, dataset)| {
            Some(oid.as_str()) != except
                && dataset
                    .where_clause_oid
                    .as_ref()
                    .is_some_and(|wc| wc == where_clause_oid)
        })
    }
}

impl Referenced for AnalysisResult {
    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn sources_mut(&mut self) -> &mut Sources {
        &mut self.sources
    }
}
