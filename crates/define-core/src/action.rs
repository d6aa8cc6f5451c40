//! Edit actions understood by the mutation engine.
//!
//! Actions are plain data: they serialize as `{"type": "DEL_VARS", ...}` so an
//! editing session can be stored or replayed as a JSON script.

use serde::{Deserialize, Serialize};

use define_model::{
    CodeList, CodeListItem, CodeListType, Comment, DataType, EntityKind, Method, Oid, RangeCheck,
    TranslatedText, VariableScope, WhereClause, mint_oid,
};

use crate::copy::CopiedAnalysisResults;
use crate::save::SaveOptions;

/// One user edit of a MetaDataVersion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Remove variables from a dataset or a value list.
    #[serde(rename = "DEL_VARS", rename_all = "camelCase")]
    DeleteVariables {
        scope: VariableScope,
        item_ref_oids: Vec<Oid>,
    },

    /// Remove datasets with their variables, value-level metadata and
    /// analysis datasets.
    #[serde(rename = "DEL_ITEMGROUPS", rename_all = "camelCase")]
    DeleteItemGroups { item_group_oids: Vec<Oid> },

    /// Rename or relabel a value-level variable and change its where clause.
    #[serde(rename = "UPD_NAMELABELWHERECLAUSE", rename_all = "camelCase")]
    UpdateNameLabelWhereClause {
        value_list_oid: Oid,
        item_ref_oid: Oid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        /// `None` detaches the current where clause.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        where_clause: Option<WhereClause>,
    },

    /// Attach a new value list with one value-level variable to a variable.
    #[serde(rename = "ADD_VALUELIST", rename_all = "camelCase")]
    AddValueList {
        item_oid: Oid,
        #[serde(default)]
        range_checks: Vec<RangeCheck>,
    },

    /// Insert a value-level variable into an existing value list.
    #[serde(rename = "ADD_VALLVL", rename_all = "camelCase")]
    AddValueLevel {
        value_list_oid: Oid,
        #[serde(default)]
        range_checks: Vec<RangeCheck>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },

    /// Normalize the document before it is written out.
    #[serde(rename = "PREPARE_FOR_SAVE", rename_all = "camelCase")]
    PrepareForSave {
        #[serde(default)]
        options: SaveOptions,
    },

    #[serde(rename = "ADD_ITEMGROUP", rename_all = "camelCase")]
    AddItemGroup {
        item_group: NewItemGroup,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },

    /// Insert variables into a dataset, either new or reusing an existing
    /// definition.
    #[serde(rename = "ADD_VARS", rename_all = "camelCase")]
    AddVariables {
        item_group_oid: Oid,
        variables: Vec<NewVariable>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },

    /// Set, replace or remove the comment of a variable and the method of
    /// its item ref.
    #[serde(rename = "UPD_ITEMDESCRIPTION", rename_all = "camelCase")]
    UpdateItemDescription {
        scope: VariableScope,
        item_ref_oid: Oid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<Comment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<Method>,
    },

    #[serde(rename = "UPD_ITEMGROUPCOMMENT", rename_all = "camelCase")]
    UpdateItemGroupComment {
        item_group_oid: Oid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<Comment>,
    },

    /// Link a codelist to a variable, or unlink it with `None`.
    #[serde(rename = "UPD_ITEMCODELIST", rename_all = "camelCase")]
    UpdateItemCodeList {
        item_oid: Oid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code_list_oid: Option<Oid>,
    },

    /// Add a codelist. A blank OID is minted.
    #[serde(rename = "ADD_CODELIST", rename_all = "camelCase")]
    AddCodeList {
        code_list: CodeList,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },

    #[serde(rename = "DEL_CODELISTS", rename_all = "camelCase")]
    DeleteCodeLists { code_list_oids: Vec<Oid> },

    /// Pair an enumerated codelist with a decoded one.
    #[serde(rename = "LINK_CODELISTS", rename_all = "camelCase")]
    LinkCodeLists {
        enumerated_oid: Oid,
        decoded_oid: Oid,
    },

    #[serde(rename = "UNLINK_CODELIST", rename_all = "camelCase")]
    UnlinkCodeList { code_list_oid: Oid },

    #[serde(rename = "ADD_RESULTDISPLAY", rename_all = "camelCase")]
    AddResultDisplay {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },

    #[serde(rename = "DEL_RESULTDISPLAYS", rename_all = "camelCase")]
    DeleteResultDisplays { result_display_oids: Vec<Oid> },

    #[serde(rename = "DEL_ANALYSISRESULTS", rename_all = "camelCase")]
    DeleteAnalysisResults { analysis_result_oids: Vec<Oid> },

    /// Merge analysis results produced by
    /// [`copy_analysis_results`](crate::copy::copy_analysis_results) into a
    /// result display.
    #[serde(rename = "ADD_ANALYSISRESULTS", rename_all = "camelCase")]
    AddAnalysisResults {
        result_display_oid: Oid,
        results: CopiedAnalysisResults,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },
}

impl Action {
    /// Wire name of the action.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::DeleteVariables { .. } => "DEL_VARS",
            Action::DeleteItemGroups { .. } => "DEL_ITEMGROUPS",
            Action::UpdateNameLabelWhereClause { .. } => "UPD_NAMELABELWHERECLAUSE",
            Action::AddValueList { .. } => "ADD_VALUELIST",
            Action::AddValueLevel { .. } => "ADD_VALLVL",
            Action::PrepareForSave { .. } => "PREPARE_FOR_SAVE",
            Action::AddItemGroup { .. } => "ADD_ITEMGROUP",
            Action::AddVariables { .. } => "ADD_VARS",
            Action::UpdateItemDescription { .. } => "UPD_ITEMDESCRIPTION",
            Action::UpdateItemGroupComment { .. } => "UPD_ITEMGROUPCOMMENT",
            Action::UpdateItemCodeList { .. } => "UPD_ITEMCODELIST",
            Action::AddCodeList { .. } => "ADD_CODELIST",
            Action::DeleteCodeLists { .. } => "DEL_CODELISTS",
            Action::LinkCodeLists { .. } => "LINK_CODELISTS",
            Action::UnlinkCodeList { .. } => "UNLINK_CODELIST",
            Action::AddResultDisplay { .. } => "ADD_RESULTDISPLAY",
            Action::DeleteResultDisplays { .. } => "DEL_RESULTDISPLAYS",
            Action::DeleteAnalysisResults { .. } => "DEL_ANALYSISRESULTS",
            Action::AddAnalysisResults { .. } => "ADD_ANALYSISRESULTS",
        }
    }
}

/// Attributes of a dataset created by `ADD_ITEMGROUP`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewItemGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
    pub is_reference_data: bool,
    pub repeating: bool,
}

/// A variable inserted by `ADD_VARS`.
///
/// With `existing_item_oid` set, the item ref points at that definition and
/// the remaining definition fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewVariable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_item_oid: Option<Oid>,
}

impl NewVariable {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Self::default()
        }
    }

    pub fn reusing(item_oid: impl Into<Oid>) -> Self {
        Self {
            existing_item_oid: Some(item_oid.into()),
            ..Self::default()
        }
    }
}

/// Codelist template for `ADD_CODELIST` built from coded value/decode pairs.
pub fn decoded_code_list<'a>(
    name: &str,
    data_type: DataType,
    values: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> CodeList {
    let mut code_list = CodeList::new(Oid::default(), name, CodeListType::Decoded);
    code_list.data_type = data_type;
    for (coded_value, decode) in values {
        let item_oid = mint_oid(EntityKind::CodeListItem, code_list.code_list_items.keys());
        code_list.code_list_items.insert(
            item_oid.clone(),
            CodeListItem {
                coded_value: coded_value.to_string(),
                decodes: vec![TranslatedText::new(decode)],
                ..CodeListItem::default()
            },
        );
        code_list.item_order.push(item_oid);
    }
    code_list
}
