//! Normalization applied before a document is written out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use define_model::{DefineDocument, DefineVersion, Oid, VariableScope};

use crate::engine::Editor;
use crate::error::Result;
use crate::reference::ReferencePolicy;

/// Settings of the pre-save pass, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SaveOptions {
    /// Define-XML version to write. `None` keeps the version of the document.
    pub target_version: Option<DefineVersion>,
    /// Delete codelists no variable refers to.
    pub remove_unused_code_lists: bool,
    /// Recompute `length` of variables flagged to take it from their codelist.
    pub derive_code_list_lengths: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            target_version: None,
            remove_unused_code_lists: false,
            derive_code_list_lengths: true,
        }
    }
}

/// What the pre-save pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub define_version: DefineVersion,
    pub removed_item_groups: Vec<Oid>,
    pub removed_item_refs: Vec<(VariableScope, Oid)>,
    pub removed_code_lists: Vec<Oid>,
    pub updated_lengths: Vec<Oid>,
}

impl SaveSummary {
    pub fn is_empty(&self) -> bool {
        self.removed_item_groups.is_empty()
            && self.removed_item_refs.is_empty()
            && self.removed_code_lists.is_empty()
            && self.updated_lengths.is_empty()
    }
}

/// Normalize a copy of `document` for writing and stamp it with `now`.
pub fn prepare_for_save(
    document: &DefineDocument,
    options: &SaveOptions,
    now: DateTime<Utc>,
) -> Result<(DefineDocument, SaveSummary)> {
    let mut document = document.clone();
    let summary = {
        let mut editor = Editor::new(&mut document.meta_data_version, ReferencePolicy::default());
        normalize(&mut editor, options)?
    };
    document.creation_date_time = Some(now);
    Ok((document, summary))
}

/// Version-specific cleanup, unused codelist removal and length derivation.
pub(crate) fn normalize(editor: &mut Editor<'_>, options: &SaveOptions) -> Result<SaveSummary> {
    let target = options
        .target_version
        .unwrap_or(editor.mdv().define_version);
    let mut summary = SaveSummary {
        define_version: target,
        ..SaveSummary::default()
    };

    if !target.allows_has_no_data() {
        remove_has_no_data(editor, &mut summary)?;
    }

    if options.remove_unused_code_lists {
        let unused: Vec<Oid> = editor
            .mdv()
            .code_lists
            .values()
            .filter(|code_list| code_list.sources.is_empty())
            .map(|code_list| code_list.oid.clone())
            .collect();
        editor.delete_code_lists(&unused)?;
        summary.removed_code_lists = unused;
    }

    if options.derive_code_list_lengths {
        summary.updated_lengths = derive_lengths(editor);
    }

    editor.mdv_mut().define_version = target;
    info!(
        define_version = %target,
        removed_item_groups = summary.removed_item_groups.len(),
        removed_item_refs = summary.removed_item_refs.len(),
        removed_code_lists = summary.removed_code_lists.len(),
        updated_lengths = summary.updated_lengths.len(),
        "document prepared for save"
    );
    Ok(summary)
}

/// Define-XML 2.0 has no `def:HasNoData`: datasets and variables flagged
/// with it are deleted through the regular cascades.
fn remove_has_no_data(editor: &mut Editor<'_>, summary: &mut SaveSummary) -> Result<()> {
    let groups: Vec<Oid> = editor
        .mdv()
        .item_group_order
        .iter()
        .filter(|oid| editor.mdv().item_groups.get(*oid).is_some_and(|group| group.has_no_data))
        .cloned()
        .collect();
    editor.delete_item_groups(&groups)?;
    summary.removed_item_groups = groups;

    let flagged: Vec<(VariableScope, Oid)> = editor
        .mdv()
        .all_item_refs()
        .into_iter()
        .filter(|(_, _, item_ref)| item_ref.has_no_data)
        .map(|(scope, oid, _)| (scope, oid.clone()))
        .collect();
    for (scope, item_ref_oid) in flagged {
        // An earlier deletion may already have taken the value list along.
        let still_present = editor
            .mdv()
            .item_refs_in(&scope)
            .is_some_and(|refs| refs.contains_key(&item_ref_oid));
        if still_present {
            editor.delete_variables(&scope, std::slice::from_ref(&item_ref_oid))?;
            summary.removed_item_refs.push((scope, item_ref_oid));
        }
    }
    Ok(())
}

fn derive_lengths(editor: &mut Editor<'_>) -> Vec<Oid> {
    let updates: Vec<(Oid, u32)> = editor
        .mdv()
        .item_defs
        .values()
        .filter(|item_def| item_def.length_as_code_list)
        .filter_map(|item_def| {
            let code_list = editor.mdv().code_lists.get(item_def.code_list_oid.as_ref()?)?;
            let width = code_list.max_coded_value_width()?;
            (item_def.length != Some(width)).then(|| (item_def.oid.clone(), width))
        })
        .collect();
    let mdv = editor.mdv_mut();
    updates
        .into_iter()
        .filter_map(|(oid, width)| {
            let item_def = mdv.item_defs.get_mut(&oid)?;
            item_def.length = Some(width);
            Some(oid)
        })
        .collect()
}
