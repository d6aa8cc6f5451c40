//! Dataset edits: `ADD_ITEMGROUP`, `DEL_ITEMGROUPS` and `UPD_ITEMGROUPCOMMENT`.

use std::collections::BTreeSet;
use std::mem;

use tracing::debug;

use define_model::{Comment, EntityKind, ItemGroup, Oid, SourceKind, TranslatedText, mint_oid_with_suffix};

use super::{Editor, insert_at};
use crate::action::NewItemGroup;
use crate::error::{DefineError, Result};

impl Editor<'_> {
    pub(crate) fn add_item_group(&mut self, new: &NewItemGroup, position: Option<usize>) -> Oid {
        let oid = mint_oid_with_suffix(EntityKind::ItemGroup, &new.name, self.mdv.item_groups.keys());
        let mut group = ItemGroup::new(oid.clone(), new.name.clone());
        group.domain = new.domain.clone();
        group.purpose = new.purpose.clone();
        group.structure = new.structure.clone();
        group.is_reference_data = new.is_reference_data;
        group.repeating = new.repeating;
        if let Some(label) = &new.label {
            group.descriptions = vec![TranslatedText::new(label.clone())];
        }
        self.mdv.item_groups.insert(oid.clone(), group);
        insert_at(&mut self.mdv.item_group_order, position, oid.clone());
        debug!(item_group_oid = %oid, "dataset added");
        oid
    }

    /// Delete datasets with the full cascade: every variable of the dataset,
    /// the value lists of variables that lost their last owner, the where
    /// clauses of those value lists, the dataset comment and the analysis
    /// datasets built on the dataset.
    pub(crate) fn delete_item_groups(&mut self, item_group_oids: &[Oid]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for item_group_oid in item_group_oids {
            if !seen.insert(item_group_oid) {
                continue;
            }
            let mut group = self
                .mdv
                .item_groups
                .remove(item_group_oid)
                .ok_or_else(|| DefineError::missing(EntityKind::ItemGroup, item_group_oid))?;
            self.mdv.item_group_order.retain(|oid| oid != item_group_oid);
            debug!(%item_group_oid, variables = group.item_refs.len(), "dataset deleted");

            let item_refs = mem::take(&mut group.item_refs);
            self.release_item_refs(SourceKind::ItemGroups, item_group_oid, item_refs);
            if let Some(comment_oid) = &group.comment_oid {
                self.release_comment(comment_oid, SourceKind::ItemGroups, item_group_oid);
            }
            self.drop_analysis_datasets(item_group_oid);
        }
        Ok(())
    }

    /// Remove analysis datasets over a deleted dataset, releasing the where
    /// clauses they no longer use.
    fn drop_analysis_datasets(&mut self, item_group_oid: &Oid) {
        let mut released = Vec::new();
        for (result_oid, result) in &mut self.mdv.analysis_result_displays.analysis_results {
            let Some(dataset) = result.analysis_datasets.remove(item_group_oid) else {
                continue;
            };
            result.analysis_dataset_order.retain(|oid| oid != item_group_oid);
            if let Some(where_clause_oid) = dataset.where_clause_oid
                && !result.uses_where_clause(&where_clause_oid, None)
            {
                released.push((where_clause_oid, result_oid.clone()));
            }
        }
        for (where_clause_oid, result_oid) in released {
            debug!(%item_group_oid, %result_oid, "analysis dataset removed");
            self.release_where_clause(&where_clause_oid, SourceKind::AnalysisResults, &result_oid);
        }
    }

    pub(crate) fn update_item_group_comment(&mut self, item_group_oid: &Oid, comment: Option<&Comment>) -> Result<()> {
        let current = self
            .mdv
            .item_groups
            .get(item_group_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ItemGroup, item_group_oid))?
            .comment_oid
            .clone();
        let comment_oid = self.assign_comment(current.as_ref(), comment, SourceKind::ItemGroups, item_group_oid);
        if let Some(group) = self.mdv.item_groups.get_mut(item_group_oid) {
            group.comment_oid = comment_oid;
        }
        Ok(())
    }
}
