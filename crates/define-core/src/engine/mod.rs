//! Graph mutation engine.
//!
//! [`apply_action`] turns `(state, action)` into a new state. The input state
//! is never modified: the action runs against a private copy that replaces
//! the input only when its content actually changed, so collaborators can use
//! [`Arc::ptr_eq`] for change detection.
//!
//! Releasing a shared entity goes through the reference tracker and cascades
//! into whatever the deleted entity referenced itself.

mod arm;
mod code_lists;
mod item_groups;
mod value_level;
mod variables;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use define_model::{
    Comment, EntityKind, ItemRef, MetaDataVersion, Method, Oid, Referenced, SourceKind, Sources,
    WhereClause, mint_oid,
};

use crate::action::Action;
use crate::error::{DefineError, Result};
use crate::reference::{ReferencePolicy, release, retain};
use crate::save;

/// Knobs of the mutation engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineOptions {
    pub reference_policy: ReferencePolicy,
}

/// Apply one action with default options.
pub fn apply_action(state: &Arc<MetaDataVersion>, action: &Action) -> Result<Arc<MetaDataVersion>> {
    apply_action_with(state, action, &EngineOptions::default())
}

/// Apply one action.
///
/// Returns `state` itself (pointer-equal) when the action changes nothing.
/// On error `state` is left as it was.
pub fn apply_action_with(
    state: &Arc<MetaDataVersion>,
    action: &Action,
    options: &EngineOptions,
) -> Result<Arc<MetaDataVersion>> {
    let mut next = MetaDataVersion::clone(state);
    Editor::new(&mut next, options.reference_policy).apply(action)?;
    if next == **state {
        debug!(action = action.kind(), "action left the document unchanged");
        return Ok(Arc::clone(state));
    }
    debug!(action = action.kind(), "action applied");
    Ok(Arc::new(next))
}

/// Apply a sequence of actions, stopping at the first error.
pub fn apply_actions<'a>(
    state: &Arc<MetaDataVersion>,
    actions: impl IntoIterator<Item = &'a Action>,
    options: &EngineOptions,
) -> Result<Arc<MetaDataVersion>> {
    let mut current = Arc::clone(state);
    for action in actions {
        current = apply_action_with(&current, action, options)?;
    }
    Ok(current)
}

/// Mutable view of a document used while one action runs.
pub(crate) struct Editor<'a> {
    mdv: &'a mut MetaDataVersion,
    policy: ReferencePolicy,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(mdv: &'a mut MetaDataVersion, policy: ReferencePolicy) -> Self {
        Self { mdv, policy }
    }

    fn apply(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::DeleteVariables {
                scope,
                item_ref_oids,
            } => self.delete_variables(scope, item_ref_oids),
            Action::DeleteItemGroups { item_group_oids } => self.delete_item_groups(item_group_oids),
            Action::UpdateNameLabelWhereClause {
                value_list_oid,
                item_ref_oid,
                name,
                label,
                where_clause,
            } => self.update_name_label_where_clause(
                value_list_oid,
                item_ref_oid,
                name.as_deref(),
                label.as_deref(),
                where_clause.as_ref(),
            ),
            Action::AddValueList {
                item_oid,
                range_checks,
            } => self.add_value_list(item_oid, range_checks),
            Action::AddValueLevel {
                value_list_oid,
                range_checks,
                position,
            } => self.add_value_level(value_list_oid, range_checks, *position),
            Action::PrepareForSave { options } => {
                save::normalize(self, options)?;
                Ok(())
            }
            Action::AddItemGroup {
                item_group,
                position,
            } => {
                self.add_item_group(item_group, *position);
                Ok(())
            }
            Action::AddVariables {
                item_group_oid,
                variables,
                position,
            } => self.add_variables(item_group_oid, variables, *position),
            Action::UpdateItemDescription {
                scope,
                item_ref_oid,
                comment,
                method,
            } => self.update_item_description(scope, item_ref_oid, comment.as_ref(), method.as_ref()),
            Action::UpdateItemGroupComment {
                item_group_oid,
                comment,
            } => self.update_item_group_comment(item_group_oid, comment.as_ref()),
            Action::UpdateItemCodeList {
                item_oid,
                code_list_oid,
            } => self.update_item_code_list(item_oid, code_list_oid.as_ref()),
            Action::AddCodeList {
                code_list,
                position,
            } => self.add_code_list(code_list, *position).map(|_| ()),
            Action::DeleteCodeLists { code_list_oids } => self.delete_code_lists(code_list_oids),
            Action::LinkCodeLists {
                enumerated_oid,
                decoded_oid,
            } => self.link_code_lists(enumerated_oid, decoded_oid),
            Action::UnlinkCodeList { code_list_oid } => self.unlink_code_list(code_list_oid),
            Action::AddResultDisplay {
                name,
                description,
                position,
            } => {
                self.add_result_display(name, description.as_deref(), *position);
                Ok(())
            }
            Action::DeleteResultDisplays {
                result_display_oids,
            } => self.delete_result_displays(result_display_oids),
            Action::DeleteAnalysisResults {
                analysis_result_oids,
            } => self.delete_analysis_results(analysis_result_oids),
            Action::AddAnalysisResults {
                result_display_oid,
                results,
                position,
            } => self.add_analysis_results(result_display_oid, results, *position),
        }
    }

    pub(crate) fn mdv(&self) -> &MetaDataVersion {
        self.mdv
    }

    pub(crate) fn mdv_mut(&mut self) -> &mut MetaDataVersion {
        self.mdv
    }

    // ------------------------------------------------------------------
    // Releasing shared entities
    // ------------------------------------------------------------------

    pub(crate) fn release_comment(&mut self, oid: &Oid, kind: SourceKind, owner: &Oid) {
        if let Some(comment) = release(&mut self.mdv.comments, oid, kind, owner, self.policy).into_deleted() {
            debug!(comment_oid = %comment.oid, %owner, "comment deleted");
        }
    }

    pub(crate) fn release_method(&mut self, oid: &Oid, item_ref_oid: &Oid) {
        if let Some(method) = release(
            &mut self.mdv.methods,
            oid,
            SourceKind::ItemRefs,
            item_ref_oid,
            self.policy,
        )
        .into_deleted()
        {
            debug!(method_oid = %method.oid, %item_ref_oid, "method deleted");
        }
    }

    pub(crate) fn release_where_clause(&mut self, oid: &Oid, kind: SourceKind, owner: &Oid) {
        let Some(where_clause) =
            release(&mut self.mdv.where_clauses, oid, kind, owner, self.policy).into_deleted()
        else {
            return;
        };
        debug!(where_clause_oid = %where_clause.oid, %owner, "where clause deleted");
        if let Some(comment_oid) = &where_clause.comment_oid {
            self.release_comment(comment_oid, SourceKind::WhereClauses, &where_clause.oid);
        }
    }

    pub(crate) fn release_code_list(&mut self, oid: &Oid, item_oid: &Oid) {
        let Some(code_list) = release(
            &mut self.mdv.code_lists,
            oid,
            SourceKind::ItemDefs,
            item_oid,
            self.policy,
        )
        .into_deleted() else {
            return;
        };
        debug!(code_list_oid = %code_list.oid, %item_oid, "codelist deleted");
        self.forget_code_list(
            &code_list.oid,
            code_list.linked_code_list_oid.as_ref(),
            code_list.comment_oid.as_ref(),
        );
    }

    /// Drop an already removed codelist from the order list, its partner and
    /// its comment.
    pub(crate) fn forget_code_list(&mut self, oid: &Oid, linked: Option<&Oid>, comment: Option<&Oid>) {
        self.mdv.code_list_order.retain(|entry| entry != oid);
        if let Some(partner) = linked.and_then(|linked| self.mdv.code_lists.get_mut(linked))
            && partner.linked_code_list_oid.as_ref() == Some(oid)
        {
            partner.linked_code_list_oid = None;
        }
        if let Some(comment_oid) = comment {
            self.release_comment(comment_oid, SourceKind::CodeLists, oid);
        }
    }

    /// Release one owner edge of a variable definition; a definition that
    /// lost its last owner takes its comment, codelist and value list along.
    pub(crate) fn release_item_def(&mut self, oid: &Oid, kind: SourceKind, owner: &Oid) {
        let Some(item_def) = release(&mut self.mdv.item_defs, oid, kind, owner, self.policy).into_deleted()
        else {
            return;
        };
        debug!(item_oid = %item_def.oid, %owner, "variable definition deleted");
        if let Some(comment_oid) = &item_def.comment_oid {
            self.release_comment(comment_oid, SourceKind::ItemDefs, &item_def.oid);
        }
        if let Some(code_list_oid) = &item_def.code_list_oid {
            self.release_code_list(code_list_oid, &item_def.oid);
        }
        if let Some(value_list_oid) = &item_def.value_list_oid {
            self.release_value_list(value_list_oid, &item_def.oid);
        }
        self.prune_analysis_variable(&item_def.oid);
    }

    fn release_value_list(&mut self, oid: &Oid, item_oid: &Oid) {
        let Some(value_list) = release(
            &mut self.mdv.value_lists,
            oid,
            SourceKind::ItemDefs,
            item_oid,
            self.policy,
        )
        .into_deleted() else {
            return;
        };
        debug!(value_list_oid = %value_list.oid, %item_oid, "value list deleted");
        self.release_item_refs(SourceKind::ValueLists, &value_list.oid, value_list.item_refs);
    }

    /// Release everything a removed container's item refs pointed at.
    ///
    /// Each definition and where clause is released once per container,
    /// however many item refs of the container used it.
    pub(crate) fn release_item_refs(
        &mut self,
        kind: SourceKind,
        container_oid: &Oid,
        item_refs: BTreeMap<Oid, ItemRef>,
    ) {
        let mut item_oids: Vec<Oid> = Vec::new();
        let mut where_clause_oids: Vec<Oid> = Vec::new();
        for (item_ref_oid, item_ref) in item_refs {
            if let Some(method_oid) = &item_ref.method_oid {
                self.release_method(method_oid, &item_ref_oid);
            }
            if let Some(where_clause_oid) = item_ref.where_clause_oid
                && kind == SourceKind::ValueLists
                && !where_clause_oids.contains(&where_clause_oid)
            {
                where_clause_oids.push(where_clause_oid);
            }
            if !item_oids.contains(&item_ref.item_oid) {
                item_oids.push(item_ref.item_oid);
            }
        }
        for where_clause_oid in &where_clause_oids {
            self.release_where_clause(where_clause_oid, SourceKind::ValueLists, container_oid);
        }
        for item_oid in &item_oids {
            self.release_item_def(item_oid, kind, container_oid);
        }
    }

    fn prune_analysis_variable(&mut self, item_oid: &Oid) {
        for result in self.mdv.analysis_result_displays.analysis_results.values_mut() {
            if result.parameter_oid.as_ref() == Some(item_oid) {
                result.parameter_oid = None;
            }
            for dataset in result.analysis_datasets.values_mut() {
                dataset.analysis_variable_oids.retain(|oid| oid != item_oid);
            }
        }
    }

    // ------------------------------------------------------------------
    // Attaching shared entities
    // ------------------------------------------------------------------

    /// Point an owner at `desired` instead of `current`.
    ///
    /// A desired comment with a blank OID is minted as a new comment. An
    /// existing OID takes over the content of `desired` and gains the edge.
    /// Returns the OID the owner must store.
    pub(crate) fn assign_comment(
        &mut self,
        current: Option<&Oid>,
        desired: Option<&Comment>,
        kind: SourceKind,
        owner: &Oid,
    ) -> Option<Oid> {
        let oid = desired.map(|comment| shared_oid(&comment.oid, EntityKind::Comment, self.mdv.comments.keys()));
        if let Some(old) = current
            && oid.as_ref() != Some(old)
        {
            self.release_comment(old, kind, owner);
        }
        let (desired, oid) = (desired?, oid?);
        upsert_shared(&mut self.mdv.comments, desired, &oid, kind, owner);
        Some(oid)
    }

    pub(crate) fn assign_method(
        &mut self,
        current: Option<&Oid>,
        desired: Option<&Method>,
        item_ref_oid: &Oid,
    ) -> Option<Oid> {
        let oid = desired.map(|method| shared_oid(&method.oid, EntityKind::Method, self.mdv.methods.keys()));
        if let Some(old) = current
            && oid.as_ref() != Some(old)
        {
            self.release_method(old, item_ref_oid);
        }
        let (desired, oid) = (desired?, oid?);
        upsert_shared(&mut self.mdv.methods, desired, &oid, SourceKind::ItemRefs, item_ref_oid);
        Some(oid)
    }

    /// Like [`Self::assign_comment`] for a value list's where clause, also
    /// moving the where clause's own comment edge when it changed.
    pub(crate) fn assign_where_clause(
        &mut self,
        current: Option<&Oid>,
        desired: Option<&WhereClause>,
        value_list_oid: &Oid,
        still_used_by_others: bool,
    ) -> Result<Option<Oid>> {
        let oid = desired.map(|wc| shared_oid(&wc.oid, EntityKind::WhereClause, self.mdv.where_clauses.keys()));
        if let Some(old) = current
            && oid.as_ref() != Some(old)
            && !still_used_by_others
        {
            self.release_where_clause(old, SourceKind::ValueLists, value_list_oid);
        }
        let (Some(desired), Some(oid)) = (desired, oid) else {
            return Ok(None);
        };
        if let Some(comment_oid) = &desired.comment_oid
            && !self.mdv.comments.contains_key(comment_oid)
        {
            return Err(DefineError::missing(EntityKind::Comment, comment_oid));
        }
        let previous_comment = self
            .mdv
            .where_clauses
            .get(&oid)
            .and_then(|stored| stored.comment_oid.clone());
        if previous_comment != desired.comment_oid {
            if let Some(old) = &previous_comment {
                self.release_comment(old, SourceKind::WhereClauses, &oid);
            }
            if let Some(new) = &desired.comment_oid {
                retain(&mut self.mdv.comments, new, SourceKind::WhereClauses, &oid);
            }
        }
        upsert_shared(&mut self.mdv.where_clauses, desired, &oid, SourceKind::ValueLists, value_list_oid);
        Ok(Some(oid))
    }
}

/// OID a shared entity is stored under: the caller's, or a minted one.
fn shared_oid<'a>(requested: &Oid, kind: EntityKind, existing: impl IntoIterator<Item = &'a Oid>) -> Oid {
    if requested.as_str().trim().is_empty() {
        mint_oid(kind, existing)
    } else {
        requested.clone()
    }
}

/// Shared entities whose content can be replaced while their owners stay.
trait Shared: Referenced + Clone {
    fn set_oid(&mut self, oid: Oid);
}

impl Shared for Comment {
    fn set_oid(&mut self, oid: Oid) {
        self.oid = oid;
    }
}

impl Shared for Method {
    fn set_oid(&mut self, oid: Oid) {
        self.oid = oid;
    }
}

impl Shared for WhereClause {
    fn set_oid(&mut self, oid: Oid) {
        self.oid = oid;
    }
}

/// Store `desired` under `oid`, keeping the stored owners and adding the
/// `(kind, owner)` edge.
fn upsert_shared<T: Shared>(
    entities: &mut BTreeMap<Oid, T>,
    desired: &T,
    oid: &Oid,
    kind: SourceKind,
    owner: &Oid,
) {
    let sources = entities
        .get(oid)
        .map(|stored| stored.sources().clone())
        .unwrap_or_else(Sources::new);
    let mut entity = desired.clone();
    entity.set_oid(oid.clone());
    *entity.sources_mut() = sources;
    entity.sources_mut().push(kind, owner.clone());
    trace!(%oid, %kind, %owner, "shared entity stored");
    entities.insert(oid.clone(), entity);
}

/// Insert `oid` into an order list at `position`, or append it.
pub(crate) fn insert_at(order: &mut Vec<Oid>, position: Option<usize>, oid: Oid) {
    match position {
        Some(index) if index < order.len() => order.insert(index, oid),
        _ => order.push(oid),
    }
}
