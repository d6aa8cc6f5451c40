//! Variable edits: `DEL_VARS`, `ADD_VARS` and `UPD_ITEMDESCRIPTION`.

use std::collections::BTreeSet;

use tracing::debug;

use define_model::{
    Comment, EntityKind, ItemDef, ItemRef, ItemRefContainer, Method, Oid, SourceKind, VariableScope,
    mint_oid, mint_oid_with_suffix,
};

use super::{Editor, insert_at};
use crate::action::NewVariable;
use crate::error::{DefineError, Result};

/// What was left behind after an item ref was taken out of its container.
struct DetachedItemRef {
    item_ref: ItemRef,
    /// Another item ref of the same container still uses the definition.
    item_def_still_used: bool,
    /// Another item ref of the same value list still uses the where clause.
    where_clause_still_used: bool,
}

impl Editor<'_> {
    /// Remove item refs from one dataset or value list and release what
    /// they referenced.
    pub(crate) fn delete_variables(&mut self, scope: &VariableScope, item_ref_oids: &[Oid]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for item_ref_oid in item_ref_oids {
            if !seen.insert(item_ref_oid) {
                continue;
            }
            let detached = self.detach_item_ref(scope, item_ref_oid)?;
            debug!(%scope, %item_ref_oid, item_oid = %detached.item_ref.item_oid, "variable removed");
            self.release_detached(scope, item_ref_oid, detached);
        }
        Ok(())
    }

    fn detach_item_ref(&mut self, scope: &VariableScope, item_ref_oid: &Oid) -> Result<DetachedItemRef> {
        let missing_ref = || DefineError::MissingItemRef {
            oid: item_ref_oid.clone(),
            scope: scope.clone(),
        };
        match scope {
            VariableScope::ItemGroup(oid) => {
                let group = self
                    .mdv
                    .item_groups
                    .get_mut(oid)
                    .ok_or_else(|| DefineError::missing(EntityKind::ItemGroup, oid))?;
                let item_ref = group.item_refs.remove(item_ref_oid).ok_or_else(missing_ref)?;
                group.item_ref_order.retain(|entry| entry != item_ref_oid);
                group.key_order.retain(|entry| entry != item_ref_oid);
                Ok(DetachedItemRef {
                    item_def_still_used: group.references_item_def(&item_ref.item_oid, None),
                    where_clause_still_used: false,
                    item_ref,
                })
            }
            VariableScope::ValueList(oid) => {
                let value_list = self
                    .mdv
                    .value_lists
                    .get_mut(oid)
                    .ok_or_else(|| DefineError::missing(EntityKind::ValueList, oid))?;
                let item_ref = value_list.item_refs.remove(item_ref_oid).ok_or_else(missing_ref)?;
                value_list.item_ref_order.retain(|entry| entry != item_ref_oid);
                Ok(DetachedItemRef {
                    item_def_still_used: value_list.references_item_def(&item_ref.item_oid, None),
                    where_clause_still_used: item_ref
                        .where_clause_oid
                        .as_ref()
                        .is_some_and(|wc| value_list.uses_where_clause(wc, None)),
                    item_ref,
                })
            }
        }
    }

    fn release_detached(&mut self, scope: &VariableScope, item_ref_oid: &Oid, detached: DetachedItemRef) {
        let DetachedItemRef {
            item_ref,
            item_def_still_used,
            where_clause_still_used,
        } = detached;
        let (kind, owner) = match scope {
            VariableScope::ItemGroup(oid) => (SourceKind::ItemGroups, oid),
            VariableScope::ValueList(oid) => (SourceKind::ValueLists, oid),
        };
        if let Some(method_oid) = &item_ref.method_oid {
            self.release_method(method_oid, item_ref_oid);
        }
        if let Some(where_clause_oid) = &item_ref.where_clause_oid
            && kind == SourceKind::ValueLists
            && !where_clause_still_used
        {
            self.release_where_clause(where_clause_oid, SourceKind::ValueLists, owner);
        }
        if !item_def_still_used {
            self.release_item_def(&item_ref.item_oid, kind, owner);
        }
    }

    /// Insert variables into a dataset at `position`.
    pub(crate) fn add_variables(
        &mut self,
        item_group_oid: &Oid,
        variables: &[NewVariable],
        position: Option<usize>,
    ) -> Result<()> {
        let group_name = self
            .mdv
            .item_groups
            .get(item_group_oid)
            .map(|group| group.name.clone())
            .ok_or_else(|| DefineError::missing(EntityKind::ItemGroup, item_group_oid))?;
        let mut position = position;
        for variable in variables {
            let item_oid = match &variable.existing_item_oid {
                Some(existing) => {
                    let item_def = self
                        .mdv
                        .item_defs
                        .get_mut(existing)
                        .ok_or_else(|| DefineError::missing(EntityKind::ItemDef, existing))?;
                    item_def.sources.push(SourceKind::ItemGroups, item_group_oid);
                    existing.clone()
                }
                None => {
                    let suffix = format!("{}.{}", group_name, variable.name);
                    let oid = mint_oid_with_suffix(EntityKind::ItemDef, &suffix, self.mdv.item_defs.keys());
                    let mut item_def = ItemDef::new(oid.clone(), variable.name.clone(), variable.data_type);
                    if let Some(label) = &variable.label {
                        item_def = item_def.with_label(label.clone());
                    }
                    item_def.length = variable.length;
                    item_def.sources.push(SourceKind::ItemGroups, item_group_oid);
                    self.mdv.item_defs.insert(oid.clone(), item_def);
                    oid
                }
            };
            let item_ref_oid = mint_oid(EntityKind::ItemRef, self.mdv.item_ref_oids());
            let item_ref = ItemRef {
                mandatory: variable.mandatory,
                role: variable.role.clone(),
                ..ItemRef::new(item_oid.clone())
            };
            let group = self
                .mdv
                .item_groups
                .get_mut(item_group_oid)
                .ok_or_else(|| DefineError::missing(EntityKind::ItemGroup, item_group_oid))?;
            group.item_refs.insert(item_ref_oid.clone(), item_ref);
            insert_at(&mut group.item_ref_order, position, item_ref_oid.clone());
            if variable.key {
                group.key_order.push(item_ref_oid.clone());
            }
            position = position.map(|index| index + 1);
            debug!(%item_group_oid, %item_ref_oid, %item_oid, "variable added");
        }
        Ok(())
    }

    /// Replace the comment of a variable definition and the method of its
    /// item ref. `None` removes them.
    pub(crate) fn update_item_description(
        &mut self,
        scope: &VariableScope,
        item_ref_oid: &Oid,
        comment: Option<&Comment>,
        method: Option<&Method>,
    ) -> Result<()> {
        let item_ref = self
            .mdv
            .item_refs_in(scope)
            .ok_or_else(|| match scope {
                VariableScope::ItemGroup(oid) => DefineError::missing(EntityKind::ItemGroup, oid),
                VariableScope::ValueList(oid) => DefineError::missing(EntityKind::ValueList, oid),
            })?
            .get(item_ref_oid)
            .cloned()
            .ok_or_else(|| DefineError::MissingItemRef {
                oid: item_ref_oid.clone(),
                scope: scope.clone(),
            })?;
        let item_oid = item_ref.item_oid.clone();
        let current_comment = self
            .mdv
            .item_defs
            .get(&item_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ItemDef, &item_oid))?
            .comment_oid
            .clone();

        let comment_oid = self.assign_comment(current_comment.as_ref(), comment, SourceKind::ItemDefs, &item_oid);
        if let Some(item_def) = self.mdv.item_defs.get_mut(&item_oid) {
            item_def.comment_oid = comment_oid;
        }

        let method_oid = self.assign_method(item_ref.method_oid.as_ref(), method, item_ref_oid);
        let container = match scope {
            VariableScope::ItemGroup(oid) => self.mdv.item_groups.get_mut(oid).map(|group| &mut group.item_refs),
            VariableScope::ValueList(oid) => self.mdv.value_lists.get_mut(oid).map(|vl| &mut vl.item_refs),
        };
        if let Some(stored) = container.and_then(|refs| refs.get_mut(item_ref_oid)) {
            stored.method_oid = method_oid;
        }
        Ok(())
    }
}
