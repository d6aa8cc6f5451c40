//! Value-level metadata: `ADD_VALUELIST`, `ADD_VALLVL` and
//! `UPD_NAMELABELWHERECLAUSE`.

use tracing::debug;

use define_model::{
    DataType, EntityKind, ItemDef, ItemRef, Oid, RangeCheck, SourceKind, Sources, TranslatedText,
    ValueList, VariableScope, WhereClause, mint_oid, mint_oid_with_suffix,
};

use super::{Editor, insert_at};
use crate::error::{DefineError, Result};

impl Editor<'_> {
    /// Give a variable a new value list holding one value-level variable.
    pub(crate) fn add_value_list(&mut self, item_oid: &Oid, range_checks: &[RangeCheck]) -> Result<()> {
        let parent = self
            .mdv
            .item_defs
            .get(item_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ItemDef, item_oid))?;
        if let Some(value_list_oid) = &parent.value_list_oid {
            return Err(DefineError::ValueListExists {
                item_oid: item_oid.clone(),
                value_list_oid: value_list_oid.clone(),
            });
        }
        let suffix = item_oid
            .strip_prefix(EntityKind::ItemDef.oid_prefix())
            .unwrap_or(item_oid.as_str());
        let value_list_oid = mint_oid_with_suffix(EntityKind::ValueList, suffix, self.mdv.value_lists.keys());
        let mut value_list = ValueList::new(value_list_oid.clone());
        value_list.sources = Sources::single(SourceKind::ItemDefs, item_oid);
        self.mdv.value_lists.insert(value_list_oid.clone(), value_list);
        if let Some(parent) = self.mdv.item_defs.get_mut(item_oid) {
            parent.value_list_oid = Some(value_list_oid.clone());
        }
        debug!(%item_oid, %value_list_oid, "value list added");
        self.add_value_level(&value_list_oid, range_checks, None)
    }

    /// Insert a value-level variable with its own new where clause.
    pub(crate) fn add_value_level(
        &mut self,
        value_list_oid: &Oid,
        range_checks: &[RangeCheck],
        position: Option<usize>,
    ) -> Result<()> {
        let value_list = self
            .mdv
            .value_lists
            .get(value_list_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ValueList, value_list_oid))?;
        let parent = value_list
            .sources
            .owners(SourceKind::ItemDefs)
            .first()
            .and_then(|oid| self.mdv.item_defs.get(oid));
        let (name, data_type, parent_oid) = match parent {
            Some(parent) => (parent.name.clone(), parent.data_type, Some(parent.oid.clone())),
            None => (String::new(), DataType::Text, None),
        };

        let base = parent_oid
            .as_ref()
            .map(|oid| {
                oid.strip_prefix(EntityKind::ItemDef.oid_prefix())
                    .unwrap_or(oid.as_str())
                    .to_string()
            })
            .unwrap_or_else(|| name.clone());
        let item_oid = mint_oid_with_suffix(EntityKind::ItemDef, &base, self.mdv.item_defs.keys());
        let mut item_def = ItemDef::new(item_oid.clone(), name, data_type);
        item_def.parent_item_def_oid = parent_oid;
        item_def.sources = Sources::single(SourceKind::ValueLists, value_list_oid);
        self.mdv.item_defs.insert(item_oid.clone(), item_def);

        let where_clause_oid = mint_oid(EntityKind::WhereClause, self.mdv.where_clauses.keys());
        let mut where_clause = WhereClause::new(where_clause_oid.clone(), range_checks.to_vec());
        where_clause.sources = Sources::single(SourceKind::ValueLists, value_list_oid);
        self.mdv.where_clauses.insert(where_clause_oid.clone(), where_clause);

        let item_ref_oid = mint_oid(EntityKind::ItemRef, self.mdv.item_ref_oids());
        let item_ref = ItemRef {
            where_clause_oid: Some(where_clause_oid.clone()),
            ..ItemRef::new(item_oid.clone())
        };
        let value_list = self
            .mdv
            .value_lists
            .get_mut(value_list_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ValueList, value_list_oid))?;
        value_list.item_refs.insert(item_ref_oid.clone(), item_ref);
        insert_at(&mut value_list.item_ref_order, position, item_ref_oid.clone());
        debug!(%value_list_oid, %item_oid, %where_clause_oid, "value-level variable added");

        Ok(())
    }

    /// Rename or relabel a value-level variable and point its item ref at a
    /// new or updated where clause.
    ///
    /// A changed where clause OID releases the previous where clause unless
    /// another item ref of the value list still uses it. An unchanged OID
    /// replaces the where clause content in place and records the value list
    /// as an owner if it was not one yet.
    pub(crate) fn update_name_label_where_clause(
        &mut self,
        value_list_oid: &Oid,
        item_ref_oid: &Oid,
        name: Option<&str>,
        label: Option<&str>,
        where_clause: Option<&WhereClause>,
    ) -> Result<()> {
        let value_list = self
            .mdv
            .value_lists
            .get(value_list_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ValueList, value_list_oid))?;
        let item_ref = value_list
            .item_refs
            .get(item_ref_oid)
            .ok_or_else(|| DefineError::MissingItemRef {
                oid: item_ref_oid.clone(),
                scope: VariableScope::ValueList(value_list_oid.clone()),
            })?;
        let item_oid = item_ref.item_oid.clone();
        let current = item_ref.where_clause_oid.clone();
        let still_used_by_others = current
            .as_ref()
            .is_some_and(|wc| value_list.uses_where_clause(wc, Some(item_ref_oid.as_str())));

        let item_def = self
            .mdv
            .item_defs
            .get_mut(&item_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ItemDef, &item_oid))?;
        if let Some(name) = name {
            item_def.name = name.to_string();
        }
        if let Some(label) = label {
            item_def.descriptions = vec![TranslatedText::new(label)];
        }

        let where_clause_oid =
            self.assign_where_clause(current.as_ref(), where_clause, value_list_oid, still_used_by_others)?;
        if let Some(stored) = self
            .mdv
            .value_lists
            .get_mut(value_list_oid)
            .and_then(|vl| vl.item_refs.get_mut(item_ref_oid))
        {
            stored.where_clause_oid = where_clause_oid;
        }
        Ok(())
    }
}
