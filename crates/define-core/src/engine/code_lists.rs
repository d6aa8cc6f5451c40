//! Codelist edits.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use define_model::{CodeList, CodeListType, EntityKind, EnumeratedItem, Oid, SourceKind, Sources};

use super::{Editor, insert_at, shared_oid};
use crate::error::{DefineError, Result};
use crate::reference::retain;

impl Editor<'_> {
    /// Add a codelist at `position` of the codelist order. The new codelist
    /// starts without owners and without a linked partner.
    pub(crate) fn add_code_list(&mut self, code_list: &CodeList, position: Option<usize>) -> Result<Oid> {
        if self.mdv.code_lists.contains_key(&code_list.oid) {
            return Err(DefineError::DuplicateOid {
                kind: EntityKind::CodeList,
                oid: code_list.oid.clone(),
            });
        }
        let oid = shared_oid(&code_list.oid, EntityKind::CodeList, self.mdv.code_lists.keys());
        if let Some(comment_oid) = &code_list.comment_oid
            && !retain(&mut self.mdv.comments, comment_oid, SourceKind::CodeLists, &oid)
        {
            return Err(DefineError::missing(EntityKind::Comment, comment_oid));
        }
        let mut stored = code_list.clone();
        stored.oid = oid.clone();
        stored.sources = Sources::new();
        stored.linked_code_list_oid = None;
        if stored.item_order.is_empty() {
            stored.item_order = stored.item_keys().into_iter().cloned().collect();
        }
        self.mdv.code_lists.insert(oid.clone(), stored);
        insert_at(&mut self.mdv.code_list_order, position, oid.clone());
        debug!(code_list_oid = %oid, "codelist added");
        Ok(oid)
    }

    /// Delete codelists whatever their owners: referencing variables lose
    /// their codelist and a linked partner loses its link.
    pub(crate) fn delete_code_lists(&mut self, code_list_oids: &[Oid]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for oid in code_list_oids {
            if !seen.insert(oid) {
                continue;
            }
            let code_list = self
                .mdv
                .code_lists
                .remove(oid)
                .ok_or_else(|| DefineError::missing(EntityKind::CodeList, oid))?;
            for item_def in self.mdv.item_defs.values_mut() {
                if item_def.code_list_oid.as_ref() == Some(oid) {
                    item_def.code_list_oid = None;
                }
            }
            debug!(code_list_oid = %oid, owners = code_list.sources.total(), "codelist deleted");
            self.forget_code_list(oid, code_list.linked_code_list_oid.as_ref(), code_list.comment_oid.as_ref());
        }
        Ok(())
    }

    /// Link a variable to a codelist or unlink it.
    ///
    /// The previous codelist only loses the back-reference; a codelist left
    /// without owners stays until it is deleted explicitly or by pre-save
    /// cleanup.
    pub(crate) fn update_item_code_list(&mut self, item_oid: &Oid, code_list_oid: Option<&Oid>) -> Result<()> {
        if let Some(new) = code_list_oid
            && !self.mdv.code_lists.contains_key(new)
        {
            return Err(DefineError::missing(EntityKind::CodeList, new));
        }
        let item_def = self
            .mdv
            .item_defs
            .get_mut(item_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::ItemDef, item_oid))?;
        let previous = std::mem::replace(&mut item_def.code_list_oid, code_list_oid.cloned());
        if let Some(old) = &previous
            && Some(old) != code_list_oid
            && let Some(code_list) = self.mdv.code_lists.get_mut(old)
        {
            code_list.sources.remove(SourceKind::ItemDefs, item_oid);
            debug!(%item_oid, code_list_oid = %old, "codelist unlinked");
        }
        if let Some(new) = code_list_oid {
            retain(&mut self.mdv.code_lists, new, SourceKind::ItemDefs, item_oid);
        }
        Ok(())
    }

    /// Pair an enumerated codelist with a decoded one. The enumerated items
    /// are rebuilt from the coded values of the decoded codelist.
    pub(crate) fn link_code_lists(&mut self, enumerated_oid: &Oid, decoded_oid: &Oid) -> Result<()> {
        let invalid = |reason: &str| DefineError::InvalidCodeListLink {
            oid: enumerated_oid.clone(),
            partner: decoded_oid.clone(),
            reason: reason.to_string(),
        };
        if enumerated_oid == decoded_oid {
            return Err(invalid("a codelist cannot be linked to itself"));
        }
        let enumerated = self
            .mdv
            .code_lists
            .get(enumerated_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::CodeList, enumerated_oid))?;
        let decoded = self
            .mdv
            .code_lists
            .get(decoded_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::CodeList, decoded_oid))?;
        if enumerated.code_list_type != CodeListType::Enumerated {
            return Err(invalid("first codelist is not enumerated"));
        }
        if decoded.code_list_type != CodeListType::Decoded {
            return Err(invalid("second codelist is not decoded"));
        }
        let stale_partners: Vec<Oid> = [&enumerated.linked_code_list_oid, &decoded.linked_code_list_oid]
            .into_iter()
            .flatten()
            .filter(|partner| *partner != enumerated_oid && *partner != decoded_oid)
            .cloned()
            .collect();
        let enumerated_items: BTreeMap<Oid, EnumeratedItem> = decoded
            .code_list_items
            .iter()
            .map(|(oid, item)| {
                (
                    oid.clone(),
                    EnumeratedItem {
                        coded_value: item.coded_value.clone(),
                        rank: item.rank,
                        extended_value: item.extended_value,
                    },
                )
            })
            .collect();
        let item_order = decoded.item_order.clone();

        for partner in &stale_partners {
            if let Some(code_list) = self.mdv.code_lists.get_mut(partner) {
                code_list.linked_code_list_oid = None;
            }
        }
        if let Some(decoded) = self.mdv.code_lists.get_mut(decoded_oid) {
            decoded.linked_code_list_oid = Some(enumerated_oid.clone());
        }
        if let Some(enumerated) = self.mdv.code_lists.get_mut(enumerated_oid) {
            enumerated.linked_code_list_oid = Some(decoded_oid.clone());
            enumerated.enumerated_items = enumerated_items;
            enumerated.item_order = item_order;
        }
        debug!(%enumerated_oid, %decoded_oid, "codelists linked");
        Ok(())
    }

    pub(crate) fn unlink_code_list(&mut self, code_list_oid: &Oid) -> Result<()> {
        let code_list = self
            .mdv
            .code_lists
            .get_mut(code_list_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::CodeList, code_list_oid))?;
        let Some(partner_oid) = code_list.linked_code_list_oid.take() else {
            return Ok(());
        };
        if let Some(partner) = self.mdv.code_lists.get_mut(&partner_oid)
            && partner.linked_code_list_oid.as_ref() == Some(code_list_oid)
        {
            partner.linked_code_list_oid = None;
        }
        debug!(%code_list_oid, %partner_oid, "codelists unlinked");
        Ok(())
    }
}
