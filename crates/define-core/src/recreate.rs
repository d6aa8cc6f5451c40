//! Rebuilding typed documents from raw JSON and repairing known gaps.
//!
//! Documents written by older versions may lack fields, carry order lists
//! that drifted from their maps, or miss back-references that were never
//! recorded. Missing fields take their defaults during deserialization;
//! [`repair_metadata_version`] fixes the rest and reports every change.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use define_model::{
    CodeListType, DefineDocument, EntityKind, MetaDataVersion, Oid, Referenced, SourceKind, VariableScope,
};

use crate::error::Result;
use crate::integrity::{BackReferences, OrderList};

/// One change made while repairing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "repair", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Repair {
    /// An analysis result missing its result display back-reference.
    ReattachedAnalysisResult {
        analysis_result_oid: Oid,
        result_display_oid: Oid,
    },
    /// A map entry that was missing from its order list was appended.
    Listed { list: OrderList, oid: Oid },
    /// An order entry without a map entry, or a repeated one, was dropped.
    Unlisted { list: OrderList, oid: Oid },
    /// Empty `sources` were rebuilt from the references in the document.
    RestoredSources { target: EntityKind, oid: Oid, owners: usize },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::ReattachedAnalysisResult {
                analysis_result_oid,
                result_display_oid,
            } => write!(f, "reattached {analysis_result_oid} to {result_display_oid}"),
            Repair::Listed { list, oid } => write!(f, "added {oid} to {list}"),
            Repair::Unlisted { list, oid } => write!(f, "removed {oid} from {list}"),
            Repair::RestoredSources { target, oid, owners } => {
                write!(f, "restored {owners} owner(s) of {target} {oid}")
            }
        }
    }
}

/// Rebuild a document from raw JSON and repair it.
pub fn recreate(raw: Value) -> Result<DefineDocument> {
    recreate_with_repairs(raw).map(|(document, _)| document)
}

pub fn recreate_from_str(raw: &str) -> Result<DefineDocument> {
    recreate(serde_json::from_str(raw)?)
}

/// Like [`recreate`], also returning the repairs that were made.
pub fn recreate_with_repairs(raw: Value) -> Result<(DefineDocument, Vec<Repair>)> {
    let mut document: DefineDocument = serde_json::from_value(raw)?;
    let repairs = repair_metadata_version(&mut document.meta_data_version);
    Ok((document, repairs))
}

/// Repair a MetaDataVersion in place.
pub fn repair_metadata_version(mdv: &mut MetaDataVersion) -> Vec<Repair> {
    let mut repairs = Vec::new();
    reattach_analysis_results(mdv, &mut repairs);
    repair_orders(mdv, &mut repairs);
    restore_empty_sources(mdv, &mut repairs);
    for repair in &repairs {
        warn!(%repair, "document repaired");
    }
    repairs
}

/// Analysis results whose display back-reference is missing are reattached
/// to the display that lists them.
fn reattach_analysis_results(mdv: &mut MetaDataVersion, repairs: &mut Vec<Repair>) {
    let arm = &mut mdv.analysis_result_displays;
    let detached: Vec<Oid> = arm
        .analysis_results
        .values()
        .filter(|result| result.sources.owners(SourceKind::ResultDisplays).is_empty())
        .map(|result| result.oid.clone())
        .collect();
    for analysis_result_oid in detached {
        let Some(result_display_oid) = arm.display_of(&analysis_result_oid).cloned() else {
            continue;
        };
        if let Some(result) = arm.analysis_results.get_mut(&analysis_result_oid) {
            result.sources.push(SourceKind::ResultDisplays, result_display_oid.clone());
            repairs.push(Repair::ReattachedAnalysisResult {
                analysis_result_oid,
                result_display_oid,
            });
        }
    }
}

fn repair_orders(mdv: &mut MetaDataVersion, repairs: &mut Vec<Repair>) {
    let keys: Vec<Oid> = mdv.item_groups.keys().cloned().collect();
    reconcile(OrderList::ItemGroups, &mut mdv.item_group_order, &keys, true, repairs);
    let keys: Vec<Oid> = mdv.code_lists.keys().cloned().collect();
    reconcile(OrderList::CodeLists, &mut mdv.code_list_order, &keys, true, repairs);

    for (oid, group) in &mut mdv.item_groups {
        let keys: Vec<Oid> = group.item_refs.keys().cloned().collect();
        reconcile(
            OrderList::ItemRefs(VariableScope::ItemGroup(oid.clone())),
            &mut group.item_ref_order,
            &keys,
            true,
            repairs,
        );
        reconcile(OrderList::KeyOrder(oid.clone()), &mut group.key_order, &keys, false, repairs);
    }
    for (oid, value_list) in &mut mdv.value_lists {
        let keys: Vec<Oid> = value_list.item_refs.keys().cloned().collect();
        reconcile(
            OrderList::ItemRefs(VariableScope::ValueList(oid.clone())),
            &mut value_list.item_ref_order,
            &keys,
            true,
            repairs,
        );
    }
    for (oid, code_list) in &mut mdv.code_lists {
        if code_list.code_list_type == CodeListType::External {
            continue;
        }
        let keys: Vec<Oid> = code_list.item_keys().into_iter().cloned().collect();
        reconcile(OrderList::CodeListItems(oid.clone()), &mut code_list.item_order, &keys, true, repairs);
    }

    let arm = &mut mdv.analysis_result_displays;
    let keys: Vec<Oid> = arm.result_displays.keys().cloned().collect();
    reconcile(OrderList::ResultDisplays, &mut arm.result_display_order, &keys, true, repairs);
    let result_keys: Vec<Oid> = arm.analysis_results.keys().cloned().collect();
    for (oid, display) in &mut arm.result_displays {
        reconcile(
            OrderList::AnalysisResults(oid.clone()),
            &mut display.analysis_result_order,
            &result_keys,
            false,
            repairs,
        );
    }
    for (oid, result) in &mut arm.analysis_results {
        let keys: Vec<Oid> = result.analysis_datasets.keys().cloned().collect();
        reconcile(
            OrderList::AnalysisDatasets(oid.clone()),
            &mut result.analysis_dataset_order,
            &keys,
            true,
            repairs,
        );
    }
}

/// Drop dangling and repeated order entries; with `complete` set, append
/// map keys the order list lacks.
fn reconcile(list: OrderList, order: &mut Vec<Oid>, keys: &[Oid], complete: bool, repairs: &mut Vec<Repair>) {
    let known: BTreeSet<&Oid> = keys.iter().collect();
    let mut listed: BTreeSet<Oid> = BTreeSet::new();
    let mut dropped = Vec::new();
    order.retain(|oid| {
        let keep = known.contains(oid) && listed.insert(oid.clone());
        if !keep {
            dropped.push(oid.clone());
        }
        keep
    });
    for oid in dropped {
        repairs.push(Repair::Unlisted {
            list: list.clone(),
            oid,
        });
    }
    if complete {
        for oid in keys {
            if !listed.contains(oid) {
                order.push(oid.clone());
                repairs.push(Repair::Listed {
                    list: list.clone(),
                    oid: oid.clone(),
                });
            }
        }
    }
}

/// Entities with empty `sources` get the owners their forward references
/// imply. Non-empty `sources` are left as they are.
fn restore_empty_sources(mdv: &mut MetaDataVersion, repairs: &mut Vec<Repair>) {
    let back_references = BackReferences::derive(mdv);
    let mut restore = |target: EntityKind, entity: &mut dyn Referenced, oid: &Oid| {
        if !entity.sources().is_empty() {
            return;
        }
        let Some(expected) = back_references.of(target, oid) else {
            return;
        };
        *entity.sources_mut() = expected.clone();
        repairs.push(Repair::RestoredSources {
            target,
            oid: oid.clone(),
            owners: expected.total(),
        });
    };
    for (oid, entity) in &mut mdv.item_defs {
        restore(EntityKind::ItemDef, entity, oid);
    }
    for (oid, entity) in &mut mdv.value_lists {
        restore(EntityKind::ValueList, entity, oid);
    }
    for (oid, entity) in &mut mdv.code_lists {
        restore(EntityKind::CodeList, entity, oid);
    }
    for (oid, entity) in &mut mdv.where_clauses {
        restore(EntityKind::WhereClause, entity, oid);
    }
    for (oid, entity) in &mut mdv.comments {
        restore(EntityKind::Comment, entity, oid);
    }
    for (oid, entity) in &mut mdv.methods {
        restore(EntityKind::Method, entity, oid);
    }
    for (oid, entity) in &mut mdv.analysis_result_displays.analysis_results {
        restore(EntityKind::AnalysisResult, entity, oid);
    }
}
