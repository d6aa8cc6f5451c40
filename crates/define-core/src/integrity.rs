//! Structural integrity checks of a MetaDataVersion.
//!
//! The mutation engine does not validate documents while it edits them.
//! [`check_integrity`] is the independent check used by tests and by the
//! command line `check` command: order lists must match their maps, every
//! stored `sources` entry must match a forward reference that exists in the
//! document, and shared entities nobody points at must not exist.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use define_model::{CodeListType, EntityKind, MetaDataVersion, Oid, Referenced, SourceKind, Sources, VariableScope};

/// An order list of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "list", content = "owner", rename_all = "camelCase")]
pub enum OrderList {
    ItemGroups,
    CodeLists,
    ResultDisplays,
    ItemRefs(VariableScope),
    KeyOrder(Oid),
    CodeListItems(Oid),
    AnalysisResults(Oid),
    AnalysisDatasets(Oid),
}

impl fmt::Display for OrderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderList::ItemGroups => f.write_str("dataset order"),
            OrderList::CodeLists => f.write_str("codelist order"),
            OrderList::ResultDisplays => f.write_str("result display order"),
            OrderList::ItemRefs(scope) => write!(f, "variable order of {scope}"),
            OrderList::KeyOrder(oid) => write!(f, "key order of {oid}"),
            OrderList::CodeListItems(oid) => write!(f, "item order of {oid}"),
            OrderList::AnalysisResults(oid) => write!(f, "analysis result order of {oid}"),
            OrderList::AnalysisDatasets(oid) => write!(f, "analysis dataset order of {oid}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderProblem {
    /// The map has an entry the order list does not mention.
    Unlisted,
    /// The order list mentions an OID the map does not have.
    Dangling,
    /// The order list mentions the OID more than once.
    Duplicate,
}

impl fmt::Display for OrderProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderProblem::Unlisted => f.write_str("missing from order list"),
            OrderProblem::Dangling => f.write_str("listed but not defined"),
            OrderProblem::Duplicate => f.write_str("listed more than once"),
        }
    }
}

/// One violated structural rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IntegrityIssue {
    Order {
        list: OrderList,
        oid: Oid,
        problem: OrderProblem,
    },
    /// A forward reference points at an entity that does not exist.
    DanglingReference {
        owner_kind: SourceKind,
        owner: Oid,
        target: EntityKind,
        oid: Oid,
    },
    /// A forward reference has no matching `sources` entry.
    MissingSource {
        target: EntityKind,
        oid: Oid,
        owner_kind: SourceKind,
        owner: Oid,
    },
    /// A `sources` entry has no matching forward reference.
    StaleSource {
        target: EntityKind,
        oid: Oid,
        owner_kind: SourceKind,
        owner: Oid,
    },
    /// A shared entity nothing refers to.
    Orphan { target: EntityKind, oid: Oid },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::Order { list, oid, problem } => write!(f, "{oid}: {problem} ({list})"),
            IntegrityIssue::DanglingReference {
                owner_kind,
                owner,
                target,
                oid,
            } => write!(f, "{owner} ({owner_kind}) refers to missing {target} {oid}"),
            IntegrityIssue::MissingSource {
                target,
                oid,
                owner_kind,
                owner,
            } => write!(f, "{target} {oid} does not list {owner} in {owner_kind}"),
            IntegrityIssue::StaleSource {
                target,
                oid,
                owner_kind,
                owner,
            } => write!(f, "{target} {oid} lists {owner} in {owner_kind} without a reference"),
            IntegrityIssue::Orphan { target, oid } => write!(f, "{target} {oid} is not referenced"),
        }
    }
}

/// Back-references implied by the forward references of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackReferences {
    pub expected: BTreeMap<(EntityKind, Oid), Sources>,
    pub dangling: Vec<IntegrityIssue>,
}

impl BackReferences {
    /// Derive what every `sources` structure should contain.
    pub fn derive(mdv: &MetaDataVersion) -> Self {
        let mut refs = Self::default();
        for (group_oid, group) in &mdv.item_groups {
            for (item_ref_oid, item_ref) in &group.item_refs {
                refs.link(mdv, EntityKind::ItemDef, &item_ref.item_oid, SourceKind::ItemGroups, group_oid);
                if let Some(method_oid) = &item_ref.method_oid {
                    refs.link(mdv, EntityKind::Method, method_oid, SourceKind::ItemRefs, item_ref_oid);
                }
            }
            if let Some(comment_oid) = &group.comment_oid {
                refs.link(mdv, EntityKind::Comment, comment_oid, SourceKind::ItemGroups, group_oid);
            }
        }
        for (value_list_oid, value_list) in &mdv.value_lists {
            for (item_ref_oid, item_ref) in &value_list.item_refs {
                refs.link(mdv, EntityKind::ItemDef, &item_ref.item_oid, SourceKind::ValueLists, value_list_oid);
                if let Some(method_oid) = &item_ref.method_oid {
                    refs.link(mdv, EntityKind::Method, method_oid, SourceKind::ItemRefs, item_ref_oid);
                }
                if let Some(where_clause_oid) = &item_ref.where_clause_oid {
                    refs.link(
                        mdv,
                        EntityKind::WhereClause,
                        where_clause_oid,
                        SourceKind::ValueLists,
                        value_list_oid,
                    );
                }
            }
        }
        for (item_oid, item_def) in &mdv.item_defs {
            if let Some(comment_oid) = &item_def.comment_oid {
                refs.link(mdv, EntityKind::Comment, comment_oid, SourceKind::ItemDefs, item_oid);
            }
            if let Some(code_list_oid) = &item_def.code_list_oid {
                refs.link(mdv, EntityKind::CodeList, code_list_oid, SourceKind::ItemDefs, item_oid);
            }
            if let Some(value_list_oid) = &item_def.value_list_oid {
                refs.link(mdv, EntityKind::ValueList, value_list_oid, SourceKind::ItemDefs, item_oid);
            }
        }
        for (code_list_oid, code_list) in &mdv.code_lists {
            if let Some(comment_oid) = &code_list.comment_oid {
                refs.link(mdv, EntityKind::Comment, comment_oid, SourceKind::CodeLists, code_list_oid);
            }
        }
        for (where_clause_oid, where_clause) in &mdv.where_clauses {
            if let Some(comment_oid) = &where_clause.comment_oid {
                refs.link(mdv, EntityKind::Comment, comment_oid, SourceKind::WhereClauses, where_clause_oid);
            }
        }
        if let Some(comment_oid) = &mdv.comment_oid {
            refs.link(mdv, EntityKind::Comment, comment_oid, SourceKind::MetaDataVersion, &mdv.oid);
        }
        let arm = &mdv.analysis_result_displays;
        for (display_oid, display) in &arm.result_displays {
            for result_oid in &display.analysis_result_order {
                refs.link(mdv, EntityKind::AnalysisResult, result_oid, SourceKind::ResultDisplays, display_oid);
            }
        }
        for (result_oid, result) in &arm.analysis_results {
            for dataset in result.analysis_datasets.values() {
                if let Some(where_clause_oid) = &dataset.where_clause_oid {
                    refs.link(
                        mdv,
                        EntityKind::WhereClause,
                        where_clause_oid,
                        SourceKind::AnalysisResults,
                        result_oid,
                    );
                }
            }
            if let Some(comment_oid) = &result.analysis_datasets_comment_oid {
                refs.link(mdv, EntityKind::Comment, comment_oid, SourceKind::AnalysisResults, result_oid);
            }
        }
        refs
    }

    fn link(&mut self, mdv: &MetaDataVersion, target: EntityKind, oid: &Oid, owner_kind: SourceKind, owner: &Oid) {
        if exists(mdv, target, oid) {
            self.expected
                .entry((target, oid.clone()))
                .or_default()
                .push(owner_kind, owner);
        } else {
            let issue = IntegrityIssue::DanglingReference {
                owner_kind,
                owner: owner.clone(),
                target,
                oid: oid.clone(),
            };
            if !self.dangling.contains(&issue) {
                self.dangling.push(issue);
            }
        }
    }

    /// Expected sources of one entity.
    pub fn of(&self, target: EntityKind, oid: &Oid) -> Option<&Sources> {
        self.expected.get(&(target, oid.clone()))
    }
}

fn exists(mdv: &MetaDataVersion, kind: EntityKind, oid: &Oid) -> bool {
    match kind {
        EntityKind::ItemGroup => mdv.item_groups.contains_key(oid),
        EntityKind::ItemDef => mdv.item_defs.contains_key(oid),
        EntityKind::CodeList => mdv.code_lists.contains_key(oid),
        EntityKind::ValueList => mdv.value_lists.contains_key(oid),
        EntityKind::WhereClause => mdv.where_clauses.contains_key(oid),
        EntityKind::Comment => mdv.comments.contains_key(oid),
        EntityKind::Method => mdv.methods.contains_key(oid),
        EntityKind::ResultDisplay => mdv.analysis_result_displays.result_displays.contains_key(oid),
        EntityKind::AnalysisResult => mdv.analysis_result_displays.analysis_results.contains_key(oid),
        EntityKind::ItemRef => mdv.item_ref_oids().contains(&oid),
        EntityKind::CodeListItem => mdv
            .code_lists
            .values()
            .any(|code_list| code_list.item_keys().contains(&oid)),
    }
}

/// Every entity carrying a `sources` structure, with its kind.
pub fn referenced_entities(mdv: &MetaDataVersion) -> Vec<(EntityKind, &Oid, &Sources)> {
    fn collect<'m, T: Referenced>(
        out: &mut Vec<(EntityKind, &'m Oid, &'m Sources)>,
        kind: EntityKind,
        map: &'m BTreeMap<Oid, T>,
    ) {
        out.extend(map.iter().map(|(oid, entity)| (kind, oid, entity.sources())));
    }
    let mut out = Vec::new();
    collect(&mut out, EntityKind::ItemDef, &mdv.item_defs);
    collect(&mut out, EntityKind::ValueList, &mdv.value_lists);
    collect(&mut out, EntityKind::CodeList, &mdv.code_lists);
    collect(&mut out, EntityKind::WhereClause, &mdv.where_clauses);
    collect(&mut out, EntityKind::Comment, &mdv.comments);
    collect(&mut out, EntityKind::Method, &mdv.methods);
    collect(&mut out, EntityKind::AnalysisResult, &mdv.analysis_result_displays.analysis_results);
    out
}

/// Kinds that must not exist without a reference. Codelists may stay unused
/// until the document is saved.
fn must_be_referenced(kind: EntityKind) -> bool {
    !matches!(kind, EntityKind::CodeList)
}

/// Check the order lists and reference bookkeeping of a document.
pub fn check_integrity(mdv: &MetaDataVersion) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    check_orders(mdv, &mut issues);

    let back_references = BackReferences::derive(mdv);
    issues.extend(back_references.dangling.iter().cloned());
    let empty = Sources::new();
    for (target, oid, stored) in referenced_entities(mdv) {
        let expected = back_references.of(target, oid).unwrap_or(&empty);
        for (owner_kind, owner) in stored.edges() {
            if !expected.contains(owner_kind, owner) {
                issues.push(IntegrityIssue::StaleSource {
                    target,
                    oid: oid.clone(),
                    owner_kind,
                    owner: owner.clone(),
                });
            }
        }
        for (owner_kind, owner) in expected.edges() {
            if !stored.contains(owner_kind, owner) {
                issues.push(IntegrityIssue::MissingSource {
                    target,
                    oid: oid.clone(),
                    owner_kind,
                    owner: owner.clone(),
                });
            }
        }
        if expected.is_empty() && must_be_referenced(target) {
            issues.push(IntegrityIssue::Orphan {
                target,
                oid: oid.clone(),
            });
        }
    }
    issues
}

fn check_orders(mdv: &MetaDataVersion, issues: &mut Vec<IntegrityIssue>) {
    check_order(OrderList::ItemGroups, &mdv.item_group_order, mdv.item_groups.keys(), true, issues);
    check_order(OrderList::CodeLists, &mdv.code_list_order, mdv.code_lists.keys(), true, issues);
    for (oid, group) in &mdv.item_groups {
        check_order(
            OrderList::ItemRefs(VariableScope::ItemGroup(oid.clone())),
            &group.item_ref_order,
            group.item_refs.keys(),
            true,
            issues,
        );
        check_order(OrderList::KeyOrder(oid.clone()), &group.key_order, group.item_refs.keys(), false, issues);
    }
    for (oid, value_list) in &mdv.value_lists {
        check_order(
            OrderList::ItemRefs(VariableScope::ValueList(oid.clone())),
            &value_list.item_ref_order,
            value_list.item_refs.keys(),
            true,
            issues,
        );
    }
    for (oid, code_list) in &mdv.code_lists {
        if code_list.code_list_type != CodeListType::External {
            check_order(
                OrderList::CodeListItems(oid.clone()),
                &code_list.item_order,
                code_list.item_keys(),
                true,
                issues,
            );
        }
    }
    let arm = &mdv.analysis_result_displays;
    check_order(
        OrderList::ResultDisplays,
        &arm.result_display_order,
        arm.result_displays.keys(),
        true,
        issues,
    );
    for (oid, display) in &arm.result_displays {
        check_order(
            OrderList::AnalysisResults(oid.clone()),
            &display.analysis_result_order,
            arm.analysis_results.keys(),
            false,
            issues,
        );
    }
    for (oid, result) in &arm.analysis_results {
        check_order(
            OrderList::AnalysisDatasets(oid.clone()),
            &result.analysis_dataset_order,
            result.analysis_datasets.keys(),
            true,
            issues,
        );
    }
}

/// Compare an order list with the keys of its map. With `complete` unset the
/// order list may be a subset of the keys (key order, result display
/// contents).
fn check_order<'a>(
    list: OrderList,
    order: &[Oid],
    keys: impl IntoIterator<Item = &'a Oid>,
    complete: bool,
    issues: &mut Vec<IntegrityIssue>,
) {
    let keys: BTreeSet<&Oid> = keys.into_iter().collect();
    let mut listed = BTreeSet::new();
    for oid in order {
        let problem = if !keys.contains(oid) {
            OrderProblem::Dangling
        } else if !listed.insert(oid) {
            OrderProblem::Duplicate
        } else {
            continue;
        };
        issues.push(IntegrityIssue::Order {
            list: list.clone(),
            oid: oid.clone(),
            problem,
        });
    }
    if complete {
        for oid in keys.difference(&listed) {
            issues.push(IntegrityIssue::Order {
                list: list.clone(),
                oid: (*oid).clone(),
                problem: OrderProblem::Unlisted,
            });
        }
    }
}
