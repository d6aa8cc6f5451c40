//! Copying analysis results between documents.
//!
//! An analysis result is copied with the where clauses of its analysis
//! datasets and the comments attached to them. Every copied entity gets an
//! OID that is free in the target document and in the batch copied so far,
//! so the result maps can be merged into the target by key.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use define_model::{
    AnalysisDataset, AnalysisResult, Comment, EntityKind, ItemGroup, ItemRefContainer, MetaDataVersion, Oid,
    SourceKind, Sources, WhereClause, mint_oid,
};

use crate::error::{DefineError, Result};

/// Input of [`copy_analysis_results`].
#[derive(Debug, Clone, Copy)]
pub struct CopyRequest<'a> {
    pub target: &'a MetaDataVersion,
    pub source: &'a MetaDataVersion,
    /// Analysis results of `source` to copy, in output order. The same OID
    /// may be listed more than once to get several copies.
    pub analysis_result_oids: &'a [Oid],
    /// Reuse a target comment with identical text and documents instead of
    /// copying the source comment.
    pub search_for_duplicate: bool,
}

/// OIDs handed out by earlier copies of the same batch that are not in the
/// target document yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingOids {
    pub analysis_results: BTreeSet<Oid>,
    pub where_clauses: BTreeSet<Oid>,
    pub comments: BTreeSet<Oid>,
}

/// Entities produced by a copy, ready to be merged into the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopiedAnalysisResults {
    pub analysis_results: BTreeMap<Oid, AnalysisResult>,
    pub where_clauses: BTreeMap<Oid, WhereClause>,
    /// Comments created by the copy. None of them exists in the target.
    pub comments: BTreeMap<Oid, Comment>,
    /// Edges to add to comments that already live in the target.
    pub reused_comments: Vec<ReusedComment>,
    /// Minted analysis result OIDs in request order.
    pub analysis_result_order: Vec<Oid>,
}

/// A target comment picked up by a copied entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReusedComment {
    pub comment_oid: Oid,
    pub owner_kind: SourceKind,
    pub owner: Oid,
}

impl CopiedAnalysisResults {
    pub fn is_empty(&self) -> bool {
        self.analysis_results.is_empty()
    }
}

/// Copy analysis results from `request.source` for merging into
/// `request.target`.
///
/// Analysis datasets are matched to target datasets by OID when the names
/// agree, otherwise by name; datasets without a counterpart are dropped.
/// Analysis variables and where clause conditions are remapped to the
/// target variables of the same name.
pub fn copy_analysis_results(request: &CopyRequest<'_>, existing: &mut ExistingOids) -> Result<CopiedAnalysisResults> {
    let mut copier = Copier {
        request,
        existing,
        output: CopiedAnalysisResults::default(),
    };
    for oid in request.analysis_result_oids {
        copier.copy_result(oid)?;
    }
    debug!(
        results = copier.output.analysis_results.len(),
        where_clauses = copier.output.where_clauses.len(),
        comments = copier.output.comments.len(),
        "analysis results copied"
    );
    Ok(copier.output)
}

struct Copier<'r, 'a> {
    request: &'r CopyRequest<'a>,
    existing: &'r mut ExistingOids,
    output: CopiedAnalysisResults,
}

impl<'a> Copier<'_, 'a> {
    fn copy_result(&mut self, source_oid: &Oid) -> Result<()> {
        let source = self
            .request
            .source
            .analysis_result_displays
            .analysis_results
            .get(source_oid)
            .ok_or_else(|| DefineError::missing(EntityKind::AnalysisResult, source_oid))?;

        let oid = mint_oid(
            EntityKind::AnalysisResult,
            self.request
                .target
                .analysis_result_displays
                .analysis_results
                .keys()
                .chain(&self.existing.analysis_results),
        );
        self.existing.analysis_results.insert(oid.clone());

        let mut result = source.clone();
        result.oid = oid.clone();
        result.sources = Sources::new();
        result.analysis_datasets = BTreeMap::new();
        result.analysis_dataset_order = Vec::new();
        result.parameter_oid = source
            .parameter_oid
            .as_ref()
            .and_then(|parameter| self.target_item_by_source_item(parameter, None));

        let dataset_oids = source
            .analysis_dataset_order
            .iter()
            .chain(
                source
                    .analysis_datasets
                    .keys()
                    .filter(|oid| !source.analysis_dataset_order.contains(*oid)),
            );
        for dataset_oid in dataset_oids {
            let Some(dataset) = source.analysis_datasets.get(dataset_oid) else {
                continue;
            };
            if let Some(copied) = self.copy_dataset(dataset, &oid)
                && !result.analysis_datasets.contains_key(&copied.item_group_oid)
            {
                result.analysis_dataset_order.push(copied.item_group_oid.clone());
                result.analysis_datasets.insert(copied.item_group_oid.clone(), copied);
            }
        }

        result.analysis_datasets_comment_oid = source
            .analysis_datasets_comment_oid
            .as_ref()
            .and_then(|comment_oid| self.copy_comment(comment_oid, SourceKind::AnalysisResults, &oid));

        debug!(source_oid = %source_oid, %oid, datasets = result.analysis_datasets.len(), "analysis result copied");
        self.output.analysis_result_order.push(oid.clone());
        self.output.analysis_results.insert(oid, result);
        Ok(())
    }

    fn copy_dataset(&mut self, dataset: &AnalysisDataset, result_oid: &Oid) -> Option<AnalysisDataset> {
        let Some(source_group) = self.request.source.item_groups.get(&dataset.item_group_oid) else {
            debug!(item_group_oid = %dataset.item_group_oid, "analysis dataset over unknown source dataset dropped");
            return None;
        };
        let Some(target_group) = self.target_group(source_group) else {
            debug!(dataset = %source_group.name, "no matching target dataset, analysis dataset dropped");
            return None;
        };
        let target_group_oid = target_group.oid.clone();
        let analysis_variable_oids = dataset
            .analysis_variable_oids
            .iter()
            .filter_map(|item_oid| self.target_item_by_source_item(item_oid, Some(target_group)))
            .collect();
        let where_clause_oid = dataset
            .where_clause_oid
            .as_ref()
            .and_then(|wc| self.copy_where_clause(wc, target_group, result_oid));
        Some(AnalysisDataset {
            item_group_oid: target_group_oid,
            where_clause_oid,
            analysis_variable_oids,
        })
    }

    /// Target dataset with the same OID and name, or else the same name.
    fn target_group(&self, source_group: &ItemGroup) -> Option<&'a ItemGroup> {
        let target: &'a MetaDataVersion = self.request.target;
        target
            .item_groups
            .get(&source_group.oid)
            .filter(|group| group.name.eq_ignore_ascii_case(&source_group.name))
            .or_else(|| target.item_group_by_name(&source_group.name))
    }

    /// Target variable with the same name as the source variable
    /// `source_item_oid`, looked up in `group` first and then in the whole
    /// target document.
    fn target_item_by_source_item(&self, source_item_oid: &Oid, group: Option<&ItemGroup>) -> Option<Oid> {
        let name = &self.request.source.item_defs.get(source_item_oid)?.name;
        let target = self.request.target;
        let same_name = |item_oid: &Oid| {
            target
                .item_defs
                .get(item_oid)
                .is_some_and(|item_def| {
                    item_def.name.eq_ignore_ascii_case(name) && item_def.parent_item_def_oid.is_none()
                })
        };
        if let Some(group) = group
            && let Some((_, item_ref)) = group
                .ordered_item_refs()
                .into_iter()
                .find(|(_, item_ref)| same_name(&item_ref.item_oid))
        {
            return Some(item_ref.item_oid.clone());
        }
        target.item_defs.keys().find(|oid| same_name(*oid)).cloned()
    }

    fn copy_where_clause(&mut self, source_oid: &Oid, target_group: &ItemGroup, result_oid: &Oid) -> Option<Oid> {
        let source = self.request.source.where_clauses.get(source_oid)?;
        let oid = mint_oid(
            EntityKind::WhereClause,
            self.request
                .target
                .where_clauses
                .keys()
                .chain(&self.existing.where_clauses),
        );
        self.existing.where_clauses.insert(oid.clone());

        let mut where_clause = source.clone();
        where_clause.oid = oid.clone();
        where_clause.sources = Sources::single(SourceKind::AnalysisResults, result_oid);
        where_clause.range_checks = source
            .range_checks
            .iter()
            .filter_map(|check| {
                let item_oid = self.target_item_by_source_item(&check.item_oid, Some(target_group))?;
                let mut check = check.clone();
                check.item_oid = item_oid;
                check.item_group_oid = check.item_group_oid.as_ref().map(|_| target_group.oid.clone());
                Some(check)
            })
            .collect();
        where_clause.comment_oid = source
            .comment_oid
            .as_ref()
            .and_then(|comment_oid| self.copy_comment(comment_oid, SourceKind::WhereClauses, &oid));
        self.output.where_clauses.insert(oid.clone(), where_clause);
        Some(oid)
    }

    fn copy_comment(&mut self, source_oid: &Oid, kind: SourceKind, owner: &Oid) -> Option<Oid> {
        let source = self.request.source.comments.get(source_oid)?;
        if self.request.search_for_duplicate {
            if let Some(comment) = self
                .output
                .comments
                .values_mut()
                .find(|candidate| candidate.same_content(source))
            {
                comment.sources.push(kind, owner);
                debug!(comment_oid = %comment.oid, %owner, "copied comment shared");
                return Some(comment.oid.clone());
            }
            if let Some(comment) = self
                .request
                .target
                .comments
                .values()
                .find(|candidate| candidate.same_content(source))
            {
                let reused = ReusedComment {
                    comment_oid: comment.oid.clone(),
                    owner_kind: kind,
                    owner: owner.clone(),
                };
                if !self.output.reused_comments.contains(&reused) {
                    self.output.reused_comments.push(reused);
                }
                debug!(comment_oid = %comment.oid, %owner, "duplicate comment reused");
                return Some(comment.oid.clone());
            }
        }

        let oid = mint_oid(
            EntityKind::Comment,
            self.request.target.comments.keys().chain(&self.existing.comments),
        );
        self.existing.comments.insert(oid.clone());
        let mut comment = source.clone();
        comment.oid = oid.clone();
        comment.sources = Sources::single(kind, owner);
        self.output.comments.insert(oid.clone(), comment);
        Some(oid)
    }
}
