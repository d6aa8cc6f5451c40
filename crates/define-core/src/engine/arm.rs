//! Analysis Results Metadata edits.

use std::collections::BTreeSet;

use tracing::debug;

use define_model::{EntityKind, Oid, ResultDisplay, SourceKind, TranslatedText, mint_oid};

use super::{Editor, insert_at};
use crate::copy::CopiedAnalysisResults;
use crate::error::{DefineError, Result};
use crate::reference::retain;

impl Editor<'_> {
    pub(crate) fn add_result_display(&mut self, name: &str, description: Option<&str>, position: Option<usize>) -> Oid {
        let arm = &mut self.mdv.analysis_result_displays;
        let oid = mint_oid(EntityKind::ResultDisplay, arm.result_displays.keys());
        let mut display = ResultDisplay::new(oid.clone(), name);
        if let Some(description) = description {
            display.descriptions = vec![TranslatedText::new(description)];
        }
        arm.result_displays.insert(oid.clone(), display);
        insert_at(&mut arm.result_display_order, position, oid.clone());
        debug!(result_display_oid = %oid, "result display added");
        oid
    }

    /// Delete result displays together with their analysis results.
    pub(crate) fn delete_result_displays(&mut self, result_display_oids: &[Oid]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for oid in result_display_oids {
            if !seen.insert(oid) {
                continue;
            }
            let arm = &mut self.mdv.analysis_result_displays;
            let removed = arm
                .result_displays
                .remove(oid)
                .ok_or_else(|| DefineError::missing(EntityKind::ResultDisplay, oid))?;
            arm.result_display_order.retain(|entry| entry != oid);
            let result_count = removed.analysis_result_order.len();
            debug!(result_display_oid = %oid, results = result_count, "result display deleted");
            let owned: Vec<Oid> = removed
                .analysis_result_order
                .into_iter()
                .filter(|result_oid| arm.analysis_results.contains_key(result_oid))
                .collect();
            self.delete_analysis_results(&owned)?;
        }
        Ok(())
    }

    /// Delete analysis results, releasing the where clauses of their analysis
    /// datasets and the comment of their dataset list.
    pub(crate) fn delete_analysis_results(&mut self, analysis_result_oids: &[Oid]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for oid in analysis_result_oids {
            if !seen.insert(oid) {
                continue;
            }
            let arm = &mut self.mdv.analysis_result_displays;
            let result = arm
                .analysis_results
                .remove(oid)
                .ok_or_else(|| DefineError::missing(EntityKind::AnalysisResult, oid))?;
            for display in arm.result_displays.values_mut() {
                display.analysis_result_order.retain(|entry| entry != oid);
            }
            debug!(analysis_result_oid = %oid, "analysis result deleted");

            let mut where_clause_oids: Vec<&Oid> = Vec::new();
            for dataset in result.analysis_datasets.values() {
                if let Some(where_clause_oid) = &dataset.where_clause_oid
                    && !where_clause_oids.contains(&where_clause_oid)
                {
                    where_clause_oids.push(where_clause_oid);
                }
            }
            for where_clause_oid in where_clause_oids {
                self.release_where_clause(where_clause_oid, SourceKind::AnalysisResults, oid);
            }
            if let Some(comment_oid) = &result.analysis_datasets_comment_oid {
                self.release_comment(comment_oid, SourceKind::AnalysisResults, oid);
            }
        }
        Ok(())
    }

    /// Merge copied analysis results into a result display.
    ///
    /// The copied maps are merged by key and must not collide with entities
    /// of the document. Comments reused from the document only gain the
    /// edges listed in `reused_comments`.
    pub(crate) fn add_analysis_results(
        &mut self,
        result_display_oid: &Oid,
        results: &CopiedAnalysisResults,
        position: Option<usize>,
    ) -> Result<()> {
        if !self
            .mdv
            .analysis_result_displays
            .result_displays
            .contains_key(result_display_oid)
        {
            return Err(DefineError::missing(EntityKind::ResultDisplay, result_display_oid));
        }
        if let Some(oid) = results
            .analysis_results
            .keys()
            .find(|oid| self.mdv.analysis_result_displays.analysis_results.contains_key(*oid))
        {
            return Err(DefineError::DuplicateOid {
                kind: EntityKind::AnalysisResult,
                oid: oid.clone(),
            });
        }

        if let Some(oid) = results.comments.keys().find(|oid| self.mdv.comments.contains_key(*oid)) {
            return Err(DefineError::DuplicateOid {
                kind: EntityKind::Comment,
                oid: oid.clone(),
            });
        }
        if let Some(oid) = results
            .where_clauses
            .keys()
            .find(|oid| self.mdv.where_clauses.contains_key(*oid))
        {
            return Err(DefineError::DuplicateOid {
                kind: EntityKind::WhereClause,
                oid: oid.clone(),
            });
        }

        for (oid, comment) in &results.comments {
            self.mdv.comments.insert(oid.clone(), comment.clone());
        }
        for reused in &results.reused_comments {
            if !retain(&mut self.mdv.comments, &reused.comment_oid, reused.owner_kind, &reused.owner) {
                return Err(DefineError::missing(EntityKind::Comment, &reused.comment_oid));
            }
        }
        for (oid, where_clause) in &results.where_clauses {
            self.mdv.where_clauses.insert(oid.clone(), where_clause.clone());
        }

        let arm = &mut self.mdv.analysis_result_displays;
        for (oid, result) in &results.analysis_results {
            let mut result = result.clone();
            result.sources.push(SourceKind::ResultDisplays, result_display_oid);
            arm.analysis_results.insert(oid.clone(), result);
        }
        let mut order: Vec<Oid> = results.analysis_result_order.clone();
        for oid in results.analysis_results.keys() {
            if !order.contains(oid) {
                order.push(oid.clone());
            }
        }
        if let Some(display) = arm.result_displays.get_mut(result_display_oid) {
            let mut position = position;
            for oid in order {
                insert_at(&mut display.analysis_result_order, position, oid);
                position = position.map(|index| index + 1);
            }
        }
        debug!(
            %result_display_oid,
            results = results.analysis_results.len(),
            where_clauses = results.where_clauses.len(),
            comments = results.comments.len(),
            reused_comments = results.reused_comments.len(),
            "analysis results merged"
        );
        Ok(())
    }
}
