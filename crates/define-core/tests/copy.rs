mod common;

use std::sync::Arc;

use common::{comment, item_def, item_group, oid, sample_mdv};
use define_core::{
    Action, CopiedAnalysisResults, CopyRequest, DefineError, ExistingOids, ReusedComment, apply_action,
    check_integrity, copy_analysis_results,
};
use define_model::{AnalysisDataset, DataType, MetaDataVersion, Oid, ResultDisplay, SourceKind, Sources};

/// ADaM-like target whose LB dataset has other OIDs than the sample and
/// whose document comment matches the sample's analysis comment.
fn target() -> MetaDataVersion {
    let mut mdv = MetaDataVersion::new("MDV.TARGET", "Target study");
    item_def(&mut mdv, "IT.LB2.LBTESTCD", "LBTESTCD", DataType::Text);
    item_def(&mut mdv, "IT.LB2.LBORRES", "LBORRES", DataType::Text);
    item_group(
        &mut mdv,
        "IG.LB2",
        "LB",
        &[("IR.1", "IT.LB2.LBTESTCD"), ("IR.2", "IT.LB2.LBORRES")],
    );
    comment(&mut mdv, "COM.1", "Safety population", SourceKind::MetaDataVersion, "MDV.TARGET");
    mdv.comment_oid = Some(oid("COM.1"));
    let arm = &mut mdv.analysis_result_displays;
    arm.result_displays
        .insert(oid("RD.1"), ResultDisplay::new("RD.1", "Table 14.3.1"));
    arm.result_display_order.push(oid("RD.1"));
    mdv
}

fn copy(
    target: &MetaDataVersion,
    source: &MetaDataVersion,
    oids: &[Oid],
    search_for_duplicate: bool,
    existing: &mut ExistingOids,
) -> CopiedAnalysisResults {
    let request = CopyRequest {
        target,
        source,
        analysis_result_oids: oids,
        search_for_duplicate,
    };
    copy_analysis_results(&request, existing).expect("copy succeeds")
}

fn merge(target: MetaDataVersion, results: CopiedAnalysisResults) -> Arc<MetaDataVersion> {
    let state = Arc::new(target);
    let next = apply_action(
        &state,
        &Action::AddAnalysisResults {
            result_display_oid: oid("RD.1"),
            results,
            position: None,
        },
    )
    .expect("merge applies");
    assert_eq!(check_integrity(&next), Vec::new());
    next
}

#[test]
fn datasets_and_variables_are_matched_by_name() {
    let target = target();
    let copied = copy(&target, &sample_mdv(), &[oid("AR.1")], false, &mut ExistingOids::default());

    let result = &copied.analysis_results["AR.1"];
    assert!(result.sources.is_empty());
    assert_eq!(result.parameter_oid, Some(oid("IT.LB2.LBTESTCD")));
    assert_eq!(result.analysis_dataset_order, [oid("IG.LB2")]);
    let dataset = &result.analysis_datasets["IG.LB2"];
    assert_eq!(dataset.analysis_variable_oids, [oid("IT.LB2.LBORRES")]);

    let where_clause_oid = dataset.where_clause_oid.clone().expect("where clause copied");
    assert_eq!(where_clause_oid, "WC.1");
    let where_clause = &copied.where_clauses[&where_clause_oid];
    assert_eq!(where_clause.sources, Sources::single(SourceKind::AnalysisResults, "AR.1"));
    assert_eq!(where_clause.range_checks[0].item_oid, "IT.LB2.LBTESTCD");
    assert_eq!(where_clause.range_checks[0].check_values, ["GLUC"]);

    // no duplicate search: the comment is copied under a fresh OID
    assert_eq!(result.analysis_datasets_comment_oid, Some(oid("COM.2")));
    assert_eq!(
        copied.comments["COM.2"].sources,
        Sources::single(SourceKind::AnalysisResults, "AR.1")
    );

    let merged = merge(target, copied);
    assert_eq!(merged.analysis_result_displays.result_displays["RD.1"].analysis_result_order, [oid("AR.1")]);
    assert_eq!(
        merged.analysis_result_displays.analysis_results["AR.1"].sources.owners(SourceKind::ResultDisplays),
        ["RD.1"]
    );
}

#[test]
fn duplicate_comment_is_reused() {
    let target = target();
    let copied = copy(&target, &sample_mdv(), &[oid("AR.1")], true, &mut ExistingOids::default());

    let result = &copied.analysis_results["AR.1"];
    assert_eq!(result.analysis_datasets_comment_oid, Some(oid("COM.1")));
    assert!(copied.comments.is_empty());
    assert_eq!(
        copied.reused_comments,
        [ReusedComment {
            comment_oid: oid("COM.1"),
            owner_kind: SourceKind::AnalysisResults,
            owner: oid("AR.1"),
        }]
    );

    let merged = merge(target, copied);
    assert_eq!(merged.comments.len(), 1);
    let reused = &merged.comments["COM.1"];
    assert_eq!(reused.sources.owners(SourceKind::MetaDataVersion), ["MDV.TARGET"]);
    assert_eq!(reused.sources.owners(SourceKind::AnalysisResults), ["AR.1"]);
}

#[test]
fn reused_comment_keeps_owners_across_merged_batches() {
    let target = target();
    let source = sample_mdv();
    let mut existing = ExistingOids::default();
    let first = copy(&target, &source, &[oid("AR.1")], true, &mut existing);
    let second = copy(&target, &source, &[oid("AR.1")], true, &mut existing);
    assert_eq!(second.analysis_result_order, [oid("AR.2")]);

    let merged = merge(target, first);
    let next = apply_action(
        &merged,
        &Action::AddAnalysisResults {
            result_display_oid: oid("RD.1"),
            results: second,
            position: None,
        },
    )
    .expect("second merge applies");

    assert_eq!(check_integrity(&next), Vec::new());
    let shared = &next.comments["COM.1"];
    assert_eq!(shared.sources.owners(SourceKind::AnalysisResults), ["AR.1", "AR.2"]);
    assert_eq!(shared.sources.owners(SourceKind::MetaDataVersion), ["MDV.TARGET"]);

    // releasing one copy keeps the comment for the other
    let after_delete = apply_action(
        &next,
        &Action::DeleteAnalysisResults {
            analysis_result_oids: vec![oid("AR.1")],
        },
    )
    .expect("delete applies");
    assert_eq!(check_integrity(&after_delete), Vec::new());
    assert_eq!(
        after_delete.comments["COM.1"].sources.owners(SourceKind::AnalysisResults),
        ["AR.2"]
    );
}

#[test]
fn merge_rejects_a_reused_comment_that_is_gone() {
    let target = target();
    let copied = copy(&target, &sample_mdv(), &[oid("AR.1")], true, &mut ExistingOids::default());

    let mut changed = target.clone();
    changed.comments.clear();
    changed.comment_oid = None;
    let state = Arc::new(changed);
    let error = apply_action(
        &state,
        &Action::AddAnalysisResults {
            result_display_oid: oid("RD.1"),
            results: copied,
            position: None,
        },
    )
    .unwrap_err();
    assert!(matches!(error, DefineError::MissingEntity { .. }), "{error}");
    assert!(state.analysis_result_displays.analysis_results.is_empty());
}

#[test]
fn merging_new_comment_over_existing_oid_is_rejected() {
    let target = target();
    let copied = copy(&target, &sample_mdv(), &[oid("AR.1")], false, &mut ExistingOids::default());
    assert!(copied.comments.contains_key("COM.2"));

    let mut changed = target.clone();
    comment(&mut changed, "COM.2", "Added after the copy", SourceKind::MetaDataVersion, "MDV.TARGET");
    let error = apply_action(
        &Arc::new(changed),
        &Action::AddAnalysisResults {
            result_display_oid: oid("RD.1"),
            results: copied,
            position: None,
        },
    )
    .unwrap_err();
    assert!(matches!(error, DefineError::DuplicateOid { .. }), "{error}");
}

#[test]
fn datasets_without_counterpart_are_dropped() {
    let mut source = sample_mdv();
    if let Some(result) = source.analysis_result_displays.analysis_results.get_mut("AR.1") {
        result.analysis_datasets.insert(
            oid("IG.AE"),
            AnalysisDataset {
                item_group_oid: oid("IG.AE"),
                where_clause_oid: None,
                analysis_variable_oids: vec![oid("IT.AE.AESEV")],
            },
        );
        result.analysis_dataset_order.push(oid("IG.AE"));
    }
    let copied = copy(&target(), &source, &[oid("AR.1")], false, &mut ExistingOids::default());
    let result = &copied.analysis_results["AR.1"];
    assert_eq!(result.analysis_dataset_order, [oid("IG.LB2")]);
    assert!(!result.analysis_datasets.contains_key("IG.AE"));
}

#[test]
fn oids_handed_out_earlier_in_the_batch_are_not_reused() {
    let target = target();
    let source = sample_mdv();
    let mut existing = ExistingOids::default();
    let first = copy(&target, &source, &[oid("AR.1")], false, &mut existing);
    let second = copy(&target, &source, &[oid("AR.1")], false, &mut existing);

    assert_eq!(first.analysis_result_order, [oid("AR.1")]);
    assert_eq!(second.analysis_result_order, [oid("AR.2")]);
    assert!(second.where_clauses.contains_key("WC.2"));
    assert!(second.comments.contains_key("COM.3"));
    assert_eq!(existing.analysis_results.len(), 2);

    // both batches merge by plain key union
    let merged = merge(target, first);
    let next = apply_action(
        &merged,
        &Action::AddAnalysisResults {
            result_display_oid: oid("RD.1"),
            results: second,
            position: Some(0),
        },
    )
    .expect("second merge applies");
    assert_eq!(check_integrity(&next), Vec::new());
    assert_eq!(
        next.analysis_result_displays.result_displays["RD.1"].analysis_result_order,
        [oid("AR.2"), oid("AR.1")]
    );
}

#[test]
fn copy_into_the_same_document_mints_new_oids() {
    let mdv = sample_mdv();
    let copied = copy(&mdv, &mdv, &[oid("AR.1"), oid("AR.1")], true, &mut ExistingOids::default());
    assert_eq!(copied.analysis_result_order, [oid("AR.2"), oid("AR.3")]);
    assert_eq!(copied.where_clauses.keys().collect::<Vec<_>>(), [&oid("WC.4"), &oid("WC.5")]);
    assert!(copied.comments.is_empty());
    let owners: Vec<&Oid> = copied.reused_comments.iter().map(|reused| &reused.owner).collect();
    assert_eq!(owners, [&oid("AR.2"), &oid("AR.3")]);
    let merged = merge(mdv, copied);
    assert_eq!(merged.analysis_result_displays.analysis_results.len(), 3);
    assert_eq!(
        merged.comments["COM.3"].sources.owners(SourceKind::AnalysisResults),
        ["AR.1", "AR.2", "AR.3"]
    );
}

#[test]
fn unknown_source_result_is_an_error() {
    let target = target();
    let source = sample_mdv();
    let oids = [oid("AR.9")];
    let request = CopyRequest {
        target: &target,
        source: &source,
        analysis_result_oids: &oids,
        search_for_duplicate: false,
    };
    let error = copy_analysis_results(&request, &mut ExistingOids::default()).unwrap_err();
    assert!(matches!(error, DefineError::MissingEntity { .. }), "{error}");
}

#[test]
fn merging_over_taken_oid_is_rejected() {
    let mdv = sample_mdv();
    let mut copied = copy(&mdv, &mdv, &[oid("AR.1")], false, &mut ExistingOids::default());
    let result = copied.analysis_results.remove("AR.2").expect("copied result");
    copied.analysis_results.insert(oid("AR.1"), result);

    let state = Arc::new(mdv);
    let error = apply_action(
        &state,
        &Action::AddAnalysisResults {
            result_display_oid: oid("RD.1"),
            results: copied,
            position: None,
        },
    )
    .unwrap_err();
    assert!(matches!(error, DefineError::DuplicateOid { .. }), "{error}");
}
