#![allow(dead_code)]

use define_model::{
    AnalysisDataset, AnalysisResult, CodeList, CodeListItem, CodeListType, Comment, Comparator, DataType,
    DefineDocument, DefineVersion, ItemDef, ItemGroup, ItemRef, MetaDataVersion, Method, Oid, RangeCheck,
    ResultDisplay, SourceKind, Sources, TranslatedText, ValueList, WhereClause,
};

pub fn oid(value: &str) -> Oid {
    Oid::from(value)
}

pub fn item_def(mdv: &mut MetaDataVersion, oid: &str, name: &str, data_type: DataType) {
    mdv.item_defs
        .insert(Oid::from(oid), ItemDef::new(oid, name, data_type).with_label(name));
}

/// Insert a dataset with `(item ref, item def)` pairs and record the
/// dataset as owner of each definition.
pub fn item_group(mdv: &mut MetaDataVersion, oid: &str, name: &str, refs: &[(&str, &str)]) {
    let mut group = ItemGroup::new(oid, name);
    group.domain = Some(name.to_string());
    for (item_ref_oid, item_oid) in refs {
        group.item_refs.insert(Oid::from(*item_ref_oid), ItemRef::new(*item_oid));
        group.item_ref_order.push(Oid::from(*item_ref_oid));
        if let Some(item_def) = mdv.item_defs.get_mut(*item_oid) {
            item_def.sources.push(SourceKind::ItemGroups, oid);
        }
    }
    mdv.item_groups.insert(Oid::from(oid), group);
    mdv.item_group_order.push(Oid::from(oid));
}

/// Insert a value list under `parent` with `(item ref, item def, where clause)`
/// triples.
pub fn value_list(mdv: &mut MetaDataVersion, oid: &str, parent: &str, refs: &[(&str, &str, &str)]) {
    let mut value_list = ValueList::new(oid);
    value_list.sources = Sources::single(SourceKind::ItemDefs, parent);
    for (item_ref_oid, item_oid, where_clause_oid) in refs {
        value_list.item_refs.insert(
            Oid::from(*item_ref_oid),
            ItemRef {
                where_clause_oid: Some(Oid::from(*where_clause_oid)),
                ..ItemRef::new(*item_oid)
            },
        );
        value_list.item_ref_order.push(Oid::from(*item_ref_oid));
        if let Some(item_def) = mdv.item_defs.get_mut(*item_oid) {
            item_def.sources.push(SourceKind::ValueLists, oid);
            item_def.parent_item_def_oid = Some(Oid::from(parent));
        }
        if let Some(where_clause) = mdv.where_clauses.get_mut(*where_clause_oid) {
            where_clause.sources.push(SourceKind::ValueLists, oid);
        }
    }
    if let Some(item_def) = mdv.item_defs.get_mut(parent) {
        item_def.value_list_oid = Some(Oid::from(oid));
    }
    mdv.value_lists.insert(Oid::from(oid), value_list);
}

pub fn where_clause(mdv: &mut MetaDataVersion, oid: &str, item_oid: &str, value: &str) {
    mdv.where_clauses.insert(
        Oid::from(oid),
        WhereClause::new(oid, vec![RangeCheck::new(item_oid, Comparator::Eq, [value])]),
    );
}

/// Create the comment if needed and record `(kind, owner)` on it.
pub fn comment(mdv: &mut MetaDataVersion, oid: &str, text: &str, kind: SourceKind, owner: &str) {
    mdv.comments
        .entry(Oid::from(oid))
        .or_insert_with(|| Comment::new(oid, text))
        .sources
        .push(kind, owner);
}

pub fn severity_code_list() -> CodeList {
    let mut code_list = CodeList::new("CL.SEVERITY", "Severity/Intensity Scale", CodeListType::Decoded);
    for (index, (coded, decode)) in [("MILD", "Mild"), ("MODERATE", "Moderate"), ("SEVERE", "Severe")]
        .into_iter()
        .enumerate()
    {
        let item_oid = Oid::from(format!("CLI.{}", index + 1));
        code_list.code_list_items.insert(
            item_oid.clone(),
            CodeListItem {
                coded_value: coded.to_string(),
                decodes: vec![TranslatedText::new(decode)],
                ..CodeListItem::default()
            },
        );
        code_list.item_order.push(item_oid);
    }
    code_list
}

/// AE and LB datasets sharing `IT.STUDYID` and comment `COM.1`, a codelist
/// with a single owner, value-level metadata on `IT.LB.LBORRES` and one
/// analysis result over LB.
pub fn sample_mdv() -> MetaDataVersion {
    let mut mdv = MetaDataVersion::new("MDV.STUDY01", "Study 01 SDTM");
    mdv.define_version = DefineVersion::V2_1;

    item_def(&mut mdv, "IT.STUDYID", "STUDYID", DataType::Text);
    item_def(&mut mdv, "IT.AE.AETERM", "AETERM", DataType::Text);
    item_def(&mut mdv, "IT.AE.AESEV", "AESEV", DataType::Text);
    item_def(&mut mdv, "IT.LB.LBTESTCD", "LBTESTCD", DataType::Text);
    item_def(&mut mdv, "IT.LB.LBORRES", "LBORRES", DataType::Text);
    item_def(&mut mdv, "IT.LB.LBORRES.GLUC", "LBORRES", DataType::Float);
    item_def(&mut mdv, "IT.LB.LBORRES.ALB", "LBORRES", DataType::Float);

    item_group(
        &mut mdv,
        "IG.AE",
        "AE",
        &[("IR.1", "IT.STUDYID"), ("IR.2", "IT.AE.AETERM"), ("IR.3", "IT.AE.AESEV")],
    );
    item_group(
        &mut mdv,
        "IG.LB",
        "LB",
        &[("IR.4", "IT.STUDYID"), ("IR.5", "IT.LB.LBTESTCD"), ("IR.6", "IT.LB.LBORRES")],
    );
    if let Some(group) = mdv.item_groups.get_mut("IG.AE") {
        group.key_order.push(Oid::from("IR.1"));
    }

    let mut code_list = severity_code_list();
    code_list.sources = Sources::single(SourceKind::ItemDefs, "IT.AE.AESEV");
    mdv.code_lists.insert(code_list.oid.clone(), code_list);
    mdv.code_list_order.push(Oid::from("CL.SEVERITY"));
    if let Some(aesev) = mdv.item_defs.get_mut("IT.AE.AESEV") {
        aesev.code_list_oid = Some(Oid::from("CL.SEVERITY"));
        aesev.length_as_code_list = true;
    }

    let mut method = Method::new("MT.1", "Severity derivation", "Highest severity reported");
    method.sources = Sources::single(SourceKind::ItemRefs, "IR.3");
    mdv.methods.insert(method.oid.clone(), method);
    if let Some(item_ref) = mdv
        .item_groups
        .get_mut("IG.AE")
        .and_then(|group| group.item_refs.get_mut("IR.3"))
    {
        item_ref.method_oid = Some(Oid::from("MT.1"));
    }

    comment(&mut mdv, "COM.1", "Collected verbatim", SourceKind::ItemDefs, "IT.AE.AETERM");
    comment(&mut mdv, "COM.1", "Collected verbatim", SourceKind::ItemDefs, "IT.LB.LBTESTCD");
    for item_oid in ["IT.AE.AETERM", "IT.LB.LBTESTCD"] {
        if let Some(item_def) = mdv.item_defs.get_mut(item_oid) {
            item_def.comment_oid = Some(Oid::from("COM.1"));
        }
    }

    where_clause(&mut mdv, "WC.1", "IT.LB.LBTESTCD", "GLUC");
    where_clause(&mut mdv, "WC.2", "IT.LB.LBTESTCD", "ALB");
    comment(&mut mdv, "COM.2", "Fasting samples only", SourceKind::WhereClauses, "WC.1");
    if let Some(wc) = mdv.where_clauses.get_mut("WC.1") {
        wc.comment_oid = Some(Oid::from("COM.2"));
    }
    value_list(
        &mut mdv,
        "VL.LB.LBORRES",
        "IT.LB.LBORRES",
        &[("IR.7", "IT.LB.LBORRES.GLUC", "WC.1"), ("IR.8", "IT.LB.LBORRES.ALB", "WC.2")],
    );

    where_clause(&mut mdv, "WC.3", "IT.LB.LBTESTCD", "GLUC");
    if let Some(wc) = mdv.where_clauses.get_mut("WC.3") {
        wc.sources = Sources::single(SourceKind::AnalysisResults, "AR.1");
    }
    comment(&mut mdv, "COM.3", "Safety population", SourceKind::AnalysisResults, "AR.1");

    let mut result = AnalysisResult::new("AR.1", "Summary of fasting glucose");
    result.parameter_oid = Some(Oid::from("IT.LB.LBTESTCD"));
    result.analysis_datasets.insert(
        Oid::from("IG.LB"),
        AnalysisDataset {
            item_group_oid: Oid::from("IG.LB"),
            where_clause_oid: Some(Oid::from("WC.3")),
            analysis_variable_oids: vec![Oid::from("IT.LB.LBORRES")],
        },
    );
    result.analysis_dataset_order.push(Oid::from("IG.LB"));
    result.analysis_datasets_comment_oid = Some(Oid::from("COM.3"));
    result.sources = Sources::single(SourceKind::ResultDisplays, "RD.1");

    let mut display = ResultDisplay::new("RD.1", "Table 14.3.1");
    display.analysis_result_order.push(Oid::from("AR.1"));
    let arm = &mut mdv.analysis_result_displays;
    arm.result_displays.insert(display.oid.clone(), display);
    arm.result_display_order.push(Oid::from("RD.1"));
    arm.analysis_results.insert(result.oid.clone(), result);

    mdv
}

pub fn sample_document() -> DefineDocument {
    DefineDocument::new("STUDY01", sample_mdv())
}
