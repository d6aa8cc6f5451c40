//! Integration tests for the CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;

use define_cli::cli::{ApplyArgs, CheckArgs, Cli, Command, CopyResultsArgs, DefineVersionArg, SaveArgs};
use define_cli::commands::{load_document, run_apply, run_check, run_copy_results, run_save};
use define_cli::config::CliConfig;
use define_cli::summary::{render_apply, render_check};
use define_cli::types::CopiedResult;
use define_core::{OrderList, Repair};
use define_model::{
    AnalysisDataset, AnalysisResult, CodeList, CodeListItem, CodeListType, DataType, DefineDocument, DefineVersion,
    ItemDef, ItemGroup, ItemRef, MetaDataVersion, Oid, ResultDisplay, SourceKind, Sources, TranslatedText,
};

fn oid(value: &str) -> Oid {
    Oid::from(value)
}

/// AE dataset with a severity codelist and one analysis result over AE.
fn sample_document() -> DefineDocument {
    let mut mdv = MetaDataVersion::new("MDV.STUDY01", "Study 01 SDTM");
    mdv.define_version = DefineVersion::V2_1;

    let mut group = ItemGroup::new("IG.AE", "AE");
    for (index, (item_oid, name)) in [("IT.STUDYID", "STUDYID"), ("IT.AE.AETERM", "AETERM"), ("IT.AE.AESEV", "AESEV")]
        .into_iter()
        .enumerate()
    {
        let mut item_def = ItemDef::new(item_oid, name, DataType::Text).with_label(name);
        item_def.sources = Sources::single(SourceKind::ItemGroups, "IG.AE");
        mdv.item_defs.insert(oid(item_oid), item_def);
        let item_ref_oid = oid(&format!("IR.{}", index + 1));
        group.item_refs.insert(item_ref_oid.clone(), ItemRef::new(item_oid));
        group.item_ref_order.push(item_ref_oid);
    }
    mdv.item_groups.insert(oid("IG.AE"), group);
    mdv.item_group_order.push(oid("IG.AE"));

    let mut code_list = CodeList::new("CL.SEVERITY", "Severity/Intensity Scale", CodeListType::Decoded);
    for (index, coded) in ["MILD", "MODERATE", "SEVERE"].into_iter().enumerate() {
        let item_oid = oid(&format!("CLI.{}", index + 1));
        code_list.code_list_items.insert(
            item_oid.clone(),
            CodeListItem {
                coded_value: coded.to_string(),
                decodes: vec![TranslatedText::new(coded.to_lowercase())],
                ..CodeListItem::default()
            },
        );
        code_list.item_order.push(item_oid);
    }
    code_list.sources = Sources::single(SourceKind::ItemDefs, "IT.AE.AESEV");
    mdv.code_lists.insert(oid("CL.SEVERITY"), code_list);
    mdv.code_list_order.push(oid("CL.SEVERITY"));
    if let Some(aesev) = mdv.item_defs.get_mut("IT.AE.AESEV") {
        aesev.code_list_oid = Some(oid("CL.SEVERITY"));
        aesev.length_as_code_list = true;
    }

    let mut result = AnalysisResult::new("AR.1", "Severity by treatment");
    result.analysis_datasets.insert(
        oid("IG.AE"),
        AnalysisDataset {
            item_group_oid: oid("IG.AE"),
            where_clause_oid: None,
            analysis_variable_oids: vec![oid("IT.AE.AESEV")],
        },
    );
    result.analysis_dataset_order.push(oid("IG.AE"));
    result.sources = Sources::single(SourceKind::ResultDisplays, "RD.1");
    let mut display = ResultDisplay::new("RD.1", "Table 14.3.1");
    display.analysis_result_order.push(oid("AR.1"));
    let arm = &mut mdv.analysis_result_displays;
    arm.analysis_results.insert(oid("AR.1"), result);
    arm.result_displays.insert(oid("RD.1"), display);
    arm.result_display_order.push(oid("RD.1"));

    DefineDocument::new("STUDY01", mdv)
}

fn write_json(dir: &TempDir, name: &str, value: &impl serde::Serialize) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn read_document(path: &Path) -> DefineDocument {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn check_reports_a_clean_document() {
    let dir = TempDir::new().unwrap();
    let document = write_json(&dir, "define.json", &sample_document());

    let result = run_check(&CheckArgs {
        document,
        output: None,
    })
    .unwrap();

    assert!(result.repairs.is_empty());
    assert!(!result.has_issues(), "{:?}", result.issues);
    assert!(render_check(&result).contains("No integrity issues."));
}

#[test]
fn check_writes_the_repaired_document() {
    let dir = TempDir::new().unwrap();
    let mut raw = serde_json::to_value(sample_document()).unwrap();
    raw["metaDataVersion"]["itemGroupOrder"] = serde_json::json!([]);
    let document = write_json(&dir, "define.json", &raw);
    let output = dir.path().join("repaired.json");

    let result = run_check(&CheckArgs {
        document,
        output: Some(output.clone()),
    })
    .unwrap();

    assert_eq!(
        result.repairs,
        [Repair::Listed {
            list: OrderList::ItemGroups,
            oid: oid("IG.AE"),
        }]
    );
    assert!(!result.has_issues());
    assert_eq!(read_document(&output).meta_data_version.item_group_order, [oid("IG.AE")]);
}

#[test]
fn apply_runs_the_action_script() {
    let dir = TempDir::new().unwrap();
    let document = write_json(&dir, "define.json", &sample_document());
    let actions = write_json(
        &dir,
        "actions.json",
        &serde_json::json!([
            { "type": "DEL_VARS", "scope": { "itemGroup": "IG.AE" }, "itemRefOids": ["IR.3"] },
            { "type": "DEL_ITEMGROUPS", "itemGroupOids": [] }
        ]),
    );
    let output = dir.path().join("edited.json");

    let result = run_apply(
        &ApplyArgs {
            document,
            actions,
            output: Some(output.clone()),
            strict_references: false,
        },
        &CliConfig::default(),
    )
    .unwrap();

    let changed: Vec<bool> = result.steps.iter().map(|step| step.changed).collect();
    assert_eq!(changed, [true, false]);
    assert_eq!(result.steps[0].kind, "DEL_VARS");
    assert!(render_apply(&result).contains("1/2"));

    let mdv = read_document(&output).meta_data_version;
    assert!(!mdv.item_defs.contains_key("IT.AE.AESEV"));
    assert!(mdv.code_lists.is_empty());
    assert!(mdv.code_list_order.is_empty());
    let dataset = &mdv.analysis_result_displays.analysis_results["AR.1"].analysis_datasets["IG.AE"];
    assert!(dataset.analysis_variable_oids.is_empty());
}

#[test]
fn apply_names_the_failing_action() {
    let dir = TempDir::new().unwrap();
    let document = write_json(&dir, "define.json", &sample_document());
    let actions = write_json(
        &dir,
        "actions.json",
        &serde_json::json!([
            { "type": "DEL_ITEMGROUPS", "itemGroupOids": [] },
            { "type": "DEL_VARS", "scope": { "itemGroup": "IG.AE" }, "itemRefOids": ["IR.9"] }
        ]),
    );
    let output = dir.path().join("edited.json");

    let error = run_apply(
        &ApplyArgs {
            document,
            actions,
            output: Some(output.clone()),
            strict_references: false,
        },
        &CliConfig::default(),
    )
    .unwrap_err();

    assert_eq!(error.to_string(), "action 2 (DEL_VARS) failed");
    assert!(!output.exists());
}

#[test]
fn save_normalizes_for_define_2_0() {
    let dir = TempDir::new().unwrap();
    let mut document = sample_document();
    if let Some(item_ref) = document
        .meta_data_version
        .item_groups
        .get_mut("IG.AE")
        .and_then(|group| group.item_refs.get_mut("IR.2"))
    {
        item_ref.has_no_data = true;
    }
    let path = write_json(&dir, "define.json", &document);
    let output = dir.path().join("saved.json");

    let result = run_save(
        &SaveArgs {
            document: path,
            target_version: Some(DefineVersionArg::V2_0),
            remove_unused_code_lists: false,
            output: Some(output.clone()),
        },
        &CliConfig::default(),
    )
    .unwrap();

    assert_eq!(result.summary.define_version, DefineVersion::V2_0);
    assert_eq!(result.summary.updated_lengths, [oid("IT.AE.AESEV")]);
    let saved = read_document(&output);
    assert!(saved.creation_date_time.is_some());
    let mdv = &saved.meta_data_version;
    assert_eq!(mdv.define_version, DefineVersion::V2_0);
    assert!(!mdv.item_defs.contains_key("IT.AE.AETERM"));
    assert_eq!(mdv.item_defs["IT.AE.AESEV"].length, Some(8));
}

#[test]
fn save_reads_options_from_the_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("define.toml");
    fs::write(&config_path, "[save]\nderive-code-list-lengths = false\n").unwrap();
    let config = CliConfig::load(Some(&config_path)).unwrap();
    let path = write_json(&dir, "define.json", &sample_document());

    let result = run_save(
        &SaveArgs {
            document: path,
            target_version: None,
            remove_unused_code_lists: false,
            output: Some(dir.path().join("saved.json")),
        },
        &config,
    )
    .unwrap();

    assert!(result.summary.is_empty());
    assert_eq!(result.summary.define_version, DefineVersion::V2_1);
}

#[test]
fn copy_results_merges_into_the_target_display() {
    let dir = TempDir::new().unwrap();
    let source = write_json(&dir, "source.json", &sample_document());
    let target = write_json(&dir, "target.json", &sample_document());
    let output = dir.path().join("merged.json");

    let result = run_copy_results(
        &CopyResultsArgs {
            source,
            target,
            result_display: "RD.1".to_string(),
            results: vec!["AR.1".to_string()],
            position: None,
            dedupe_comments: false,
            output: Some(output.clone()),
        },
        &CliConfig::default(),
    )
    .unwrap();

    assert_eq!(
        result.copies,
        [CopiedResult {
            source: oid("AR.1"),
            copy: oid("AR.2"),
            datasets: 1,
            where_clauses: 0,
        }]
    );
    let merged = read_document(&output).meta_data_version;
    assert_eq!(
        merged.analysis_result_displays.result_displays["RD.1"].analysis_result_order,
        [oid("AR.1"), oid("AR.2")]
    );
    let (_, repairs) = load_document(&output).unwrap();
    assert!(repairs.is_empty());
}

#[test]
fn copy_results_requires_an_existing_display() {
    let dir = TempDir::new().unwrap();
    let source = write_json(&dir, "source.json", &sample_document());
    let target = write_json(&dir, "target.json", &sample_document());

    let error = run_copy_results(
        &CopyResultsArgs {
            source,
            target,
            result_display: "RD.9".to_string(),
            results: vec!["AR.1".to_string()],
            position: None,
            dedupe_comments: false,
            output: None,
        },
        &CliConfig::default(),
    )
    .unwrap_err();

    assert!(error.to_string().starts_with("result display RD.9 not found"), "{error}");
}

#[test]
fn missing_document_is_reported_with_its_path() {
    let error = load_document(Path::new("/nonexistent/define.json")).unwrap_err();
    assert_eq!(error.to_string(), "read document /nonexistent/define.json");
}

#[test]
fn copy_results_arguments_parse() {
    let cli = Cli::try_parse_from([
        "define-cli",
        "--log-level",
        "debug",
        "copy-results",
        "--source",
        "adam.json",
        "--target",
        "define.json",
        "--display",
        "RD.1",
        "--result",
        "AR.1",
        "--result",
        "AR.2",
        "--dedupe-comments",
    ])
    .unwrap();

    let Command::CopyResults(args) = cli.command else {
        panic!("expected copy-results");
    };
    assert_eq!(args.results, ["AR.1", "AR.2"]);
    assert!(args.dedupe_comments);
    assert_eq!(args.position, None);
}

#[test]
fn copy_results_needs_at_least_one_result() {
    let parsed = Cli::try_parse_from([
        "define-cli",
        "copy-results",
        "--source",
        "a.json",
        "--target",
        "b.json",
        "--display",
        "RD.1",
    ]);
    assert!(parsed.is_err());
}
