use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, info_span};

use define_core::{
    Action, CopyRequest, EngineOptions, ExistingOids, ReferencePolicy, Repair, apply_action_with, check_integrity,
    copy_analysis_results, prepare_for_save, recreate_with_repairs,
};
use define_model::{DefineDocument, Oid};

use crate::cli::{ApplyArgs, CheckArgs, CopyResultsArgs, SaveArgs};
use crate::config::CliConfig;
use crate::types::{ActionStep, ApplyResult, CheckResult, CopiedResult, CopyResult, SaveResult};

/// Read a JSON document and repair it.
pub fn load_document(path: &Path) -> Result<(DefineDocument, Vec<Repair>)> {
    let text = fs::read_to_string(path).with_context(|| format!("read document {}", path.display()))?;
    let raw = serde_json::from_str(&text).with_context(|| format!("parse document {}", path.display()))?;
    recreate_with_repairs(raw).with_context(|| format!("rebuild document {}", path.display()))
}

/// Write a document as pretty JSON to `output`, or to stdout.
pub fn write_document(document: &DefineDocument, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(document).context("serialize document")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write document {}", path.display()))?;
            info!(path = %path.display(), "document written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn run_check(args: &CheckArgs) -> Result<CheckResult> {
    let span = info_span!("check", document = %args.document.display());
    let _guard = span.enter();

    let (document, repairs) = load_document(&args.document)?;
    let issues = check_integrity(&document.meta_data_version);
    info!(repairs = repairs.len(), issues = issues.len(), "document checked");
    if let Some(output) = &args.output {
        write_document(&document, Some(output))?;
    }
    Ok(CheckResult {
        document: args.document.clone(),
        repairs,
        issues,
    })
}

pub fn run_apply(args: &ApplyArgs, config: &CliConfig) -> Result<ApplyResult> {
    let span = info_span!("apply", document = %args.document.display());
    let _guard = span.enter();

    let (mut document, repairs) = load_document(&args.document)?;
    let script = fs::read_to_string(&args.actions)
        .with_context(|| format!("read actions {}", args.actions.display()))?;
    let actions: Vec<Action> =
        serde_json::from_str(&script).with_context(|| format!("parse actions {}", args.actions.display()))?;

    let options = engine_options(config, args.strict_references);
    let mut state = Arc::new(document.meta_data_version);
    let mut steps = Vec::with_capacity(actions.len());
    for (index, action) in actions.iter().enumerate() {
        let next = apply_action_with(&state, action, &options)
            .with_context(|| format!("action {} ({}) failed", index + 1, action.kind()))?;
        steps.push(ActionStep {
            index: index + 1,
            kind: action.kind(),
            changed: !Arc::ptr_eq(&state, &next),
        });
        state = next;
    }
    info!(actions = steps.len(), "actions applied");

    document.meta_data_version = Arc::unwrap_or_clone(state);
    write_document(&document, args.output.as_deref())?;
    Ok(ApplyResult { repairs, steps })
}

pub fn run_save(args: &SaveArgs, config: &CliConfig) -> Result<SaveResult> {
    let span = info_span!("save", document = %args.document.display());
    let _guard = span.enter();

    let (document, repairs) = load_document(&args.document)?;
    let mut options = config.save.clone();
    if let Some(version) = args.target_version {
        options.target_version = Some(version.into());
    }
    if args.remove_unused_code_lists {
        options.remove_unused_code_lists = true;
    }

    let (saved, summary) = prepare_for_save(&document, &options, Utc::now()).context("prepare document for save")?;
    write_document(&saved, args.output.as_deref())?;
    Ok(SaveResult { repairs, summary })
}

pub fn run_copy_results(args: &CopyResultsArgs, config: &CliConfig) -> Result<CopyResult> {
    let span = info_span!("copy_results", source = %args.source.display(), target = %args.target.display());
    let _guard = span.enter();

    let (source, mut repairs) = load_document(&args.source)?;
    let (mut target, target_repairs) = load_document(&args.target)?;
    repairs.extend(target_repairs);

    let result_display = Oid::from(args.result_display.as_str());
    if !target
        .meta_data_version
        .analysis_result_displays
        .result_displays
        .contains_key(&result_display)
    {
        bail!("result display {result_display} not found in {}", args.target.display());
    }

    let requested: Vec<Oid> = args.results.iter().map(|oid| Oid::from(oid.as_str())).collect();
    let request = CopyRequest {
        target: &target.meta_data_version,
        source: &source.meta_data_version,
        analysis_result_oids: &requested,
        search_for_duplicate: args.dedupe_comments,
    };
    let copied = copy_analysis_results(&request, &mut ExistingOids::default()).context("copy analysis results")?;

    let mut copies = Vec::with_capacity(requested.len());
    for (source_oid, copy_oid) in requested.iter().zip(&copied.analysis_result_order) {
        let Some(result) = copied.analysis_results.get(copy_oid) else {
            continue;
        };
        copies.push(CopiedResult {
            source: source_oid.clone(),
            copy: copy_oid.clone(),
            datasets: result.analysis_dataset_order.len(),
            where_clauses: result
                .analysis_datasets
                .values()
                .filter(|dataset| dataset.where_clause_oid.is_some())
                .count(),
        });
    }

    let merge = Action::AddAnalysisResults {
        result_display_oid: result_display.clone(),
        results: copied,
        position: args.position,
    };
    let state = Arc::new(target.meta_data_version);
    let merged = apply_action_with(&state, &merge, &config.engine).context("merge analysis results")?;
    drop(state);
    target.meta_data_version = Arc::unwrap_or_clone(merged);
    info!(copies = copies.len(), display = %result_display, "analysis results merged");

    write_document(&target, args.output.as_deref())?;
    Ok(CopyResult {
        repairs,
        result_display,
        copies,
    })
}

fn engine_options(config: &CliConfig, strict_references: bool) -> EngineOptions {
    if strict_references {
        EngineOptions {
            reference_policy: ReferencePolicy::Strict,
        }
    } else {
        config.engine
    }
}
