use std::path::PathBuf;

use define_core::{IntegrityIssue, Repair, SaveSummary};
use define_model::Oid;

/// Outcome of `check`.
#[derive(Debug)]
pub struct CheckResult {
    pub document: PathBuf,
    pub repairs: Vec<Repair>,
    pub issues: Vec<IntegrityIssue>,
}

impl CheckResult {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// One action of an applied script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStep {
    pub index: usize,
    pub kind: &'static str,
    pub changed: bool,
}

/// Outcome of `apply`.
#[derive(Debug)]
pub struct ApplyResult {
    pub repairs: Vec<Repair>,
    pub steps: Vec<ActionStep>,
}

/// Outcome of `save`.
#[derive(Debug)]
pub struct SaveResult {
    pub repairs: Vec<Repair>,
    pub summary: SaveSummary,
}

/// One analysis result copied by `copy-results`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedResult {
    pub source: Oid,
    pub copy: Oid,
    pub datasets: usize,
    pub where_clauses: usize,
}

/// Outcome of `copy-results`.
#[derive(Debug)]
pub struct CopyResult {
    pub repairs: Vec<Repair>,
    pub result_display: Oid,
    pub copies: Vec<CopiedResult>,
}
