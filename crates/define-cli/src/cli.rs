//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use define_model::DefineVersion;

#[derive(Parser)]
#[command(
    name = "define-cli",
    version,
    about = "Check, edit and normalize Define-XML metadata documents",
    long_about = "Check, edit and normalize Define-XML metadata documents.\n\n\
                  Documents are read and written as JSON. Edits are JSON action\n\
                  scripts applied by the reference-tracking mutation engine."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// TOML configuration with `[engine]` and `[save]` tables.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a document, repair what can be repaired and report remaining issues.
    Check(CheckArgs),

    /// Apply a JSON array of edit actions to a document.
    Apply(ApplyArgs),

    /// Normalize a document for writing.
    Save(SaveArgs),

    /// Copy analysis results from one document into a result display of another.
    CopyResults(CopyResultsArgs),
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Document to check.
    #[arg(value_name = "DOC")]
    pub document: PathBuf,

    /// Write the repaired document to this path.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Document to edit.
    #[arg(value_name = "DOC")]
    pub document: PathBuf,

    /// JSON file holding an array of actions.
    #[arg(value_name = "ACTIONS")]
    pub actions: PathBuf,

    /// Output path (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Delete a shared entity only when its last owner is removed.
    #[arg(long = "strict-references")]
    pub strict_references: bool,
}

#[derive(Parser)]
pub struct SaveArgs {
    /// Document to normalize.
    #[arg(value_name = "DOC")]
    pub document: PathBuf,

    /// Define-XML version to write (overrides the configuration).
    #[arg(long = "target-version", value_enum)]
    pub target_version: Option<DefineVersionArg>,

    /// Delete codelists no variable refers to.
    #[arg(long = "remove-unused-codelists")]
    pub remove_unused_code_lists: bool,

    /// Output path (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CopyResultsArgs {
    /// Document the analysis results are copied from.
    #[arg(long = "source", value_name = "DOC")]
    pub source: PathBuf,

    /// Document the analysis results are merged into.
    #[arg(long = "target", value_name = "DOC")]
    pub target: PathBuf,

    /// Result display of the target receiving the copies.
    #[arg(long = "display", value_name = "OID")]
    pub result_display: String,

    /// Analysis result of the source to copy; repeat to copy several.
    #[arg(long = "result", value_name = "OID", required = true)]
    pub results: Vec<String>,

    /// Insert position in the display's result order (default: append).
    #[arg(long = "position")]
    pub position: Option<usize>,

    /// Reuse target comments with identical text instead of copying.
    #[arg(long = "dedupe-comments")]
    pub dedupe_comments: bool,

    /// Output path (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DefineVersionArg {
    #[value(name = "2.0")]
    V2_0,
    #[value(name = "2.1")]
    V2_1,
}

impl From<DefineVersionArg> for DefineVersion {
    fn from(value: DefineVersionArg) -> Self {
        match value {
            DefineVersionArg::V2_0 => DefineVersion::V2_0,
            DefineVersionArg::V2_1 => DefineVersion::V2_1,
        }
    }
}
