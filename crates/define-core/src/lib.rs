//! Operations over Define-XML metadata documents.
//!
//! - [`reference`]: adding and releasing back-references of shared entities
//! - [`engine`]: the `(state, action) -> state` mutation engine
//! - [`copy`]: copying analysis results between documents
//! - [`recreate`]: rebuilding and repairing loaded documents
//! - [`save`]: normalization before a document is written
//! - [`integrity`]: consistency checks over the whole graph

pub mod action;
pub mod copy;
pub mod engine;
pub mod error;
pub mod integrity;
pub mod recreate;
pub mod reference;
pub mod save;

pub use action::{Action, NewItemGroup, NewVariable, decoded_code_list};
pub use copy::{CopiedAnalysisResults, CopyRequest, ExistingOids, ReusedComment, copy_analysis_results};
pub use engine::{EngineOptions, apply_action, apply_action_with, apply_actions};
pub use error::{DefineError, Result};
pub use integrity::{
    BackReferences, IntegrityIssue, OrderList, OrderProblem, check_integrity, referenced_entities,
};
pub use recreate::{Repair, recreate, recreate_from_str, recreate_with_repairs, repair_metadata_version};
pub use reference::{
    ReferencePolicy, Released, add_reference, release, remove_reference, remove_reference_with, retain,
};
pub use save::{SaveOptions, SaveSummary, prepare_for_save};
