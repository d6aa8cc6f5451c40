//! Entity model of a Define-XML metadata document.
//!
//! All entities live inside one [`MetaDataVersion`] aggregate, held in maps
//! keyed by [`Oid`] next to order lists that fix their display order.
//! Entities that may be referenced by several owners carry a [`Sources`]
//! back-reference structure (see [`Referenced`]).

pub mod arm;
pub mod code_list;
pub mod document;
pub mod error;
pub mod item;
pub mod oid;
pub mod shared;
pub mod sources;
pub mod text;

pub use arm::{AnalysisDataset, AnalysisResult, AnalysisResultDisplays, ResultDisplay};
pub use code_list::{CodeList, CodeListItem, CodeListType, EnumeratedItem, ExternalCodeList};
pub use document::{DefineDocument, DefineVersion, MetaDataVersion, VariableScope};
pub use error::{ModelError, Result};
pub use item::{DataType, ItemDef, ItemGroup, ItemRef, ItemRefContainer, ValueList};
pub use oid::{EntityKind, Oid, mint_oid, mint_oid_with_suffix};
pub use shared::{Comment, Comparator, FormalExpression, Method, MethodType, RangeCheck, WhereClause};
pub use sources::{Referenced, SourceKind, Sources};
pub use text::{DocumentRef, TranslatedText};
