//! Shared entities: comments, methods and where clauses.
//!
//! These are serialized once and referenced by OID from every place they are
//! used, so one instance may have many owners at the same time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::oid::Oid;
use crate::sources::{Referenced, Sources};
use crate::text::{DocumentRef, TranslatedText};

/// `def:CommentDef`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub oid: Oid,
    pub descriptions: Vec<TranslatedText>,
    pub documents: Vec<DocumentRef>,
    pub sources: Sources,
}

impl Comment {
    pub fn new(oid: impl Into<Oid>, text: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            descriptions: vec![TranslatedText::new(text)],
            ..Self::default()
        }
    }

    /// Same text and documents, regardless of OID and owners.
    pub fn same_content(&self, other: &Comment) -> bool {
        self.descriptions == other.descriptions && self.documents == other.documents
    }
}

impl Referenced for Comment {
    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn sources_mut(&mut self) -> &mut Sources {
        &mut self.sources
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodType {
    #[default]
    Computation,
    Imputation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormalExpression {
    pub context: String,
    pub value: String,
}

/// `MethodDef`, referenced from item refs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Method {
    pub oid: Oid,
    pub name: String,
    pub method_type: MethodType,
    pub descriptions: Vec<TranslatedText>,
    pub documents: Vec<DocumentRef>,
    pub formal_expressions: Vec<FormalExpression>,
    pub sources: Sources,
}

impl Method {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            descriptions: vec![TranslatedText::new(text)],
            ..Self::default()
        }
    }
}

impl Referenced for Method {
    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn sources_mut(&mut self) -> &mut Sources {
        &mut self.sources
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Comparator {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "EQ",
            Comparator::Ne => "NE",
            Comparator::Lt => "LT",
            Comparator::Le => "LE",
            Comparator::Gt => "GT",
            Comparator::Ge => "GE",
            Comparator::In => "IN",
            Comparator::NotIn => "NOTIN",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One condition of a where clause, e.g. `LBTESTCD EQ "GLUC"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeCheck {
    pub comparator: Comparator,
    pub item_oid: Oid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_group_oid: Option<Oid>,
    pub check_values: Vec<String>,
}

impl RangeCheck {
    pub fn new(
        item_oid: impl Into<Oid>,
        comparator: Comparator,
        check_values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            comparator,
            item_oid: item_oid.into(),
            item_group_oid: None,
            check_values: check_values.into_iter().map(Into::into).collect(),
        }
    }
}

/// `def:WhereClauseDef`, referenced from value-level item refs and from
/// analysis datasets of the ARM section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhereClause {
    pub oid: Oid,
    pub range_checks: Vec<RangeCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_oid: Option<Oid>,
    pub sources: Sources,
}

impl WhereClause {
    pub fn new(oid: impl Into<Oid>, range_checks: Vec<RangeCheck>) -> Self {
        Self {
            oid: oid.into(),
            range_checks,
            ..Self::default()
        }
    }

    /// Same conditions and comment, regardless of OID and owners.
    pub fn same_content(&self, other: &WhereClause) -> bool {
        self.range_checks == other.range_checks && self.comment_oid == other.comment_oid
    }
}

impl Referenced for WhereClause {
    fn sources(&self) -> &Sources {
        &self.sources
    }

    fn sources_mut(&mut self) -> &mut Sources {
        &mut self.sources
    }
}
