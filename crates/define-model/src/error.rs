use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid OID: {0:?}")]
    InvalidOid(String),
    #[error("unknown Define-XML version: {0}")]
    UnknownDefineVersion(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
