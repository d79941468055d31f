use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreemapError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse object file: {0}")]
    Object(#[from] object::Error),

    #[error("failed to read DWARF: {0}")]
    Dwarf(#[from] gimli::Error),

    #[error("failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to turn one attribute into an address or offset. Only the attribute's owner is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported attribute encoding {form}")]
    UnsupportedEncoding { form: String },

    #[error("negative value {0} where an address or offset was expected")]
    Negative(i64),

    #[error("attribute payload is truncated")]
    Truncated,

    #[error("{len}-byte integer does not fit in 64 bits")]
    IntegerTooWide { len: usize },
}
