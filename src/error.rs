//! Fatal errors: anything that stops a conversion before (or while) the
//! final source text is assembled. Modeling outcomes such as contradictory
//! bounds are never errors; they resolve to `Never`.

use crate::loader::SUPPORTED_DRAFT;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input was empty after trimming whitespace.
    #[error("schema input is empty")]
    EmptySchema,

    /// Input is neither a boolean nor a well-formed schema object.
    #[error("malformed schema at {path}: {message}")]
    MalformedSchema { path: String, message: String },

    /// `$schema` is missing or names a draft other than 2020-12.
    #[error(
        "unsupported schema draft {}; expected `$schema` to be `{SUPPORTED_DRAFT}`",
        found.as_deref().map(|s| format!("`{s}`")).unwrap_or_else(|| "(none declared)".to_string())
    )]
    UnsupportedDraft { found: Option<String> },

    /// The source formatter refused an import fragment.
    #[error("invalid import fragment: `from {module} import {name}`")]
    InvalidImport { module: String, name: String },
}
