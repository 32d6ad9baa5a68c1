//! JSON Schema (2020-12) → annotated Python type declarations.
//!
//! ```text
//! text ──load──▶ Schema ──Resolver──▶ DeclarationTable ──SourceFormatter──▶ Response
//! ```
mod builder;
pub mod codegen;
pub mod compose;
pub mod error;
pub mod format;
pub mod ir;
pub mod loader;
pub mod naming;
pub mod path_de;
pub mod refs;
pub mod resolve;
pub mod response;
pub mod schema;
pub mod settings;
pub mod table;

pub use error::{Error, Result};
pub use format::{Formatted, PythonFormatter, SourceFormatter};
pub use loader::load;
pub use response::{Diagnostic, Response, Severity};
pub use schema::{Schema, SchemaNode};
pub use settings::{FieldCase, Settings};

use resolve::Resolver;

/// Convert a parsed schema with the default formatter.
pub fn convert_base_schema(schema: &Schema, settings: &Settings) -> Result<Response> {
    convert_with_formatter(schema, settings, &PythonFormatter)
}

pub fn convert_with_formatter(
    schema: &Schema,
    settings: &Settings,
    formatter: &dyn SourceFormatter,
) -> Result<Response> {
    let mut resolver = Resolver::new(schema, settings);
    let root = resolver.resolve_document();
    tracing::debug!(?root, "root resolved");
    let (declarations, imports, mut diagnostics) = resolver.into_table().into_parts();
    let formatted = formatter.format(&imports, &declarations)?;
    diagnostics.extend(formatted.diagnostics);
    Ok(Response::new(formatted.source, diagnostics))
}

/// Load and convert in one step.
pub fn convert_str(text: &str, settings: &Settings) -> Result<Response> {
    let schema = load(text)?;
    convert_base_schema(&schema, settings)
}
