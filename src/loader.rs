//! Raw text → [`Schema`].
use crate::error::{Error, Result};
use crate::path_de::from_str_with_path;
use crate::schema::{Schema, SchemaNode};

/// The one meta-schema URI this crate understands.
pub const SUPPORTED_DRAFT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Parse schema text. A bare `true`/`false` is a boolean schema; anything
/// else must be an object declaring the 2020-12 draft in `$schema`.
pub fn load(text: &str) -> Result<Schema> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptySchema);
    }
    match trimmed {
        "true" => return Ok(Schema::Bool(true)),
        "false" => return Ok(Schema::Bool(false)),
        _ => {}
    }
    if !trimmed.starts_with('{') {
        return Err(Error::MalformedSchema {
            path: ".".to_string(),
            message: "expected a schema object or a boolean".to_string(),
        });
    }
    let node: SchemaNode = from_str_with_path(trimmed)?;
    match node.schema.as_deref() {
        Some(uri) if is_supported_draft(uri) => {
            tracing::debug!(draft = uri, "schema loaded");
            Ok(Schema::Node(Box::new(node)))
        }
        found => Err(Error::UnsupportedDraft { found: found.map(str::to_owned) }),
    }
}

/// An empty fragment (`…/schema#`) names the same meta-schema.
fn is_supported_draft(uri: &str) -> bool {
    uri.strip_suffix('#').unwrap_or(uri) == SUPPORTED_DRAFT
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_input() {
        assert!(matches!(load(""), Err(Error::EmptySchema)));
        assert!(matches!(load("  \n\t "), Err(Error::EmptySchema)));
    }

    #[test]
    fn boolean_literals() {
        assert_eq!(load(" true ").unwrap(), Schema::Bool(true));
        assert_eq!(load("false").unwrap(), Schema::Bool(false));
    }

    #[test]
    fn trailing_comma_is_malformed() {
        let text = format!(r#"{{"$schema":"{SUPPORTED_DRAFT}",}}"#);
        assert!(matches!(load(&text), Err(Error::MalformedSchema { .. })));
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(load("[1, 2]"), Err(Error::MalformedSchema { .. })));
        assert!(matches!(load("\"string\""), Err(Error::MalformedSchema { .. })));
        assert!(matches!(load("truex"), Err(Error::MalformedSchema { .. })));
    }

    #[test]
    fn malformed_keyword_reports_its_path() {
        let text = format!(
            r#"{{"$schema":"{SUPPORTED_DRAFT}","properties":{{"a":{{"minLength":"three"}}}}}}"#
        );
        match load(&text) {
            Err(Error::MalformedSchema { path, .. }) => assert_eq!(path, "properties.a.minLength"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn draft_must_be_declared_and_supported() {
        assert!(matches!(
            load(r#"{"type":"string"}"#),
            Err(Error::UnsupportedDraft { found: None })
        ));
        let old = r#"{"$schema":"http://json-schema.org/draft-07/schema#"}"#;
        assert!(matches!(load(old), Err(Error::UnsupportedDraft { found: Some(_) })));
    }

    #[test]
    fn supported_draft_loads() {
        let text = format!(r#"{{"$schema":"{SUPPORTED_DRAFT}#","type":"integer"}}"#);
        let schema = load(&text).unwrap();
        assert!(schema.node().unwrap().kinds.is_some());
    }
}
