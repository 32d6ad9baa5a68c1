use crate::codegen::{py_pattern, py_str};
use crate::ir::Ty;
use crate::resolve::Resolver;
use crate::schema::{Kind, SchemaNode};

use super::len_annotation;

impl<'s> Resolver<'s> {
    /// `pattern` and `format` are passed through untouched; the runtime
    /// validator owns their semantics.
    pub(super) fn build_string(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        let active = node.min_length.is_some()
            || node.max_length.is_some()
            || node.pattern.is_some()
            || node.format.is_some();
        if !active {
            return Ty::bare(Kind::String);
        }
        if let (Some(min), Some(max)) = (node.min_length, node.max_length) {
            if min > max {
                return self.contradiction("minLength exceeds maxLength");
            }
        }
        let name = self.fresh_name(hint);
        let mut annotations = Vec::new();
        annotations.extend(len_annotation(node.min_length, node.max_length, &mut self.table));
        if let Some(pattern) = &node.pattern {
            self.table.import_runtime("Pattern");
            annotations.push(format!("Pattern({})", py_pattern(pattern)));
        }
        if let Some(format) = &node.format {
            self.table.import_runtime("Format");
            annotations.push(format!("Format({})", py_str(format)));
        }
        self.declare_annotated(name, "str", &annotations)
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::Ty;
    use crate::resolve::Resolver;
    use crate::schema::Schema;
    use crate::settings::Settings;
    use serde_json::json;

    #[test]
    fn string_declaration() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "string", "minLength": 1, "maxLength": 8, "pattern": "^[a-z]+$", "format": "hostname"
        }))
        .unwrap();
        let settings = Settings::default();
        let mut resolver = Resolver::new(&schema, &settings);
        assert_eq!(resolver.resolve(&schema, "host name"), Ty::named("HostName"));
        let table = resolver.into_table();
        assert_eq!(
            table.body("HostName"),
            Some("type HostName = Annotated[str, Len(1, 8), Pattern(r\"^[a-z]+$\"), Format(\"hostname\")]")
        );
        let modules: Vec<_> = table.imports().into_iter().map(|i| i.module).collect();
        assert_eq!(modules, ["annotated_types", "schema_constraints", "typing"]);
    }

    #[test]
    fn inverted_lengths_are_never() {
        let schema: Schema = serde_json::from_value(json!({"type": "string", "minLength": 3, "maxLength": 2})).unwrap();
        let settings = Settings::default();
        let mut resolver = Resolver::new(&schema, &settings);
        assert_eq!(resolver.resolve(&schema, "Code"), Ty::Never);
        assert!(resolver.into_table().is_empty());
    }
}
