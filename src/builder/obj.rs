use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::codegen::{annotated, py_docstring, py_literal, py_pattern, py_str, render};
use crate::ir::Ty;
use crate::naming::{sanitize, to_camel_case, to_pascal_case, to_snake_case};
use crate::resolve::Resolver;
use crate::schema::{Kind, SchemaNode};
use crate::settings::FieldCase;

/// One property of a record under construction.
#[derive(Debug, Clone)]
pub(super) struct RecordField {
    pub ty: Ty,
    pub required: bool,
    pub dependent_required: Vec<String>,
    pub dependent_schema: Option<Ty>,
    pub default: Option<Value>,
}

impl RecordField {
    fn new(ty: Ty) -> Self {
        RecordField { ty, required: false, dependent_required: Vec::new(), dependent_schema: None, default: None }
    }
}

/// Least fixed point of "a required field's dependencies are required".
/// Each pass that changes anything marks at least one more field, so the
/// loop ends after at most `fields.len()` passes.
pub(super) fn close_required(fields: &mut IndexMap<String, RecordField>) {
    loop {
        let newly: Vec<String> = fields
            .values()
            .filter(|f| f.required)
            .flat_map(|f| f.dependent_required.iter())
            .filter(|key| fields.get(key.as_str()).is_some_and(|f| !f.required))
            .cloned()
            .collect();
        if newly.is_empty() {
            break;
        }
        for key in newly {
            if let Some(field) = fields.get_mut(&key) {
                field.required = true;
            }
        }
    }
}

fn is_active(node: &SchemaNode) -> bool {
    node.properties.is_some()
        || node.required.is_some()
        || node.pattern_properties.is_some()
        || node.additional_properties.is_some()
        || node.unevaluated_properties.is_some()
        || node.min_properties.is_some()
        || node.max_properties.is_some()
        || node.property_names.is_some()
        || node.dependent_schemas.is_some()
        || node.dependent_required.is_some()
}

fn field_identifier(key: &str, case: FieldCase) -> String {
    let cased = match case {
        FieldCase::Preserve => String::new(),
        FieldCase::Snake => to_snake_case(key),
        FieldCase::Camel => to_camel_case(key),
    };
    if cased.is_empty() { sanitize(key) } else { sanitize(&cased) }
}

fn quoted_list(names: &[String]) -> String {
    names.iter().map(|n| py_str(n)).collect::<Vec<_>>().join(", ")
}

impl<'s> Resolver<'s> {
    pub(super) fn build_object(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        if !is_active(node) {
            return Ty::bare(Kind::Object);
        }
        if let (Some(min), Some(max)) = (node.min_properties, node.max_properties) {
            if min > max {
                return self.contradiction("minProperties exceeds maxProperties");
            }
        }
        let name = self.record_name(hint);

        // 1. properties
        let mut fields: IndexMap<String, RecordField> = IndexMap::new();
        for (key, schema) in node.properties.iter().flatten() {
            let field_hint = format!("{name}{}", or_field(to_pascal_case(key)));
            let ty = self.at(&["properties", key.as_str()], |r| r.resolve(schema, &field_hint));
            let mut field = RecordField::new(ty);
            field.default = schema.node().and_then(|n| n.default.clone());
            fields.insert(key.clone(), field);
        }

        // 6. rest type, needed for required keys that have no property
        let extra_hint = format!("{name}Extra");
        let rest = match (&node.additional_properties, &node.unevaluated_properties) {
            (Some(extra), _) => self.at(&["additionalProperties"], |r| r.resolve(extra, &extra_hint)),
            (None, Some(extra)) => self.at(&["unevaluatedProperties"], |r| r.resolve(extra, &extra_hint)),
            (None, None) => Ty::Any,
        };

        // 2. required
        for key in node.required.iter().flatten() {
            fields.entry(key.clone()).or_insert_with(|| RecordField::new(rest.clone())).required = true;
        }

        // 3, 4. dependencies; keys without a field stay at class level
        let mut class_annotations = Vec::new();
        for (key, names) in node.dependent_required.iter().flatten() {
            match fields.get_mut(key) {
                Some(field) => field.dependent_required.extend(names.iter().cloned()),
                None => {
                    self.table.import_runtime("DependentRequired");
                    class_annotations.push(format!("DependentRequired({}, when={})", quoted_list(names), py_str(key)));
                }
            }
        }
        for (key, schema) in node.dependent_schemas.iter().flatten() {
            let dep_hint = format!("{name}{}Dependency", or_field(to_pascal_case(key)));
            let ty = self.at(&["dependentSchemas", key.as_str()], |r| r.resolve(schema, &dep_hint));
            match fields.get_mut(key) {
                Some(field) => field.dependent_schema = Some(ty),
                None => {
                    let text = render(&ty, &mut self.table);
                    self.table.import_runtime("DependentSchema");
                    class_annotations.push(format!("DependentSchema({text}, when={})", py_str(key)));
                }
            }
        }

        // 5.
        close_required(&mut fields);

        // object-level constraints
        if node.min_properties.is_some() || node.max_properties.is_some() {
            let args: Vec<String> = [("min", node.min_properties), ("max", node.max_properties)]
                .into_iter()
                .filter_map(|(arg, n)| n.map(|n| format!("{arg}={n}")))
                .collect();
            self.table.import_runtime("PropertyCount");
            class_annotations.insert(0, format!("PropertyCount({})", args.join(", ")));
        }
        if let Some(patterns) = &node.pattern_properties {
            let mut entries = Vec::new();
            for (i, (pattern, schema)) in patterns.iter().enumerate() {
                let pattern_hint = format!("{name}Pattern{}", i + 1);
                let ty = self.at(&["patternProperties", pattern.as_str()], |r| r.resolve(schema, &pattern_hint));
                entries.push(format!("{}: {}", py_pattern(pattern), render(&ty, &mut self.table)));
            }
            self.table.import_runtime("PatternProperties");
            class_annotations.push(format!("PatternProperties({{{}}})", entries.join(", ")));
        }
        if let Some(names) = &node.property_names {
            let key_hint = format!("{name}Key");
            let ty = self.at(&["propertyNames"], |r| r.resolve(names, &key_hint));
            let text = render(&ty, &mut self.table);
            self.table.import_runtime("PropertyNames");
            class_annotations.push(format!("PropertyNames({text})"));
        }

        let body = self.record_body(&name, node, &fields, &rest, &class_annotations);
        self.table.define(name.clone(), body);
        Ty::Named(name)
    }

    fn record_body(
        &mut self,
        name: &str,
        node: &SchemaNode,
        fields: &IndexMap<String, RecordField>,
        rest: &Ty,
        class_annotations: &[String],
    ) -> String {
        let mut lines = Vec::new();
        if !class_annotations.is_empty() {
            self.table.import_runtime("constraints");
            lines.push(format!("@constraints({})", class_annotations.join(", ")));
        }
        self.table.import("typing_extensions", "TypedDict");
        let openness = match rest {
            Ty::Never => "closed=True".to_string(),
            other => format!("extra_items={}", render(other, &mut self.table)),
        };
        lines.push(format!("class {name}(TypedDict, {openness}):"));
        if let Some(description) = node.description.as_deref().filter(|d| !d.trim().is_empty()) {
            lines.push(py_docstring(description, "    "));
        }

        let mut taken = HashSet::new();
        for (key, field) in fields {
            let base = field_identifier(key, self.settings.field_case);
            let ident = if taken.contains(&base) {
                (1..).map(|n| format!("{base}{n}")).find(|c| !taken.contains(c)).unwrap_or_else(|| base.clone())
            } else {
                base
            };
            taken.insert(ident.clone());

            let mut annotations = Vec::new();
            if let Some(default) = &field.default {
                self.table.import_runtime("Default");
                annotations.push(format!("Default({})", py_literal(default)));
            }
            if !field.dependent_required.is_empty() {
                self.table.import_runtime("DependentRequired");
                annotations.push(format!("DependentRequired({})", quoted_list(&field.dependent_required)));
            }
            if let Some(dependency) = &field.dependent_schema {
                let text = render(dependency, &mut self.table);
                self.table.import_runtime("DependentSchema");
                annotations.push(format!("DependentSchema({text})"));
            }
            if ident != *key {
                self.table.import_runtime("Alias");
                annotations.push(format!("Alias({})", py_str(key)));
            }
            let ty = render(&field.ty, &mut self.table);
            let inner = annotated(&ty, &annotations, &mut self.table);
            let wrapper = if field.required { "Required" } else { "NotRequired" };
            self.table.import("typing", wrapper);
            lines.push(format!("    {ident}: {wrapper}[{inner}]"));
        }
        if lines.last().is_some_and(|l| l.starts_with("class ")) {
            lines.push("    pass".to_string());
        }
        lines.join("\n")
    }
}

fn or_field(pascal: String) -> String {
    if pascal.is_empty() { "Field".to_string() } else { pascal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::settings::Settings;
    use crate::table::DeclarationTable;
    use serde_json::json;

    fn build_with(value: Value, settings: &Settings) -> (Ty, DeclarationTable) {
        let schema: Schema = serde_json::from_value(value).unwrap();
        let mut resolver = Resolver::new(&schema, settings);
        let ty = resolver.resolve(&schema, "Root");
        (ty, resolver.into_table())
    }

    fn build(value: Value) -> (Ty, DeclarationTable) {
        build_with(value, &Settings::default())
    }

    #[test]
    fn closure_is_transitive() {
        let mut fields: IndexMap<String, RecordField> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|k| (k.to_string(), RecordField::new(Ty::Any)))
            .collect();
        fields["a"].required = true;
        fields["a"].dependent_required = vec!["b".into()];
        fields["b"].dependent_required = vec!["c".into(), "ghost".into()];
        fields["d"].dependent_required = vec!["a".into()];
        close_required(&mut fields);
        let required: Vec<_> = fields.iter().filter(|(_, f)| f.required).map(|(k, _)| k.as_str()).collect();
        assert_eq!(required, ["a", "b", "c"]);
    }

    #[test]
    fn record_with_dependencies() {
        let (ty, table) = build(json!({
            "type": "object",
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "integer"},
                "c": {"type": "boolean"},
                "d": {}
            },
            "required": ["a"],
            "dependentRequired": {"a": ["b"], "b": ["c"]}
        }));
        assert_eq!(ty, Ty::named("Root"));
        assert_eq!(
            table.body("Root"),
            Some(concat!(
                "class Root(TypedDict, extra_items=Any):\n",
                "    a: Required[Annotated[str, DependentRequired(\"b\")]]\n",
                "    b: Required[Annotated[int, DependentRequired(\"c\")]]\n",
                "    c: Required[bool]\n",
                "    d: NotRequired[Any]"
            ))
        );
    }

    #[test]
    fn closed_record_with_class_constraints() {
        let (_, table) = build(json!({
            "type": "object",
            "description": "A point.",
            "properties": {"x": {"type": "number", "default": 0}},
            "additionalProperties": false,
            "minProperties": 1,
            "dependentRequired": {"z": ["x"]}
        }));
        assert_eq!(
            table.body("Root"),
            Some(concat!(
                "@constraints(PropertyCount(min=1), DependentRequired(\"x\", when=\"z\"))\n",
                "class Root(TypedDict, closed=True):\n",
                "    \"\"\"A point.\"\"\"\n",
                "    x: NotRequired[Annotated[float, Default(0)]]"
            ))
        );
    }

    #[test]
    fn required_key_without_property_uses_rest_type() {
        let (_, table) = build(json!({
            "type": "object",
            "required": ["id"],
            "additionalProperties": {"type": "string"}
        }));
        assert_eq!(
            table.body("Root"),
            Some("class Root(TypedDict, extra_items=str):\n    id: Required[str]")
        );
    }

    #[test]
    fn keys_become_identifiers_with_aliases() {
        let settings = Settings::default().with_field_case(FieldCase::Snake);
        let (_, table) = build_with(
            json!({
                "type": "object",
                "properties": {"userName": true, "class": true, "user_name": true}
            }),
            &settings,
        );
        assert_eq!(
            table.body("Root"),
            Some(concat!(
                "class Root(TypedDict, extra_items=Any):\n",
                "    user_name: NotRequired[Annotated[Any, Alias(\"userName\")]]\n",
                "    class_: NotRequired[Annotated[Any, Alias(\"class\")]]\n",
                "    user_name1: NotRequired[Annotated[Any, Alias(\"user_name\")]]"
            ))
        );
    }

    #[test]
    fn property_names_and_patterns() {
        let (_, table) = build(json!({
            "type": "object",
            "patternProperties": {"^x-": {"type": "string"}},
            "propertyNames": {"maxLength": 10, "type": "string"}
        }));
        assert_eq!(table.body("RootKey"), Some("type RootKey = Annotated[str, Len(0, 10)]"));
        assert_eq!(
            table.body("Root"),
            Some(concat!(
                "@constraints(PatternProperties({r\"^x-\": str}), PropertyNames(RootKey))\n",
                "class Root(TypedDict, extra_items=Any):\n",
                "    pass"
            ))
        );
    }

    #[test]
    fn inverted_property_counts_are_never() {
        let (ty, table) = build(json!({"type": "object", "minProperties": 2, "maxProperties": 1}));
        assert_eq!(ty, Ty::Never);
        assert!(table.is_empty());
    }
}
