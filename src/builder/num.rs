use std::cmp::Ordering;

use serde_json::Number;

use crate::codegen::py_number;
use crate::ir::Ty;
use crate::resolve::Resolver;
use crate::schema::{Kind, SchemaNode, cmp_numbers};
use crate::table::DeclarationTable;

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct NumericBounds<'a> {
    pub minimum: Option<&'a Number>,
    pub exclusive_minimum: Option<&'a Number>,
    pub maximum: Option<&'a Number>,
    pub exclusive_maximum: Option<&'a Number>,
    pub multiple_of: Option<&'a Number>,
}

impl<'a> NumericBounds<'a> {
    pub fn of(node: &'a SchemaNode) -> Self {
        NumericBounds {
            minimum: node.minimum.as_ref(),
            exclusive_minimum: node.exclusive_minimum.as_ref(),
            maximum: node.maximum.as_ref(),
            exclusive_maximum: node.exclusive_maximum.as_ref(),
            multiple_of: node.multiple_of.as_ref(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.minimum.is_some()
            || self.exclusive_minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_maximum.is_some()
            || self.multiple_of.is_some()
    }

    /// No number satisfies both a lower and an upper bound.
    pub fn contradiction(&self) -> bool {
        let lower = [(self.minimum, false), (self.exclusive_minimum, true)];
        let upper = [(self.maximum, false), (self.exclusive_maximum, true)];
        lower.iter().any(|(lo, lo_strict)| {
            upper.iter().any(|(hi, hi_strict)| match (lo, hi) {
                (Some(lo), Some(hi)) if *lo_strict || *hi_strict => cmp_numbers(lo, hi) != Ordering::Less,
                (Some(lo), Some(hi)) => cmp_numbers(lo, hi) == Ordering::Greater,
                _ => false,
            })
        })
    }

    pub fn annotations(&self, table: &mut DeclarationTable) -> Vec<String> {
        let mut out = Vec::new();
        let interval: Vec<String> = [
            ("ge", self.minimum),
            ("gt", self.exclusive_minimum),
            ("le", self.maximum),
            ("lt", self.exclusive_maximum),
        ]
        .into_iter()
        .filter_map(|(arg, bound)| bound.map(|n| format!("{arg}={}", py_number(n))))
        .collect();
        if !interval.is_empty() {
            table.import("annotated_types", "Interval");
            out.push(format!("Interval({})", interval.join(", ")));
        }
        if let Some(step) = self.multiple_of {
            table.import("annotated_types", "MultipleOf");
            out.push(format!("MultipleOf({})", py_number(step)));
        }
        out
    }
}

impl<'s> Resolver<'s> {
    pub(super) fn build_number(&mut self, kind: Kind, node: &SchemaNode, hint: &str) -> Ty {
        let bounds = NumericBounds::of(node);
        if !bounds.is_active() {
            return Ty::bare(kind);
        }
        if bounds.contradiction() {
            return self.contradiction("numeric bounds admit no value");
        }
        let base = if kind == Kind::Integer { "int" } else { "float" };
        let name = self.fresh_name(hint);
        let annotations = bounds.annotations(&mut self.table);
        self.declare_annotated(name, base, &annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::settings::Settings;
    use serde_json::{Value, json};

    fn bounds_of(value: Value) -> (bool, bool) {
        let node: SchemaNode = serde_json::from_value(value).unwrap();
        let bounds = NumericBounds::of(&node);
        (bounds.is_active(), bounds.contradiction())
    }

    #[test]
    fn contradictions() {
        assert_eq!(bounds_of(json!({"minimum": 5, "maximum": 1})), (true, true));
        assert_eq!(bounds_of(json!({"minimum": 5, "maximum": 5})), (true, false));
        assert_eq!(bounds_of(json!({"minimum": 5, "exclusiveMaximum": 5})), (true, true));
        assert_eq!(bounds_of(json!({"exclusiveMinimum": 5, "maximum": 5})), (true, true));
        assert_eq!(bounds_of(json!({"exclusiveMinimum": 1.5, "exclusiveMaximum": 1.5})), (true, true));
        assert_eq!(bounds_of(json!({"minimum": 9, "maximum": 1, "multipleOf": 2})), (true, true));
        assert_eq!(bounds_of(json!({"multipleOf": 2})), (true, false));
        assert_eq!(bounds_of(json!({"minimum": 9007199254740993_u64, "maximum": 9007199254740992_u64})), (true, true));
        assert_eq!(bounds_of(json!({"minimum": 9007199254740992_u64, "exclusiveMaximum": 9007199254740993_u64})), (true, false));
        assert_eq!(bounds_of(json!({"minLength": 2})), (false, false));
    }

    fn build(value: Value) -> (Ty, Option<String>) {
        let schema: Schema = serde_json::from_value(value).unwrap();
        let settings = Settings::default();
        let mut resolver = Resolver::new(&schema, &settings);
        let ty = resolver.resolve(&schema, "Score");
        let body = resolver.into_table().body("Score").map(str::to_string);
        (ty, body)
    }

    #[test]
    fn declaration_carries_interval_and_step() {
        let (ty, body) = build(json!({"type": "integer", "minimum": 0, "exclusiveMaximum": 100, "multipleOf": 5}));
        assert_eq!(ty, Ty::named("Score"));
        assert_eq!(body.as_deref(), Some("type Score = Annotated[int, Interval(ge=0, lt=100), MultipleOf(5)]"));
    }

    #[test]
    fn floats_keep_their_spelling() {
        let (_, body) = build(json!({"type": "number", "exclusiveMinimum": 0.5}));
        assert_eq!(body.as_deref(), Some("type Score = Annotated[float, Interval(gt=0.5)]"));
    }

    #[test]
    fn contradiction_registers_nothing() {
        let (ty, body) = build(json!({"type": "number", "minimum": 10, "maximum": 1}));
        assert_eq!(ty, Ty::Never);
        assert_eq!(body, None);
    }
}
