//! Intersection of schema nodes, used for `allOf` and for `$ref` with
//! sibling assertions.
//!
//! Policy:
//! - kind sets intersect (`integer` survives against `number`);
//! - lower bounds take the max, upper bounds the min;
//! - `required` and `dependentRequired` union, `enum` intersects, and a
//!   disagreeing `const` makes the node unsatisfiable;
//! - applicator positions merge recursively (`false` wins, `true` yields);
//! - conflicting `pattern`, `format` or `multipleOf` keep the first value
//!   and record a warning.
use std::cmp::Ordering;

use indexmap::IndexMap;
use serde_json::Number;

use crate::refs::RefIndex;
use crate::schema::{Schema, SchemaNode, cmp_numbers};

/// How many `$ref` hops a single inline may follow, and how deep nested
/// merges may go.
const MAX_INLINE_DEPTH: usize = 32;

pub struct Merger<'a, 's> {
    refs: &'a RefIndex<'s>,
    depth: usize,
    /// `$ref` pairs whose targets are being merged right now.
    merging: Vec<(String, String)>,
    pub warnings: Vec<String>,
}

impl<'a, 's> Merger<'a, 's> {
    pub fn new(refs: &'a RefIndex<'s>) -> Self {
        Merger { refs, depth: 0, merging: Vec::new(), warnings: Vec::new() }
    }

    /// Copy of `node` with its `$ref` and `allOf` folded in.
    pub fn inline(&mut self, node: &SchemaNode) -> SchemaNode {
        let mut out = node.clone();
        if let Some(reference) = out.reference.take() {
            match self.refs.lookup(&reference) {
                Some(_) if self.depth >= MAX_INLINE_DEPTH => {
                    self.warnings.push(format!("`{reference}` is too deeply self-referential to merge"));
                    out.reference = Some(reference);
                }
                Some(target) => {
                    self.depth += 1;
                    self.absorb(&mut out, target.schema);
                    self.depth -= 1;
                }
                None => self.warnings.push(format!("unresolvable reference `{reference}`; ignored")),
            }
        }
        if let Some(branches) = out.all_of.take() {
            for branch in &branches {
                self.absorb(&mut out, branch);
            }
        }
        out
    }

    /// `base ∧ branch`, in place.
    pub fn absorb(&mut self, base: &mut SchemaNode, branch: &Schema) {
        match branch {
            Schema::Bool(true) => {}
            Schema::Bool(false) => base.enum_ = Some(Vec::new()),
            Schema::Node(node) => {
                let node = self.inline(node);
                self.merge_node(base, &node);
            }
        }
    }

    /// A pair of references that comes back around while its targets are
    /// still being merged stays un-inlined, keeping the first side.
    fn merge_schema(&mut self, a: &Schema, b: &Schema) -> Schema {
        if a == b {
            return a.clone();
        }
        match (a, b) {
            (Schema::Bool(false), _) | (_, Schema::Bool(false)) => Schema::Bool(false),
            (Schema::Bool(true), other) | (other, Schema::Bool(true)) => other.clone(),
            (Schema::Node(x), Schema::Node(y)) => {
                let pair = match (&x.reference, &y.reference) {
                    (Some(rx), Some(ry)) => Some((rx.clone(), ry.clone())),
                    _ => None,
                };
                let cyclic = pair.as_ref().is_some_and(|pair| self.merging.contains(pair));
                if cyclic || self.depth >= MAX_INLINE_DEPTH {
                    let what = x.reference.as_deref().unwrap_or("subschema");
                    self.warnings.push(format!("`{what}` is recursive; kept as is instead of merging"));
                    return a.clone();
                }
                let pushed = pair.is_some();
                if let Some(pair) = pair {
                    self.merging.push(pair);
                }
                self.depth += 1;
                let mut merged = self.inline(x);
                let y = self.inline(y);
                self.merge_node(&mut merged, &y);
                self.depth -= 1;
                if pushed {
                    self.merging.pop();
                }
                Schema::Node(Box::new(merged))
            }
        }
    }

    fn merge_opt(&mut self, a: &mut Option<Schema>, b: &Option<Schema>) {
        match (a.as_ref(), b) {
            (_, None) => {}
            (None, Some(b)) => *a = Some(b.clone()),
            (Some(x), Some(y)) => *a = Some(self.merge_schema(x, y)),
        }
    }

    fn merge_map(&mut self, a: &mut Option<IndexMap<String, Schema>>, b: &Option<IndexMap<String, Schema>>) {
        let Some(b) = b else { return };
        let a = a.get_or_insert_with(IndexMap::new);
        for (key, schema) in b {
            let merged = match a.get(key) {
                Some(existing) => self.merge_schema(existing, schema),
                None => schema.clone(),
            };
            a.insert(key.clone(), merged);
        }
    }

    fn merge_node(&mut self, a: &mut SchemaNode, b: &SchemaNode) {
        // kinds, literals
        a.kinds = match (a.kinds.take(), &b.kinds) {
            (Some(x), Some(y)) => Some(x.intersect(y)),
            (x, y) => x.or_else(|| y.clone()),
        };
        if let Some(values) = &b.enum_ {
            a.enum_ = Some(match a.enum_.take() {
                Some(mine) => mine.into_iter().filter(|v| values.contains(v)).collect(),
                None => values.clone(),
            });
        }
        match (&a.const_, &b.const_) {
            (Some(x), Some(y)) if x != y => a.enum_ = Some(Vec::new()),
            (None, Some(y)) => a.const_ = Some(y.clone()),
            _ => {}
        }

        // numeric
        a.minimum = tighter(a.minimum.take(), &b.minimum, Bound::Lower);
        a.exclusive_minimum = tighter(a.exclusive_minimum.take(), &b.exclusive_minimum, Bound::Lower);
        a.maximum = tighter(a.maximum.take(), &b.maximum, Bound::Upper);
        a.exclusive_maximum = tighter(a.exclusive_maximum.take(), &b.exclusive_maximum, Bound::Upper);
        a.multiple_of = match (a.multiple_of.take(), &b.multiple_of) {
            (Some(x), Some(y)) => Some(self.merge_multiple_of(x, y)),
            (x, y) => x.or_else(|| y.clone()),
        };

        // lengths and counts
        a.min_length = max_opt(a.min_length, b.min_length);
        a.max_length = min_opt(a.max_length, b.max_length);
        a.min_items = max_opt(a.min_items, b.min_items);
        a.max_items = min_opt(a.max_items, b.max_items);
        a.min_contains = max_opt(a.min_contains, b.min_contains);
        a.max_contains = min_opt(a.max_contains, b.max_contains);
        a.min_properties = max_opt(a.min_properties, b.min_properties);
        a.max_properties = min_opt(a.max_properties, b.max_properties);
        a.unique_items = match (a.unique_items, b.unique_items) {
            (Some(x), Some(y)) => Some(x || y),
            (x, y) => x.or(y),
        };
        self.first_wins("pattern", &mut a.pattern, &b.pattern);
        self.first_wins("format", &mut a.format, &b.format);

        // objects
        if let Some(required) = &b.required {
            let mine = a.required.get_or_insert_with(Vec::new);
            for name in required {
                if !mine.contains(name) {
                    mine.push(name.clone());
                }
            }
        }
        if let Some(deps) = &b.dependent_required {
            let mine = a.dependent_required.get_or_insert_with(IndexMap::new);
            for (key, names) in deps {
                let list = mine.entry(key.clone()).or_default();
                for name in names {
                    if !list.contains(name) {
                        list.push(name.clone());
                    }
                }
            }
        }
        self.merge_map(&mut a.properties, &b.properties);
        self.merge_map(&mut a.pattern_properties, &b.pattern_properties);
        self.merge_map(&mut a.dependent_schemas, &b.dependent_schemas);
        self.merge_opt(&mut a.additional_properties, &b.additional_properties);
        self.merge_opt(&mut a.unevaluated_properties, &b.unevaluated_properties);
        self.merge_opt(&mut a.property_names, &b.property_names);

        // arrays
        self.merge_opt(&mut a.items, &b.items);
        self.merge_opt(&mut a.contains, &b.contains);
        self.merge_opt(&mut a.unevaluated_items, &b.unevaluated_items);
        if let Some(theirs) = &b.prefix_items {
            let mine = a.prefix_items.get_or_insert_with(Vec::new);
            let merged: Vec<Schema> = (0..mine.len().max(theirs.len()))
                .map(|i| match (mine.get(i), theirs.get(i)) {
                    (Some(x), Some(y)) => self.merge_schema(x, y),
                    (Some(x), None) => x.clone(),
                    (None, Some(y)) => y.clone(),
                    (None, None) => Schema::Bool(true),
                })
                .collect();
            a.prefix_items = Some(merged);
        }

        // alternatives and conditionals are carried, not combined
        if let Some(alternatives) = &b.any_of {
            if a.any_of.is_some() {
                self.warnings.push("several `anyOf` lists in one intersection; keeping the first".to_string());
            } else {
                a.any_of = Some(alternatives.clone());
            }
        }
        if let Some(alternatives) = &b.one_of {
            if a.one_of.is_some() {
                self.warnings.push("several `oneOf` lists in one intersection; keeping the first".to_string());
            } else {
                a.one_of = Some(alternatives.clone());
            }
        }
        if a.not.is_none() {
            a.not = b.not.clone();
        }
        if a.if_.is_none() {
            a.if_ = b.if_.clone();
            a.then = a.then.take().or_else(|| b.then.clone());
            a.else_ = a.else_.take().or_else(|| b.else_.clone());
        }
        if a.reference.is_none() {
            a.reference = b.reference.clone();
        }

        // metadata fills gaps only
        a.title = a.title.take().or_else(|| b.title.clone());
        a.description = a.description.take().or_else(|| b.description.clone());
        a.default = a.default.take().or_else(|| b.default.clone());
        a.deprecated = a.deprecated.or(b.deprecated);
        a.read_only = a.read_only.or(b.read_only);
        a.write_only = a.write_only.or(b.write_only);
    }

    fn merge_multiple_of(&mut self, x: Number, y: &Number) -> Number {
        let (fx, fy) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
        let (small, large) = if fx <= fy { (fx, fy) } else { (fy, fx) };
        if small > 0.0 && (large / small).fract() == 0.0 {
            return if fx >= fy { x } else { y.clone() };
        }
        if x != *y {
            self.warnings.push(format!("conflicting `multipleOf` {x} and {y}; keeping {x}"));
        }
        x
    }

    fn first_wins(&mut self, keyword: &str, a: &mut Option<String>, b: &Option<String>) {
        match (a.as_ref(), b) {
            (Some(x), Some(y)) if x != y => {
                self.warnings.push(format!("conflicting `{keyword}` values `{x}` and `{y}`; keeping `{x}`"));
            }
            (None, Some(y)) => *a = Some(y.clone()),
            _ => {}
        }
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn tighter(a: Option<Number>, b: &Option<Number>, bound: Bound) -> Option<Number> {
    match (a, b) {
        (Some(x), Some(y)) => {
            let keep_x = match bound {
                Bound::Lower => cmp_numbers(&x, y) != Ordering::Less,
                Bound::Upper => cmp_numbers(&x, y) != Ordering::Greater,
            };
            Some(if keep_x { x } else { y.clone() })
        }
        (x, y) => x.or_else(|| y.clone()),
    }
}

fn max_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

fn min_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn schema(value: Value) -> Schema {
        serde_json::from_value(value).unwrap()
    }

    fn merged(root: Value) -> (SchemaNode, Vec<String>) {
        let root = schema(root);
        let index = RefIndex::new(&root);
        let mut merger = Merger::new(&index);
        let node = merger.inline(root.node().unwrap());
        (node, merger.warnings)
    }

    #[test]
    fn bounds_tighten() {
        let (node, warnings) = merged(json!({
            "allOf": [
                {"type": "number", "minimum": 0, "maximum": 100, "maxLength": 3},
                {"type": "integer", "minimum": 5, "maximum": 200, "multipleOf": 2},
                {"multipleOf": 4}
            ]
        }));
        assert!(warnings.is_empty());
        assert_eq!(node.kinds, schema(json!({"type": "integer"})).node().unwrap().kinds);
        assert_eq!(node.minimum, Some(Number::from(5)));
        assert_eq!(node.maximum, Some(Number::from(100)));
        assert_eq!(node.multiple_of, Some(Number::from(4)));
        assert_eq!(node.max_length, Some(3));
        assert!(node.all_of.is_none());
    }

    #[test]
    fn objects_merge_properties_and_required() {
        let (node, _) = merged(json!({
            "required": ["a"],
            "properties": {"a": {"type": "string"}},
            "allOf": [
                {"required": ["b", "a"], "properties": {"a": {"minLength": 1}, "b": true}}
            ]
        }));
        assert_eq!(node.required, Some(vec!["a".to_string(), "b".to_string()]));
        let props = node.properties.unwrap();
        let a = props["a"].node().unwrap();
        assert_eq!(a.min_length, Some(1));
        assert!(a.kinds.is_some());
        assert_eq!(props["b"], Schema::Bool(true));
    }

    #[test]
    fn false_branch_and_const_conflict_are_unsatisfiable() {
        let (node, _) = merged(json!({"allOf": [true, false]}));
        assert_eq!(node.enum_, Some(Vec::new()));
        let (node, _) = merged(json!({"const": 1, "allOf": [{"const": 2}]}));
        assert_eq!(node.enum_, Some(Vec::new()));
    }

    #[test]
    fn refs_are_inlined() {
        let (node, _) = merged(json!({
            "$defs": {"Base": {"type": "object", "properties": {"id": {"type": "integer"}}}},
            "allOf": [{"$ref": "#/$defs/Base"}, {"properties": {"name": {"type": "string"}}}]
        }));
        let props = node.properties.unwrap();
        assert_eq!(props.keys().collect::<Vec<_>>(), ["id", "name"]);
    }

    #[test]
    fn conflicting_patterns_warn_and_keep_first() {
        let (node, warnings) = merged(json!({"allOf": [{"pattern": "^a"}, {"pattern": "^b"}]}));
        assert_eq!(node.pattern.as_deref(), Some("^a"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn shared_recursive_ref_with_sibling_properties() {
        let (node, warnings) = merged(json!({
            "$defs": {"N": {"type": "object", "properties": {"next": {"$ref": "#/$defs/N"}}}},
            "$ref": "#/$defs/N",
            "properties": {"next": {"$ref": "#/$defs/N"}}
        }));
        assert!(warnings.is_empty());
        let props = node.properties.unwrap();
        assert_eq!(props["next"].node().unwrap().reference.as_deref(), Some("#/$defs/N"));
    }

    #[test]
    fn mutually_recursive_refs_stop_with_a_warning() {
        let (node, warnings) = merged(json!({
            "$defs": {
                "N": {"type": "object", "properties": {"next": {"$ref": "#/$defs/N"}}},
                "M": {"type": "object", "properties": {"next": {"$ref": "#/$defs/M"}}, "minProperties": 1}
            },
            "allOf": [{"$ref": "#/$defs/N"}, {"$ref": "#/$defs/M"}]
        }));
        assert_eq!(node.min_properties, Some(1));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("#/$defs/N"));
        let next = node.properties.unwrap()["next"].node().unwrap().clone();
        assert_eq!(next.min_properties, Some(1));
        let inner = next.properties.unwrap()["next"].node().unwrap().clone();
        assert_eq!(inner.reference.as_deref(), Some("#/$defs/N"));
    }

    #[test]
    fn large_integer_bounds_tighten_exactly() {
        let (node, _) = merged(json!({
            "allOf": [{"minimum": 9007199254740992_u64}, {"minimum": 9007199254740993_u64}]
        }));
        assert_eq!(node.minimum, Some(Number::from(9007199254740993_u64)));
    }

    #[test]
    fn enum_intersects() {
        let (node, _) = merged(json!({"enum": [1, 2, 3], "allOf": [{"enum": [2, 3, 4]}]}));
        assert_eq!(node.enum_, Some(vec![json!(2), json!(3)]));
    }
}
