//! Canonical in-memory form of a JSON Schema 2020-12 document.
//!
//! Every applicator position holds a [`Schema`], which is either a boolean
//! literal or a structured [`SchemaNode`]. The `type` keyword is always
//! materialized as a [`KindSet`], whether the document spelled it as one
//! string or as a list.
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Number, Value};

// ————————————————————————————————————————————————————————————————————————————
// KINDS
// ————————————————————————————————————————————————————————————————————————————

/// One of the seven JSON value categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Integer,
    Number,
    Boolean,
    String,
    Array,
    Object,
    Null,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::Integer,
        Kind::Number,
        Kind::Boolean,
        Kind::String,
        Kind::Array,
        Kind::Object,
        Kind::Null,
    ];

    pub fn from_name(name: &str) -> Option<Kind> {
        Some(match name {
            "integer" => Kind::Integer,
            "number" => Kind::Number,
            "boolean" => Kind::Boolean,
            "string" => Kind::String,
            "array" => Kind::Array,
            "object" => Kind::Object,
            "null" => Kind::Null,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Null => "null",
        }
    }

    /// Kind of a runtime JSON value. Numbers with a zero fractional part
    /// count as integers, as the 2020-12 dialect requires.
    pub fn of_value(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Boolean,
            Value::Number(n) if is_integral(n) => Kind::Integer,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }
}

pub(crate) fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Normalized `type` keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindSet(pub BTreeSet<Kind>);

impl KindSet {
    pub fn all() -> Self {
        KindSet(Kind::ALL.into_iter().collect())
    }

    pub fn contains(&self, kind: Kind) -> bool {
        self.0.contains(&kind)
    }

    /// Whether a value of `kind` is admitted. `number` admits integers too.
    pub fn admits(&self, kind: Kind) -> bool {
        self.contains(kind) || (kind == Kind::Integer && self.contains(Kind::Number))
    }

    /// Intersection under the same subtyping rule as [`KindSet::admits`].
    pub fn intersect(&self, other: &KindSet) -> KindSet {
        KindSet(
            Kind::ALL
                .into_iter()
                .filter(|k| {
                    (self.contains(*k) && other.admits(*k)) || (other.contains(*k) && self.admits(*k))
                })
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for KindSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KindSetVisitor;

        impl<'de> Visitor<'de> for KindSetVisitor {
            type Value = KindSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a type name or a list of type names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<KindSet, E> {
                let kind = Kind::from_name(v).ok_or_else(|| E::custom(format!("unknown type name `{v}`")))?;
                Ok(KindSet(BTreeSet::from([kind])))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<KindSet, A::Error> {
                let mut out = BTreeSet::new();
                while let Some(name) = seq.next_element::<String>()? {
                    let kind = Kind::from_name(&name)
                        .ok_or_else(|| de::Error::custom(format!("unknown type name `{name}`")))?;
                    out.insert(kind);
                }
                Ok(KindSet(out))
            }
        }

        deserializer.deserialize_any(KindSetVisitor)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA
// ————————————————————————————————————————————————————————————————————————————

/// A schema position: `true`, `false`, or a structured node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Bool(bool),
    Node(Box<SchemaNode>),
}

impl Schema {
    pub fn node(&self) -> Option<&SchemaNode> {
        match self {
            Schema::Node(node) => Some(node),
            Schema::Bool(_) => None,
        }
    }

    /// Follow a JSON pointer (without the leading `#`) through applicator
    /// keywords. Only schema-valued positions are reachable.
    pub fn pointer(&self, pointer: &str) -> Option<&Schema> {
        if pointer.is_empty() {
            return Some(self);
        }
        let mut tokens = pointer.strip_prefix('/')?.split('/').map(unescape_token);
        let mut current = self;
        while let Some(token) = tokens.next() {
            let node = current.node()?;
            current = match token.as_str() {
                "$defs" | "definitions" => node.defs.get(&tokens.next()?)?,
                "properties" => node.properties.as_ref()?.get(&tokens.next()?)?,
                "patternProperties" => node.pattern_properties.as_ref()?.get(&tokens.next()?)?,
                "dependentSchemas" => node.dependent_schemas.as_ref()?.get(&tokens.next()?)?,
                "prefixItems" => node.prefix_items.as_ref()?.get(tokens.next()?.parse::<usize>().ok()?)?,
                "allOf" => node.all_of.as_ref()?.get(tokens.next()?.parse::<usize>().ok()?)?,
                "anyOf" => node.any_of.as_ref()?.get(tokens.next()?.parse::<usize>().ok()?)?,
                "oneOf" => node.one_of.as_ref()?.get(tokens.next()?.parse::<usize>().ok()?)?,
                "items" => node.items.as_ref()?,
                "contains" => node.contains.as_ref()?,
                "additionalProperties" => node.additional_properties.as_ref()?,
                "propertyNames" => node.property_names.as_ref()?,
                "unevaluatedItems" => node.unevaluated_items.as_ref()?,
                "unevaluatedProperties" => node.unevaluated_properties.as_ref()?,
                "not" => node.not.as_ref()?,
                "if" => node.if_.as_ref()?,
                "then" => node.then.as_ref()?,
                "else" => node.else_.as_ref()?,
                _ => return None,
            };
        }
        Some(current)
    }
}

pub(crate) fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

pub(crate) fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a schema object or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Schema, E> {
                Ok(Schema::Bool(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Schema, A::Error> {
                let node = SchemaNode::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(Schema::Node(Box::new(node)))
            }
        }

        deserializer.deserialize_any(SchemaVisitor)
    }
}

/// One parsed schema object. Unknown keywords are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaNode {
    // identity
    #[serde(rename = "$id")]
    pub id: Option<String>,
    #[serde(rename = "$schema")]
    pub schema: Option<String>,
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "$anchor")]
    pub anchor: Option<String>,
    #[serde(rename = "$comment")]
    pub comment: Option<String>,
    #[serde(rename = "$defs", alias = "definitions")]
    pub defs: IndexMap<String, Schema>,

    // applicators
    pub items: Option<Schema>,
    pub prefix_items: Option<Vec<Schema>>,
    pub contains: Option<Schema>,
    pub properties: Option<IndexMap<String, Schema>>,
    pub pattern_properties: Option<IndexMap<String, Schema>>,
    pub additional_properties: Option<Schema>,
    pub property_names: Option<Schema>,
    #[serde(alias = "dependentSchema")]
    pub dependent_schemas: Option<IndexMap<String, Schema>>,
    pub unevaluated_items: Option<Schema>,
    pub unevaluated_properties: Option<Schema>,
    pub all_of: Option<Vec<Schema>>,
    pub one_of: Option<Vec<Schema>>,
    pub any_of: Option<Vec<Schema>>,
    pub not: Option<Schema>,
    #[serde(rename = "if")]
    pub if_: Option<Schema>,
    pub then: Option<Schema>,
    #[serde(rename = "else")]
    pub else_: Option<Schema>,

    // validation
    #[serde(rename = "type")]
    pub kinds: Option<KindSet>,
    #[serde(rename = "enum")]
    pub enum_: Option<Vec<Value>>,
    #[serde(rename = "const", deserialize_with = "present")]
    pub const_: Option<Value>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub multiple_of: Option<Number>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,
    pub min_contains: Option<u64>,
    pub max_contains: Option<u64>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub required: Option<Vec<String>>,
    pub dependent_required: Option<IndexMap<String, Vec<String>>>,

    // metadata
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "present")]
    pub default: Option<Value>,
    pub deprecated: Option<bool>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub examples: Option<Vec<Value>>,
}

/// `null` is a meaningful `const`/`default`; keep it as `Some(Value::Null)`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Order on JSON numbers. Integers compare exactly; anything fractional
/// falls back to `f64`.
pub fn cmp_numbers(a: &Number, b: &Number) -> Ordering {
    fn exact(n: &Number) -> Option<i128> {
        n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
    }
    match (exact(a), exact(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => OrderedFloat(a.as_f64().unwrap_or(f64::NAN)).cmp(&OrderedFloat(b.as_f64().unwrap_or(f64::NAN))),
    }
}

impl SchemaNode {
    pub fn is_composed(&self) -> bool {
        self.all_of.is_some()
            || self.any_of.is_some()
            || self.one_of.is_some()
            || self.not.is_some()
            || self.if_.is_some()
            || self.then.is_some()
            || self.else_.is_some()
    }

    /// Whether any keyword besides identity and metadata is present.
    pub fn has_assertions(&self) -> bool {
        let stripped = SchemaNode {
            id: None,
            schema: None,
            anchor: None,
            comment: None,
            defs: IndexMap::new(),
            title: None,
            description: None,
            default: None,
            deprecated: None,
            read_only: None,
            write_only: None,
            examples: None,
            ..self.clone()
        };
        stripped != SchemaNode::default()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Schema {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn large_integers_compare_exactly() {
        let number = |text: &str| serde_json::from_str::<Number>(text).unwrap();
        assert_eq!(cmp_numbers(&number("9007199254740993"), &number("9007199254740992")), Ordering::Greater);
        assert_eq!(cmp_numbers(&number("18446744073709551615"), &number("-1")), Ordering::Greater);
        assert_eq!(cmp_numbers(&number("1.5"), &number("2")), Ordering::Less);
        assert_eq!(cmp_numbers(&number("2.0"), &number("2")), Ordering::Equal);
    }

    #[test]
    fn type_string_and_list_normalize_to_sets() {
        let one = parse(json!({"type": "string"}));
        let many = parse(json!({"type": ["string", "null", "string"]}));
        assert_eq!(one.node().unwrap().kinds, Some(KindSet(BTreeSet::from([Kind::String]))));
        assert_eq!(
            many.node().unwrap().kinds,
            Some(KindSet(BTreeSet::from([Kind::String, Kind::Null])))
        );
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let err = serde_json::from_value::<Schema>(json!({"type": "any"})).unwrap_err();
        assert!(err.to_string().contains("unknown type name `any`"));
    }

    #[test]
    fn boolean_positions_are_tagged() {
        let schema = parse(json!({
            "items": false,
            "additionalProperties": true,
            "properties": {"a": {"type": "integer"}, "b": false}
        }));
        let node = schema.node().unwrap();
        assert_eq!(node.items, Some(Schema::Bool(false)));
        assert_eq!(node.additional_properties, Some(Schema::Bool(true)));
        let props = node.properties.as_ref().unwrap();
        assert!(matches!(props["a"], Schema::Node(_)));
        assert_eq!(props["b"], Schema::Bool(false));
    }

    #[test]
    fn null_const_and_default_are_present() {
        let schema = parse(json!({"const": null, "default": null}));
        let node = schema.node().unwrap();
        assert_eq!(node.const_, Some(Value::Null));
        assert_eq!(node.default, Some(Value::Null));
        assert_eq!(parse(json!({})).node().unwrap().const_, None);
    }

    #[test]
    fn legacy_spellings_are_accepted() {
        let schema = parse(json!({
            "definitions": {"A": true},
            "dependentSchema": {"a": {"required": ["b"]}}
        }));
        let node = schema.node().unwrap();
        assert!(node.defs.contains_key("A"));
        assert!(node.dependent_schemas.as_ref().unwrap().contains_key("a"));
    }

    #[test]
    fn pointer_walks_applicators() {
        let schema = parse(json!({
            "$defs": {"a/b": {"properties": {"x": {"prefixItems": [true, {"type": "null"}]}}}}
        }));
        let target = schema.pointer("/$defs/a~1b/properties/x/prefixItems/1").unwrap();
        assert_eq!(target.node().unwrap().kinds, Some(KindSet(BTreeSet::from([Kind::Null]))));
        assert!(schema.pointer("/$defs/missing").is_none());
        assert_eq!(schema.pointer(""), Some(&schema));
    }

    #[test]
    fn integral_floats_are_integers() {
        assert_eq!(Kind::of_value(&json!(1.0)), Kind::Integer);
        assert_eq!(Kind::of_value(&json!(1.5)), Kind::Number);
        assert_eq!(Kind::of_value(&json!(u64::MAX)), Kind::Integer);
    }

    #[test]
    fn kind_intersection_keeps_integer_under_number() {
        let a = KindSet(BTreeSet::from([Kind::Number, Kind::String]));
        let b = KindSet(BTreeSet::from([Kind::Integer]));
        assert_eq!(a.intersect(&b), KindSet(BTreeSet::from([Kind::Integer])));
        assert_eq!(a.intersect(&a), a);
    }

    #[test]
    fn metadata_only_nodes_have_no_assertions() {
        let meta = parse(json!({"title": "T", "description": "d", "$id": "x"}));
        assert!(!meta.node().unwrap().has_assertions());
        let real = parse(json!({"title": "T", "minimum": 1}));
        assert!(real.node().unwrap().has_assertions());
    }
}
