// Resolved-type IR. Host-language text is produced from this by `codegen`.
use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use serde_json::Value;

use crate::schema::{Kind, is_integral};

/// A resolved type reference. Variant order is the rendering order of union
/// members, so `None` sorts last and the universal/uninhabited types never
/// survive inside a union.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ty {
    Named(String),
    Integer,
    /// Generic JSON number; expands to `Integer | Float | Decimal` in unions.
    Number,
    Float,
    Decimal,
    String,
    Bool,
    List(Box<Ty>),
    /// String-keyed record of the given value type.
    Record(Box<Ty>),
    Literal(BTreeSet<Literal>),
    Union(BTreeSet<Ty>),
    Null,
    Any,
    Never,
}

impl Ty {
    pub fn named(name: impl Into<String>) -> Ty {
        Ty::Named(name.into())
    }

    /// The bare primitive for a kind: what a node of that kind with no
    /// active constraints resolves to.
    pub fn bare(kind: Kind) -> Ty {
        match kind {
            Kind::Integer => Ty::Integer,
            Kind::Number => Ty::Number,
            Kind::Boolean => Ty::Bool,
            Kind::String => Ty::String,
            Kind::Array => Ty::List(Box::new(Ty::Any)),
            Kind::Object => Ty::Record(Box::new(Ty::Any)),
            Kind::Null => Ty::Null,
        }
    }

    /// Build a normalized union: nested unions are flattened, `Never`
    /// members dropped, `Any` absorbs everything, the generic number is
    /// expanded, and duplicates collapse.
    pub fn union(members: impl IntoIterator<Item = Ty>) -> Ty {
        let mut set = BTreeSet::new();
        let mut stack: Vec<Ty> = members.into_iter().collect();
        while let Some(ty) = stack.pop() {
            match ty {
                Ty::Any => return Ty::Any,
                Ty::Never => {}
                Ty::Union(inner) => stack.extend(inner),
                Ty::Number => {
                    set.insert(Ty::Integer);
                    set.insert(Ty::Float);
                    set.insert(Ty::Decimal);
                }
                other => {
                    set.insert(other);
                }
            }
        }
        match set.len() {
            0 => Ty::Never,
            1 => set.into_iter().next().unwrap_or(Ty::Never),
            _ => Ty::Union(set),
        }
    }

    /// Literal set; `{null}` alone is just `Null` and `{}` is `Never`.
    pub fn literals(set: BTreeSet<Literal>) -> Ty {
        if set.is_empty() {
            Ty::Never
        } else if set.len() == 1 && set.contains(&Literal::Null) {
            Ty::Null
        } else {
            Ty::Literal(set)
        }
    }
}

/// A JSON value usable as a member of a literal type. Floats are wrapped so
/// literal sets can be ordered and de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    Bool(bool),
    Int(i128),
    Float(OrderedFloat<f64>),
    Str(String),
    /// Arrays and objects, kept as canonical JSON text.
    Composite { kind: Kind, json: String },
    Null,
}

impl Literal {
    pub fn from_value(value: &Value) -> Literal {
        match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Literal::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Literal::Int(u as i128)
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if is_integral(n) && f.abs() < 1e18 {
                        Literal::Int(f as i128)
                    } else {
                        Literal::Float(OrderedFloat(f))
                    }
                }
            }
            Value::String(s) => Literal::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => Literal::Composite {
                kind: Kind::of_value(value),
                json: value.to_string(),
            },
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Literal::Bool(_) => Kind::Boolean,
            Literal::Int(_) => Kind::Integer,
            Literal::Float(_) => Kind::Number,
            Literal::Str(_) => Kind::String,
            Literal::Composite { kind, .. } => *kind,
            Literal::Null => Kind::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn union_expands_generic_number() {
        let ty = Ty::union([Ty::Number, Ty::String]);
        assert_eq!(
            ty,
            Ty::Union(BTreeSet::from([Ty::Integer, Ty::Float, Ty::Decimal, Ty::String]))
        );
    }

    #[test]
    fn union_dedups_and_flattens() {
        let inner = Ty::union([Ty::Null, Ty::named("A")]);
        let ty = Ty::union([inner, Ty::named("A"), Ty::Integer, Ty::Number]);
        assert_eq!(
            ty,
            Ty::Union(BTreeSet::from([
                Ty::named("A"),
                Ty::Integer,
                Ty::Float,
                Ty::Decimal,
                Ty::Null
            ]))
        );
    }

    #[test]
    fn union_absorbs_and_drops() {
        assert_eq!(Ty::union([Ty::String, Ty::Any]), Ty::Any);
        assert_eq!(Ty::union([Ty::String, Ty::Never]), Ty::String);
        assert_eq!(Ty::union([Ty::Never]), Ty::Never);
        assert_eq!(Ty::union([]), Ty::Never);
    }

    #[test]
    fn literal_kinds() {
        assert_eq!(Literal::from_value(&json!(2.0)), Literal::Int(2));
        assert_eq!(Literal::from_value(&json!(2.5)).kind(), Kind::Number);
        assert_eq!(Literal::from_value(&json!([1])).kind(), Kind::Array);
        assert_eq!(Literal::from_value(&json!(null)), Literal::Null);
    }
}
