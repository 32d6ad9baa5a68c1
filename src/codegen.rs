//! Host-language text for resolved types and JSON literals.
//!
//! Every renderer records the imports it relies on in the declaration
//! table, so assembly never has to rescan the emitted text.
use serde_json::{Number, Value};

use crate::ir::{Literal, Ty};
use crate::table::DeclarationTable;

pub fn render(ty: &Ty, table: &mut DeclarationTable) -> String {
    match ty {
        Ty::Named(name) => name.clone(),
        Ty::Integer => "int".to_string(),
        Ty::Number | Ty::Float => "float".to_string(),
        Ty::Decimal => {
            table.import("decimal", "Decimal");
            "Decimal".to_string()
        }
        Ty::String => "str".to_string(),
        Ty::Bool => "bool".to_string(),
        Ty::List(item) => format!("list[{}]", render(item, table)),
        Ty::Record(value) => format!("dict[str, {}]", render(value, table)),
        Ty::Literal(set) => render_literals(set, table),
        Ty::Union(members) => members.iter().map(|m| render(m, table)).collect::<Vec<_>>().join(" | "),
        Ty::Null => "None".to_string(),
        Ty::Any => {
            table.import("typing", "Any");
            "Any".to_string()
        }
        Ty::Never => {
            table.import("typing", "Never");
            "Never".to_string()
        }
    }
}

/// `Literal[...]` covers booleans, integers and strings; `None` stands for
/// null; the rest are carried as `Const` annotations on their kind.
fn render_literals<'a>(set: impl IntoIterator<Item = &'a Literal>, table: &mut DeclarationTable) -> String {
    let mut plain = Vec::new();
    let mut arms = Vec::new();
    let mut nullable = false;
    for literal in set {
        match literal {
            Literal::Bool(b) => plain.push(py_bool(*b).to_string()),
            Literal::Int(i) => plain.push(i.to_string()),
            Literal::Str(s) => plain.push(py_str(s)),
            Literal::Float(f) => {
                let value = Number::from_f64(f.0).map(|n| n.to_string()).unwrap_or_else(|| "float(\"nan\")".into());
                table.import_runtime("Const");
                arms.push(annotated("float", &[format!("Const({value})")], table));
            }
            Literal::Composite { kind, json } => {
                let value: Value = serde_json::from_str(json).unwrap_or(Value::Null);
                let base = render(&Ty::bare(*kind), table);
                table.import_runtime("Const");
                arms.push(annotated(&base, &[format!("Const({})", py_literal(&value))], table));
            }
            Literal::Null => nullable = true,
        }
    }
    let mut out = Vec::new();
    if !plain.is_empty() {
        table.import("typing", "Literal");
        out.push(format!("Literal[{}]", plain.join(", ")));
    }
    out.extend(arms);
    if nullable {
        out.push("None".to_string());
    }
    out.join(" | ")
}

/// `Annotated[base, a, b]`, or just `base` when there is nothing to attach.
pub fn annotated(base: &str, annotations: &[String], table: &mut DeclarationTable) -> String {
    if annotations.is_empty() {
        return base.to_string();
    }
    table.import("typing", "Annotated");
    format!("Annotated[{base}, {}]", annotations.join(", "))
}

pub fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Double-quoted string literal. JSON escapes are valid host escapes.
pub fn py_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Raw string for regular expressions when the pattern allows it.
pub fn py_pattern(pattern: &str) -> String {
    if pattern.contains('"') || pattern.contains('\n') || pattern.ends_with('\\') {
        py_str(pattern)
    } else {
        format!("r\"{pattern}\"")
    }
}

pub fn py_number(n: &Number) -> String {
    n.to_string()
}

pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => py_bool(*b).to_string(),
        Value::Number(n) => py_number(n),
        Value::String(s) => py_str(s),
        Value::Array(items) => format!("[{}]", items.iter().map(py_literal).collect::<Vec<_>>().join(", ")),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Docstring body; backslashes, triple quotes and a trailing quote are escaped.
pub fn py_docstring(text: &str, indent: &str) -> String {
    let mut escaped = text.trim().replace('\\', "\\\\");
    // a quote right before the closing delimiter would end the string early
    if escaped.ends_with('"') {
        escaped.pop();
        escaped.push_str("\\\"");
    }
    let escaped = escaped.replace("\"\"\"", "\\\"\\\"\\\"");
    if escaped.contains('\n') {
        let body = escaped.lines().map(|l| format!("{indent}{l}").trim_end().to_string()).collect::<Vec<_>>().join("\n");
        format!("{indent}\"\"\"\n{body}\n{indent}\"\"\"")
    } else {
        format!("{indent}\"\"\"{escaped}\"\"\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use serde_json::json;

    fn table() -> DeclarationTable {
        DeclarationTable::new("rt")
    }

    #[test]
    fn primitives_and_containers() {
        let mut t = table();
        assert_eq!(render(&Ty::bare(crate::schema::Kind::Object), &mut t), "dict[str, Any]");
        assert_eq!(render(&Ty::List(Box::new(Ty::Named("Item".into()))), &mut t), "list[Item]");
        assert_eq!(render(&Ty::Never, &mut t), "Never");
        let names: Vec<_> = t.imports().into_iter().flat_map(|i| i.names).collect();
        assert_eq!(names, ["Any", "Never"]);
    }

    #[test]
    fn unions_put_none_last() {
        let mut t = table();
        let ty = Ty::union([Ty::Null, Ty::String, Ty::Number]);
        assert_eq!(render(&ty, &mut t), "int | float | Decimal | str | None");
    }

    #[test]
    fn literals_split_by_representability() {
        let mut t = table();
        let set: BTreeSet<Literal> =
            [json!("a"), json!(1), json!(true), json!(1.5), json!(null), json!([1])]
                .iter()
                .map(Literal::from_value)
                .collect();
        assert_eq!(
            render(&Ty::Literal(set), &mut t),
            "Literal[True, 1, \"a\"] | Annotated[float, Const(1.5)] | Annotated[list[Any], Const([1])] | None"
        );
    }

    #[test]
    fn python_literals() {
        assert_eq!(py_literal(&json!({"a": [1, null, false]})), "{\"a\": [1, None, False]}");
        assert_eq!(py_pattern("^\\d+$"), "r\"^\\d+$\"");
        assert_eq!(py_pattern("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn docstrings() {
        assert_eq!(py_docstring("One line.", "    "), "    \"\"\"One line.\"\"\"");
        assert_eq!(py_docstring("a\nb", ""), "\"\"\"\na\nb\n\"\"\"");
        assert_eq!(py_docstring("He said \"hi\"", ""), "\"\"\"He said \"hi\\\"\"\"\"");
        assert_eq!(py_docstring("x\\", ""), "\"\"\"x\\\\\"\"\"");
        assert_eq!(py_docstring("ends in \"\"\"", ""), "\"\"\"ends in \"\"\\\"\"\"\"");
    }
}
