//! Final assembly of declaration fragments into one source file.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::naming::is_valid_identifier;
use crate::response::Diagnostic;
use crate::table::{Declaration, Import};

static MODULE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{Alphabetic}_][\p{Alphabetic}\p{N}_]*(\.[\p{Alphabetic}_][\p{Alphabetic}\p{N}_]*)*$")
        .expect("module path regex")
});

/// Modules that ship with the interpreter; grouped ahead of third-party ones.
const STDLIB: &[&str] = &["__future__", "decimal", "typing"];

pub const HEADER: &str = "# Generated by json-typesmith. Do not edit by hand.";

#[derive(Debug, Clone, Default)]
pub struct Formatted {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turns ordered fragments into final text. Malformed imports are fatal;
/// malformed declarations are reported and still emitted.
pub trait SourceFormatter {
    fn format(&self, imports: &[Import], declarations: &[Declaration]) -> Result<Formatted>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonFormatter;

impl SourceFormatter for PythonFormatter {
    fn format(&self, imports: &[Import], declarations: &[Declaration]) -> Result<Formatted> {
        for import in imports {
            check_import(import)?;
        }
        let diagnostics = declarations
            .iter()
            .filter_map(|d| unbalanced(&d.body).map(|msg| Diagnostic::error(d.name.clone(), msg)))
            .collect();

        let (std, third): (Vec<&Import>, Vec<&Import>) =
            imports.iter().partition(|i| STDLIB.contains(&i.module.as_str()) || i.module == "typing_extensions");
        let mut sections = vec![HEADER.to_string(), "from __future__ import annotations".to_string()];
        for group in [std, third] {
            if !group.is_empty() {
                sections.push(group.iter().map(|i| import_line(i)).collect::<Vec<_>>().join("\n"));
            }
        }
        let mut source = sections.join("\n\n");
        for declaration in declarations {
            source.push_str("\n\n\n");
            source.push_str(declaration.body.trim_end());
        }
        source.push('\n');
        Ok(Formatted { source, diagnostics })
    }
}

fn check_import(import: &Import) -> Result<()> {
    let invalid = |name: &str| Error::InvalidImport { module: import.module.clone(), name: name.to_string() };
    if !MODULE_PATH.is_match(&import.module) {
        return Err(invalid(&import.names.join(", ")));
    }
    if import.names.is_empty() {
        return Err(invalid(""));
    }
    match import.names.iter().find(|n| !is_valid_identifier(n)) {
        Some(name) => Err(invalid(name)),
        None => Ok(()),
    }
}

fn import_line(import: &Import) -> String {
    format!("from {} import {}", import.module, import.names.join(", "))
}

/// First bracket mismatch outside string literals, if any.
fn unbalanced(body: &str) -> Option<String> {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in body.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    return Some(format!("unbalanced `{c}` in declaration"));
                }
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Some("unterminated string literal in declaration".to_string());
    }
    stack.last().map(|open| format!("unclosed `{open}` in declaration"))
}
