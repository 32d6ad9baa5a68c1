//! Declaration table: the single authority on which names are taken, the
//! emission order of declarations, the imports they need, and the
//! diagnostics accumulated during one conversion run.
use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::response::Diagnostic;

/// One emitted type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub body: String,
}

/// `from <module> import <names>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub names: Vec<String>,
}

#[derive(Debug)]
pub struct DeclarationTable {
    /// `None` marks a reserved name whose body is not written yet.
    entries: IndexMap<String, Option<String>>,
    imports: BTreeMap<String, BTreeSet<String>>,
    runtime_module: String,
    diagnostics: Vec<Diagnostic>,
}

impl DeclarationTable {
    pub fn new(runtime_module: impl Into<String>) -> Self {
        DeclarationTable {
            entries: IndexMap::new(),
            imports: BTreeMap::new(),
            runtime_module: runtime_module.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Claim a name before its body exists. Returns `false` if taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.entries.insert(name.to_string(), None);
        true
    }

    /// Drop a reservation that never received a body.
    pub fn release(&mut self, name: &str) {
        if matches!(self.entries.get(name), Some(None)) {
            self.entries.shift_remove(name);
        }
    }

    /// Write a declaration. Emission order is definition order, so a
    /// reserved entry moves to the end when its body arrives.
    pub fn define(&mut self, name: impl Into<String>, body: String) {
        let name = name.into();
        tracing::debug!(name = %name, "declaration registered");
        self.entries.shift_remove(&name);
        self.entries.insert(name, Some(body));
    }

    pub fn body(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|b| b.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.values().filter(|b| b.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn import(&mut self, module: &str, name: &str) {
        self.imports.entry(module.to_string()).or_default().insert(name.to_string());
    }

    /// Import a constraint helper from the configured runtime module.
    pub fn import_runtime(&mut self, name: &str) {
        let module = self.runtime_module.clone();
        self.import(&module, name);
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(pointer = %diagnostic.pointer, severity = ?diagnostic.severity, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn declarations(&self) -> impl Iterator<Item = Declaration> + '_ {
        self.entries.iter().filter_map(|(name, body)| {
            body.as_ref().map(|body| Declaration { name: name.clone(), body: body.clone() })
        })
    }

    pub fn imports(&self) -> Vec<Import> {
        self.imports
            .iter()
            .map(|(module, names)| Import { module: module.clone(), names: names.iter().cloned().collect() })
            .collect()
    }

    /// Split into (declarations, imports, diagnostics). Reservations that
    /// never received a body are reported rather than silently dropped.
    pub fn into_parts(mut self) -> (Vec<Declaration>, Vec<Import>, Vec<Diagnostic>) {
        let dangling: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, body)| body.is_none())
            .map(|(name, _)| name.clone())
            .collect();
        for name in dangling {
            self.diagnose(Diagnostic::error(name.clone(), format!("`{name}` was reserved but never declared")));
        }
        let declarations = self.declarations().collect();
        let imports = self.imports();
        (declarations, imports, self.diagnostics)
    }
}
