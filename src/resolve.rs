//! Schema → [`Ty`] resolution.
//!
//! Each node is narrowed to its admissible kinds (or to a literal set when
//! `enum`/`const` apply), then handed to the per-kind builders, which emit
//! declarations into the table as a side effect. All state lives on the
//! [`Resolver`], one per conversion run.
use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::codegen::render;
use crate::compose::Merger;
use crate::ir::{Literal, Ty};
use crate::naming::{declaration_name, sanitize, to_pascal_case};
use crate::refs::{RefIndex, definition_key};
use crate::response::Diagnostic;
use crate::schema::{Kind, KindSet, Schema, SchemaNode, escape_token};
use crate::settings::Settings;
use crate::table::DeclarationTable;

// ————————————————————————————————————————————————————————————————————————————
// NARROWING
// ————————————————————————————————————————————————————————————————————————————

/// What survives `type`, `enum` and `const`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narrowed {
    /// No literal restriction: any value of these kinds.
    Kinds(KindSet),
    /// Exactly these values (possibly none).
    Literals(BTreeSet<Literal>),
}

pub fn narrow(node: &SchemaNode) -> Narrowed {
    let kinds = node.kinds.clone().unwrap_or_else(KindSet::all);
    if node.enum_.is_none() && node.const_.is_none() {
        return Narrowed::Kinds(kinds);
    }
    let admissible = |v: &Value| kinds.admits(Kind::of_value(v));
    let mut set: BTreeSet<Literal> = match &node.enum_ {
        Some(values) => values.iter().filter(|v| admissible(v)).map(Literal::from_value).collect(),
        None => BTreeSet::new(),
    };
    if let Some(value) = &node.const_ {
        let literal = Literal::from_value(value);
        let keep = admissible(value) && (node.enum_.is_none() || set.contains(&literal));
        set = if keep { BTreeSet::from([literal]) } else { BTreeSet::new() };
    }
    Narrowed::Literals(set)
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLVER
// ————————————————————————————————————————————————————————————————————————————

/// A keyed node (`$id`, `$defs` entry, `$ref` target, root) whose
/// resolution is in progress. References that loop back to it get a name
/// instead of recursing.
#[derive(Debug)]
struct Pending {
    key: String,
    hint: String,
    /// Depth at which this node's own builders run.
    depth: usize,
    /// Name reserved up front; bound by alias unless the node claims it.
    reserved: Option<String>,
    /// Name taken by the node's own record declaration.
    claimed: Option<String>,
    single_kind: bool,
    referenced: bool,
    bind: bool,
}

pub struct Resolver<'s> {
    pub(crate) settings: &'s Settings,
    pub(crate) refs: RefIndex<'s>,
    pub(crate) table: DeclarationTable,
    /// `$id` (or canonical pointer) → resolved type, for this run only.
    ids: HashMap<String, Ty>,
    pending: Vec<Pending>,
    path: Vec<String>,
    depth: usize,
}

impl<'s> Resolver<'s> {
    pub fn new(root: &'s Schema, settings: &'s Settings) -> Self {
        Resolver {
            settings,
            refs: RefIndex::new(root),
            table: DeclarationTable::new(settings.runtime_module.clone()),
            ids: HashMap::new(),
            pending: Vec::new(),
            path: Vec::new(),
            depth: 0,
        }
    }

    pub fn into_table(self) -> DeclarationTable {
        self.table
    }

    /// Resolve `$defs` and then the root. The root type is always bound to
    /// the configured root name.
    pub fn resolve_document(&mut self) -> Ty {
        let root = self.refs.root();
        let root_name = sanitize(&self.settings.root_name);
        self.table.reserve(&root_name);
        if let Schema::Node(node) = root {
            for (key, def) in &node.defs {
                let def_key = def.node().and_then(|n| n.id.clone()).unwrap_or_else(|| definition_key(key));
                self.at(&["$defs", key.as_str()], |r| r.resolve_keyed(def_key, def, key, None, false));
            }
        }
        let root_key = root.node().and_then(|n| n.id.clone()).unwrap_or_else(|| "#".to_string());
        self.resolve_keyed(root_key, root, &root_name.clone(), Some(root_name), true)
    }

    pub fn resolve(&mut self, schema: &Schema, hint: &str) -> Ty {
        match schema {
            Schema::Bool(true) => Ty::Any,
            Schema::Bool(false) => Ty::Never,
            Schema::Node(node) => match &node.id {
                Some(id) => self.resolve_keyed(id.clone(), schema, hint, None, false),
                None => self.resolve_node(node, hint),
            },
        }
    }

    fn resolve_keyed(
        &mut self,
        key: String,
        schema: &Schema,
        hint: &str,
        reserved: Option<String>,
        bind: bool,
    ) -> Ty {
        if let Some(ty) = self.ids.get(&key).cloned() {
            return self.settle(reserved, bind, ty);
        }
        if let Some(idx) = self.pending.iter().position(|p| p.key == key) {
            let frame = &mut self.pending[idx];
            frame.referenced = true;
            if let Some(name) = frame.claimed.clone().or_else(|| frame.reserved.clone()) {
                return Ty::Named(name);
            }
            let name = declaration_name(&frame.hint, &self.table);
            self.table.reserve(&name);
            frame.reserved = Some(name.clone());
            tracing::debug!(key = %frame.key, name = %name, "cyclic reference broken by name");
            return Ty::Named(name);
        }

        self.pending.push(Pending {
            key,
            hint: hint.to_string(),
            depth: self.depth + 1,
            reserved,
            claimed: None,
            single_kind: false,
            referenced: false,
            bind,
        });
        let ty = match schema {
            Schema::Node(node) => self.resolve_node(node, hint),
            other => self.resolve(other, hint),
        };
        let Some(frame) = self.pending.pop() else { return ty };
        let ty = self.settle(frame.reserved, frame.bind || frame.referenced, ty);
        self.ids.insert(frame.key, ty.clone());
        ty
    }

    /// Bind a reserved name to `ty` (or give the reservation back).
    fn settle(&mut self, reserved: Option<String>, bind: bool, ty: Ty) -> Ty {
        match reserved {
            Some(name) if ty == Ty::Named(name.clone()) => ty,
            Some(name) if bind => {
                let body = format!("type {name} = {}", render(&ty, &mut self.table));
                self.table.define(name.clone(), body);
                Ty::Named(name)
            }
            Some(name) => {
                self.table.release(&name);
                ty
            }
            None => ty,
        }
    }

    fn resolve_node(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        if self.depth >= self.settings.max_depth {
            self.error(format!("schema nesting exceeds {} levels; using Any", self.settings.max_depth));
            return Ty::Any;
        }
        self.depth += 1;
        let ty = self.resolve_node_at_depth(node, hint);
        self.depth -= 1;
        ty
    }

    pub(crate) fn resolve_node_at_depth(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        let hint: &str = match &node.title {
            Some(title) if self.settings.use_titles && !to_pascal_case(title).is_empty() => title,
            _ => hint,
        };
        if let Some(reference) = &node.reference {
            let siblings = SchemaNode { reference: None, ..node.clone() };
            if !siblings.has_assertions() {
                return self.resolve_reference(reference, hint);
            }
        }
        if node.is_composed() || node.reference.is_some() {
            return self.resolve_composed(node, hint);
        }
        self.resolve_kinds(node, hint)
    }

    fn resolve_reference(&mut self, reference: &str, hint: &str) -> Ty {
        match self.refs.lookup(reference) {
            Some(target) => {
                let hint = if target.hint.is_empty() { hint.to_string() } else { target.hint };
                self.resolve_keyed(target.key, target.schema, &hint, None, false)
            }
            None => {
                self.warn(format!("unresolvable reference `{reference}`; using Any"));
                Ty::Any
            }
        }
    }

    /// `allOf` (and `$ref` with sibling assertions) intersect into one node;
    /// `anyOf`/`oneOf` become a union of the shared keywords merged with
    /// each branch.
    fn resolve_composed(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        let mut merger = Merger::new(&self.refs);
        let mut base = merger.inline(node);
        let mut warnings = std::mem::take(&mut merger.warnings);

        if base.not.take().is_some() {
            warnings.push("`not` is not translated; ignored".to_string());
        }
        let conditional = [base.if_.take(), base.then.take(), base.else_.take()];
        if conditional.iter().any(Option::is_some) {
            warnings.push("`if`/`then`/`else` are not translated; ignored".to_string());
        }
        let (keyword, alternatives) = match (base.one_of.take(), base.any_of.take()) {
            (Some(one), Some(_)) => {
                warnings.push("`anyOf` alongside `oneOf` is not translated; using `oneOf`".to_string());
                ("oneOf", Some(one))
            }
            (Some(one), None) => ("oneOf", Some(one)),
            (None, any) => ("anyOf", any),
        };
        for warning in warnings {
            self.warn(warning);
        }

        let Some(branches) = alternatives else {
            tracing::trace!(hint, "allOf merged into a single node");
            return self.resolve_node_at_depth(&base, hint);
        };
        let shared = base.has_assertions();
        let mut members = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            let variant = format!("{hint}Variant{}", i + 1);
            let index = i.to_string();
            let ty = self.at(&[keyword, index.as_str()], |r| {
                if !shared {
                    return r.resolve(branch, &variant);
                }
                let mut merger = Merger::new(&r.refs);
                let mut merged = base.clone();
                merger.absorb(&mut merged, branch);
                for warning in std::mem::take(&mut merger.warnings) {
                    r.warn(warning);
                }
                r.resolve_node(&merged, &variant)
            });
            members.push(ty);
        }
        Ty::union(members)
    }

    fn resolve_kinds(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        let kinds: Vec<Kind> = match narrow(node) {
            Narrowed::Literals(set) => return Ty::literals(set),
            Narrowed::Kinds(kinds) => kinds.0.into_iter().collect(),
        };
        match kinds.as_slice() {
            [] => Ty::Never,
            [kind] => {
                let depth = self.depth;
                if let Some(frame) = self.pending.last_mut().filter(|f| f.depth == depth) {
                    frame.single_kind = true;
                }
                self.build(*kind, node, hint)
            }
            _ => {
                let members: Vec<Ty> = kinds
                    .iter()
                    .map(|kind| self.build(*kind, node, &format!("{hint}{}", to_pascal_case(kind.name()))))
                    .collect();
                let universal = kinds.len() == Kind::ALL.len()
                    && kinds.iter().zip(&members).all(|(kind, ty)| *ty == Ty::bare(*kind));
                if universal { Ty::Any } else { Ty::union(members) }
            }
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // NAMING
    // ————————————————————————————————————————————————————————————————————————

    /// Reserve a fresh declaration name for `hint`.
    pub(crate) fn fresh_name(&mut self, hint: &str) -> String {
        let name = declaration_name(hint, &self.table);
        self.table.reserve(&name);
        name
    }

    /// Name for a record declaration. A record that is the whole of a keyed
    /// node takes the node's reserved name, so references and the root
    /// alias point straight at it.
    pub(crate) fn record_name(&mut self, hint: &str) -> String {
        let depth = self.depth;
        if let Some(frame) = self.pending.last_mut() {
            if frame.depth == depth && frame.single_kind && frame.claimed.is_none() {
                let name = match frame.reserved.take() {
                    Some(name) => name,
                    None => {
                        let name = declaration_name(hint, &self.table);
                        self.table.reserve(&name);
                        name
                    }
                };
                frame.claimed = Some(name.clone());
                return name;
            }
        }
        self.fresh_name(hint)
    }

    // ————————————————————————————————————————————————————————————————————————
    // DIAGNOSTICS
    // ————————————————————————————————————————————————————————————————————————

    /// Run `f` with `segments` appended to the current schema location.
    pub(crate) fn at<T>(&mut self, segments: &[&str], f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.extend(segments.iter().map(|s| escape_token(s)));
        let out = f(self);
        self.path.truncate(self.path.len() - segments.len());
        out
    }

    pub(crate) fn pointer(&self) -> String {
        if self.path.is_empty() { "#".to_string() } else { format!("#/{}", self.path.join("/")) }
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let pointer = self.pointer();
        self.table.diagnose(Diagnostic::warning(pointer, message));
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let pointer = self.pointer();
        self.table.diagnose(Diagnostic::error(pointer, message));
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
