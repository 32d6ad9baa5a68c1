//! Per-kind declaration builders.
//!
//! Shared contract: no active constraint keyword → the bare primitive, no
//! declaration; contradictory bounds → `Never`; otherwise a named
//! declaration is registered and its name returned.
mod arr;
mod num;
mod obj;
mod string;

use crate::codegen::annotated;
use crate::ir::Ty;
use crate::resolve::Resolver;
use crate::schema::{Kind, SchemaNode};
use crate::table::DeclarationTable;

impl<'s> Resolver<'s> {
    pub(crate) fn build(&mut self, kind: Kind, node: &SchemaNode, hint: &str) -> Ty {
        match kind {
            Kind::Integer | Kind::Number => self.build_number(kind, node, hint),
            Kind::String => self.build_string(node, hint),
            Kind::Array => self.build_array(node, hint),
            Kind::Object => self.build_object(node, hint),
            Kind::Boolean | Kind::Null => Ty::bare(kind),
        }
    }

    /// Register `type name = Annotated[base, ...]` and return the name.
    fn declare_annotated(&mut self, name: String, base: &str, annotations: &[String]) -> Ty {
        let body = format!("type {name} = {}", annotated(base, annotations, &mut self.table));
        self.table.define(name.clone(), body);
        Ty::Named(name)
    }

    fn contradiction(&mut self, what: &str) -> Ty {
        tracing::debug!(pointer = %self.pointer(), "{what}; resolving to Never");
        Ty::Never
    }
}

/// `Len(min, max)` for string lengths and array sizes.
fn len_annotation(min: Option<u64>, max: Option<u64>, table: &mut DeclarationTable) -> Option<String> {
    let text = match (min, max) {
        (None, None) => return None,
        (Some(min), Some(max)) => format!("Len({min}, {max})"),
        (Some(min), None) => format!("Len({min})"),
        (None, Some(max)) => format!("Len(0, {max})"),
    };
    table.import("annotated_types", "Len");
    Some(text)
}
