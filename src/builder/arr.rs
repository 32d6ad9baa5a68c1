use crate::codegen::render;
use crate::ir::Ty;
use crate::resolve::Resolver;
use crate::schema::{Kind, SchemaNode};

use super::len_annotation;

fn is_active(node: &SchemaNode) -> bool {
    node.items.is_some()
        || node.prefix_items.is_some()
        || node.min_items.is_some()
        || node.max_items.is_some()
        || node.unique_items.is_some()
        || node.contains.is_some()
        || node.min_contains.is_some()
        || node.max_contains.is_some()
        || node.unevaluated_items.is_some()
}

fn inverted(min: Option<u64>, max: Option<u64>) -> bool {
    matches!((min, max), (Some(min), Some(max)) if min > max)
}

impl<'s> Resolver<'s> {
    /// Prefix items become a tuple head; `items` (or `unevaluatedItems`)
    /// types the homogeneous rest.
    pub(super) fn build_array(&mut self, node: &SchemaNode, hint: &str) -> Ty {
        if !is_active(node) {
            return Ty::bare(Kind::Array);
        }
        if inverted(node.min_items, node.max_items) {
            return self.contradiction("minItems exceeds maxItems");
        }
        if node.contains.is_some() && inverted(node.min_contains, node.max_contains) {
            return self.contradiction("minContains exceeds maxContains");
        }
        let name = self.record_name(hint);

        let mut head = Vec::new();
        for (i, item) in node.prefix_items.iter().flatten().enumerate() {
            let index = i.to_string();
            let item_hint = format!("{name}Item{}", i + 1);
            head.push(self.at(&["prefixItems", index.as_str()], |r| r.resolve(item, &item_hint)));
        }
        let rest_hint = format!("{name}Item");
        let rest = match (&node.items, &node.unevaluated_items) {
            (Some(items), _) => self.at(&["items"], |r| r.resolve(items, &rest_hint)),
            (None, Some(items)) => self.at(&["unevaluatedItems"], |r| r.resolve(items, &rest_hint)),
            (None, None) => Ty::Any,
        };

        let rest_text = render(&rest, &mut self.table);
        let container = if head.is_empty() {
            format!("list[{rest_text}]")
        } else {
            let mut parts: Vec<String> = head.iter().map(|ty| render(ty, &mut self.table)).collect();
            if rest != Ty::Never {
                parts.push(format!("*tuple[{rest_text}, ...]"));
            }
            format!("tuple[{}]", parts.join(", "))
        };

        let mut annotations = Vec::new();
        annotations.extend(len_annotation(node.min_items, node.max_items, &mut self.table));
        if node.unique_items == Some(true) {
            self.table.import_runtime("UniqueItems");
            annotations.push("UniqueItems()".to_string());
        }
        if let Some(contains) = &node.contains {
            let contains_hint = format!("{name}Contains");
            let ty = self.at(&["contains"], |r| r.resolve(contains, &contains_hint));
            let mut args = vec![render(&ty, &mut self.table)];
            args.extend(node.min_contains.map(|n| format!("min={n}")));
            args.extend(node.max_contains.map(|n| format!("max={n}")));
            self.table.import_runtime("Contains");
            annotations.push(format!("Contains({})", args.join(", ")));
        }
        self.declare_annotated(name, &container, &annotations)
    }
}
