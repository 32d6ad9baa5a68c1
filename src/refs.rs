//! Same-document `$ref` lookup: `#`, JSON pointers, `$id` and `$anchor`.
use std::collections::HashMap;

use crate::naming::to_pascal_case;
use crate::schema::{Schema, escape_token, unescape_token};

/// Where a reference points.
#[derive(Debug, Clone)]
pub struct Target<'s> {
    /// Canonical identity used for memoization: the target's `$id` if it
    /// has one, its pointer otherwise.
    pub key: String,
    pub schema: &'s Schema,
    /// Naming hint derived from the reference itself.
    pub hint: String,
}

#[derive(Debug)]
pub struct RefIndex<'s> {
    root: &'s Schema,
    ids: HashMap<String, &'s Schema>,
    anchors: HashMap<String, &'s Schema>,
}

impl<'s> RefIndex<'s> {
    pub fn new(root: &'s Schema) -> Self {
        let mut index = RefIndex { root, ids: HashMap::new(), anchors: HashMap::new() };
        index.collect(root);
        index
    }

    fn collect(&mut self, schema: &'s Schema) {
        let Some(node) = schema.node() else { return };
        if let Some(id) = &node.id {
            self.ids.entry(id.clone()).or_insert(schema);
        }
        if let Some(anchor) = &node.anchor {
            self.anchors.entry(anchor.clone()).or_insert(schema);
        }
        let singles = [
            &node.items,
            &node.contains,
            &node.additional_properties,
            &node.property_names,
            &node.unevaluated_items,
            &node.unevaluated_properties,
            &node.not,
            &node.if_,
            &node.then,
            &node.else_,
        ];
        for child in singles.into_iter().flatten() {
            self.collect(child);
        }
        let lists = [&node.prefix_items, &node.all_of, &node.any_of, &node.one_of];
        for child in lists.into_iter().flatten().flatten() {
            self.collect(child);
        }
        let maps = [&node.properties, &node.pattern_properties, &node.dependent_schemas];
        for child in maps.into_iter().flatten().flat_map(|m| m.values()) {
            self.collect(child);
        }
        for child in node.defs.values() {
            self.collect(child);
        }
    }

    pub fn root(&self) -> &'s Schema {
        self.root
    }

    pub fn lookup(&self, reference: &str) -> Option<Target<'s>> {
        if let Some(schema) = self.ids.get(reference).copied() {
            return Some(Target { key: reference.to_string(), schema, hint: id_hint(reference) });
        }
        let fragment = reference.strip_prefix('#')?;
        if fragment.is_empty() {
            let key = self.root.node().and_then(|n| n.id.clone()).unwrap_or_else(|| "#".to_string());
            return Some(Target { key, schema: self.root, hint: String::new() });
        }
        if !fragment.starts_with('/') {
            let schema = self.anchors.get(fragment).copied()?;
            let key = schema.node().and_then(|n| n.id.clone()).unwrap_or_else(|| reference.to_string());
            return Some(Target { key, schema, hint: fragment.to_string() });
        }
        let schema = self.root.pointer(fragment)?;
        let key = match schema.node().and_then(|n| n.id.clone()) {
            Some(id) => id,
            None => canonical_pointer(fragment),
        };
        let hint = fragment.rsplit('/').next().map(unescape_token).unwrap_or_default();
        Some(Target { key, schema, hint })
    }
}

/// `definitions` and `$defs` are the same container.
pub fn canonical_pointer(fragment: &str) -> String {
    let tokens: Vec<String> = fragment
        .trim_start_matches('/')
        .split('/')
        .map(|t| if t == "definitions" { "$defs".to_string() } else { t.to_string() })
        .collect();
    format!("#/{}", tokens.join("/"))
}

pub fn definition_key(name: &str) -> String {
    format!("#/$defs/{}", escape_token(name))
}

/// `https://example.com/schemas/user-profile.json` → `UserProfile`.
fn id_hint(id: &str) -> String {
    let last = id.trim_end_matches(['/', '#']).rsplit(['/', ':']).next().unwrap_or(id);
    let stem = last.split('.').next().unwrap_or(last);
    to_pascal_case(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        serde_json::from_value(json!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "Address": {"type": "object"},
                "Tag": {"$id": "https://example.com/tag.json", "type": "string"},
                "Pinned": {"$anchor": "pin", "type": "integer"}
            },
            "properties": {"a": {"$ref": "#/definitions/Address"}}
        }))
        .unwrap()
    }

    #[test]
    fn pointer_refs_share_a_canonical_key() {
        let root = schema();
        let index = RefIndex::new(&root);
        let a = index.lookup("#/$defs/Address").unwrap();
        let b = index.lookup("#/definitions/Address").unwrap();
        assert_eq!(a.key, b.key);
        assert_eq!(a.key, definition_key("Address"));
        assert_eq!(a.hint, "Address");
    }

    #[test]
    fn ids_and_anchors_resolve() {
        let root = schema();
        let index = RefIndex::new(&root);
        let by_id = index.lookup("https://example.com/tag.json").unwrap();
        assert_eq!(by_id.hint, "Tag");
        let by_pointer = index.lookup("#/$defs/Tag").unwrap();
        assert_eq!(by_id.key, by_pointer.key);
        let anchored = index.lookup("#pin").unwrap();
        assert_eq!(anchored.hint, "pin");
        let whole = index.lookup("#").unwrap();
        assert_eq!(whole.key, "https://example.com/root.json");
    }

    #[test]
    fn unknown_references() {
        let root = schema();
        let index = RefIndex::new(&root);
        assert!(index.lookup("#/$defs/Nope").is_none());
        assert!(index.lookup("other.json#/x").is_none());
        assert!(index.lookup("#nope").is_none());
    }
}
