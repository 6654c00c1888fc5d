//! Recursive patch generation for structured data
//!
//! Walks two JSON documents and emits the add/remove/replace operations
//! that turn one into the other. Objects diff key-by-key; any list
//! inequality replaces the whole list; a type mismatch replaces at that
//! path.

use serde::Serialize;
use serde_json::Value;

/// One patch operation, addressed by a JSON-pointer-style path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOp {
    pub op: PatchKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Add,
    Remove,
    Replace,
}

impl PatchOp {
    fn add(path: String, value: Value) -> Self {
        Self {
            op: PatchKind::Add,
            path,
            value: Some(value),
        }
    }

    fn remove(path: String) -> Self {
        Self {
            op: PatchKind::Remove,
            path,
            value: None,
        }
    }

    fn replace(path: String, value: Value) -> Self {
        Self {
            op: PatchKind::Replace,
            path,
            value: Some(value),
        }
    }
}

/// Diff two documents into an ordered patch list. Equal documents yield an
/// empty list.
pub fn diff_values(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut patches = Vec::new();
    walk("", old, new, &mut patches);
    patches
}

fn walk(path: &str, old: &Value, new: &Value, out: &mut Vec<PatchOp>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, new_val) in new_map {
                let child = child_path(path, key);
                match old_map.get(key) {
                    None => out.push(PatchOp::add(child, new_val.clone())),
                    Some(old_val) if old_val != new_val => {
                        if is_container(old_val) && is_container(new_val) {
                            walk(&child, old_val, new_val, out);
                        } else {
                            out.push(PatchOp::replace(child, new_val.clone()));
                        }
                    }
                    Some(_) => {}
                }
            }
            for key in old_map.keys() {
                if !new_map.contains_key(key) {
                    out.push(PatchOp::remove(child_path(path, key)));
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            if old_items != new_items {
                out.push(PatchOp::replace(path.to_string(), new.clone()));
            }
        }
        // Scalar change or type mismatch: replace at this path.
        _ => {
            if old != new {
                out.push(PatchOp::replace(path.to_string(), new.clone()));
            }
        }
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn child_path(path: &str, key: &str) -> String {
    // RFC 6901 token escaping
    let escaped = key.replace('~', "~0").replace('/', "~1");
    format!("{}/{}", path, escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test-side reconstructor: applies a patch list the way a downstream
    /// consumer would.
    fn apply_patches(old: &Value, patches: &[PatchOp]) -> Value {
        let mut doc = old.clone();
        for patch in patches {
            apply_one(&mut doc, patch);
        }
        doc
    }

    fn apply_one(doc: &mut Value, patch: &PatchOp) {
        let segments: Vec<String> = patch
            .path
            .split('/')
            .skip(1)
            .map(|s| s.replace("~1", "/").replace("~0", "~"))
            .collect();

        if segments.is_empty() || patch.path.is_empty() {
            if let Some(value) = &patch.value {
                *doc = value.clone();
            }
            return;
        }

        let mut cursor = doc;
        for segment in &segments[..segments.len() - 1] {
            cursor = cursor.get_mut(segment).expect("patch path must exist");
        }
        let last = &segments[segments.len() - 1];

        match patch.op {
            PatchKind::Add | PatchKind::Replace => {
                let value = patch.value.clone().expect("add/replace carries a value");
                cursor
                    .as_object_mut()
                    .expect("parent must be an object")
                    .insert(last.clone(), value);
            }
            PatchKind::Remove => {
                cursor
                    .as_object_mut()
                    .expect("parent must be an object")
                    .remove(last);
            }
        }
    }

    #[test]
    fn test_equal_documents_yield_no_patches() {
        let doc = json!({"a": 1, "b": [1, 2]});
        assert!(diff_values(&doc, &doc).is_empty());
    }

    #[test]
    fn test_scalar_replace_and_key_add() {
        let old = json!({"a": 1, "b": 2});
        let new = json!({"a": 1, "b": 3, "c": 4});

        let patches = diff_values(&old, &new);
        assert_eq!(patches.len(), 2);
        assert!(patches.contains(&PatchOp::replace("/b".to_string(), json!(3))));
        assert!(patches.contains(&PatchOp::add("/c".to_string(), json!(4))));
    }

    #[test]
    fn test_key_removal() {
        let old = json!({"a": 1, "b": 2});
        let new = json!({"a": 1});

        let patches = diff_values(&old, &new);
        assert_eq!(patches, vec![PatchOp::remove("/b".to_string())]);
    }

    #[test]
    fn test_nested_recursion() {
        let old = json!({"outer": {"x": 1, "y": 2}});
        let new = json!({"outer": {"x": 1, "y": 9}});

        let patches = diff_values(&old, &new);
        assert_eq!(
            patches,
            vec![PatchOp::replace("/outer/y".to_string(), json!(9))]
        );
    }

    #[test]
    fn test_list_change_replaces_whole_list() {
        let old = json!({"items": [1, 2, 3]});
        let new = json!({"items": [1, 2, 4]});

        let patches = diff_values(&old, &new);
        assert_eq!(
            patches,
            vec![PatchOp::replace("/items".to_string(), json!([1, 2, 4]))]
        );
    }

    #[test]
    fn test_type_mismatch_replaces_at_path() {
        let old = json!({"v": {"nested": true}});
        let new = json!({"v": [1, 2]});

        let patches = diff_values(&old, &new);
        assert_eq!(
            patches,
            vec![PatchOp::replace("/v".to_string(), json!([1, 2]))]
        );
    }

    #[test]
    fn test_patch_round_trip() {
        let old = json!({
            "name": "task",
            "state": {"phase": "running", "retries": 0},
            "tags": ["a", "b"],
            "obsolete": true
        });
        let new = json!({
            "name": "task",
            "state": {"phase": "done", "retries": 2},
            "tags": ["a", "b", "c"],
            "result": {"ok": true}
        });

        let patches = diff_values(&old, &new);
        assert_eq!(apply_patches(&old, &patches), new);
    }

    #[test]
    fn test_root_scalar_replace_round_trip() {
        let old = json!("before");
        let new = json!(42);

        let patches = diff_values(&old, &new);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].path, "");
        assert_eq!(apply_patches(&old, &patches), new);
    }

    #[test]
    fn test_escaped_keys_round_trip() {
        let old = json!({"a/b": 1, "c~d": 2});
        let new = json!({"a/b": 9, "c~d": 2});

        let patches = diff_values(&old, &new);
        assert_eq!(patches[0].path, "/a~1b");
        assert_eq!(apply_patches(&old, &patches), new);
    }

    #[test]
    fn test_patch_serialization_shape() {
        let patch = PatchOp::remove("/b".to_string());
        let json = serde_json::to_value(&patch).unwrap();
        // Remove ops carry no value field at all.
        assert_eq!(json, json!({"op": "remove", "path": "/b"}));
    }
}
