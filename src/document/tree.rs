//! Recursive walks over the document value tree.
//!
//! Paths are JSON arrays of object keys and array indices, e.g.
//! `["servers",0,"password"]`. The serialized path is the associated data
//! of the leaf at that position and a field of its MAC record.

use serde_json::{Map, Value};

use super::config::is_unencrypted_key;
use crate::error::{Error, Result};

/// One node as seen by [`visit`], in document order
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node<'a> {
    /// An object with this many entries
    Object(usize),
    /// An array with this many elements
    Array(usize),
    /// An encrypted scalar (its `ENC[...]` marker)
    Encrypted(&'a str),
    /// A scalar left in plaintext by the unencrypted suffix
    Plain(&'a Value),
}

/// Serialize a path for use as associated data
pub(crate) fn path_bytes(path: &[Value]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(path)?)
}

/// Visit every node of `tree` depth first, the root included
///
/// Scalars outside an unencrypted subtree must be strings; anything else
/// cannot be an encrypted leaf and is reported as `MalformedDocument`.
pub(crate) fn visit<'a, F>(tree: &'a Map<String, Value>, suffix: Option<&str>, f: &mut F) -> Result<()>
where
    F: FnMut(&[Value], Node<'a>) -> Result<()>,
{
    let mut path: Vec<Value> = Vec::new();
    f(&path, Node::Object(tree.len()))?;
    visit_entries(tree, suffix, false, &mut path, f)
}

fn visit_entries<'a, F>(
    map: &'a Map<String, Value>,
    suffix: Option<&str>,
    plain: bool,
    path: &mut Vec<Value>,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&[Value], Node<'a>) -> Result<()>,
{
    for (key, child) in map {
        path.push(Value::String(key.clone()));
        let child_plain = plain || is_unencrypted_key(suffix, key);
        visit_value(child, suffix, child_plain, path, f)?;
        path.pop();
    }
    Ok(())
}

fn visit_value<'a, F>(
    value: &'a Value,
    suffix: Option<&str>,
    plain: bool,
    path: &mut Vec<Value>,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&[Value], Node<'a>) -> Result<()>,
{
    match value {
        Value::Object(map) => {
            f(path, Node::Object(map.len()))?;
            visit_entries(map, suffix, plain, path, f)
        }
        Value::Array(items) => {
            f(path, Node::Array(items.len()))?;
            for (index, item) in items.iter().enumerate() {
                path.push(Value::from(index));
                visit_value(item, suffix, plain, path, f)?;
                path.pop();
            }
            Ok(())
        }
        scalar if plain => f(path, Node::Plain(scalar)),
        Value::String(marker) => f(path, Node::Encrypted(marker)),
        _ => Err(Error::MalformedDocument(format!(
            "unencrypted value at {}",
            Value::Array(path.clone())
        ))),
    }
}

/// Rebuild `tree` with every scalar outside an unencrypted subtree replaced
/// by `f(path, scalar)`
pub(crate) fn map_leaves<F>(tree: &Map<String, Value>, suffix: Option<&str>, f: &mut F) -> Result<Map<String, Value>>
where
    F: FnMut(&[Value], &Value) -> Result<Value>,
{
    let mut path = Vec::new();
    map_entries(tree, suffix, false, &mut path, f)
}

fn map_entries<F>(
    map: &Map<String, Value>,
    suffix: Option<&str>,
    plain: bool,
    path: &mut Vec<Value>,
    f: &mut F,
) -> Result<Map<String, Value>>
where
    F: FnMut(&[Value], &Value) -> Result<Value>,
{
    let mut out = Map::with_capacity(map.len());
    for (key, child) in map {
        path.push(Value::String(key.clone()));
        let child_plain = plain || is_unencrypted_key(suffix, key);
        let mapped = map_value(child, suffix, child_plain, path, f)?;
        path.pop();
        out.insert(key.clone(), mapped);
    }
    Ok(out)
}

fn map_value<F>(
    value: &Value,
    suffix: Option<&str>,
    plain: bool,
    path: &mut Vec<Value>,
    f: &mut F,
) -> Result<Value>
where
    F: FnMut(&[Value], &Value) -> Result<Value>,
{
    match value {
        Value::Object(map) => Ok(Value::Object(map_entries(map, suffix, plain, path, f)?)),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(Value::from(index));
                out.push(map_value(item, suffix, plain, path, f)?);
                path.pop();
            }
            Ok(Value::Array(out))
        }
        scalar if plain => Ok(scalar.clone()),
        scalar => f(path, scalar),
    }
}

/// Leaf counts of a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LeafCounts {
    pub encrypted: usize,
    pub plaintext: usize,
}

pub(crate) fn count_leaves(tree: &Map<String, Value>, suffix: Option<&str>) -> Result<LeafCounts> {
    let mut counts = LeafCounts::default();
    visit(tree, suffix, &mut |_, node| {
        match node {
            Node::Encrypted(_) => counts.encrypted += 1,
            Node::Plain(_) => counts.plaintext += 1,
            Node::Object(_) | Node::Array(_) => {}
        }
        Ok(())
    })?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_visit_order_and_paths() {
        let doc = tree(json!({"a": "x", "b": {"c": ["y", "z"]}}));
        let mut seen = Vec::new();

        visit(&doc, None, &mut |path, node| {
            seen.push((Value::Array(path.to_vec()).to_string(), format!("{:?}", node)));
            Ok(())
        })
        .unwrap();

        let paths: Vec<&str> = seen.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "[]",
                "[\"a\"]",
                "[\"b\"]",
                "[\"b\",\"c\"]",
                "[\"b\",\"c\",0]",
                "[\"b\",\"c\",1]",
            ]
        );
        assert_eq!(seen[0].1, "Object(2)");
        assert_eq!(seen[3].1, "Array(2)");
    }

    #[test]
    fn test_visit_rejects_bare_scalars() {
        let doc = tree(json!({"port": 8080}));
        let result = visit(&doc, None, &mut |_, _| Ok(()));
        assert!(matches!(result, Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_suffix_marks_whole_subtree_plain() {
        let doc = tree(json!({"cfg_unencrypted": {"port": 8080, "tags": [true]}, "secret": "ENC[...]"}));
        let counts = count_leaves(&doc, Some("_unencrypted")).unwrap();

        assert_eq!(counts, LeafCounts { encrypted: 1, plaintext: 2 });
    }

    #[test]
    fn test_map_leaves_preserves_shape() {
        let doc = tree(json!({"a": 1, "b": [null, {"c": false}], "keep_plain": 5}));

        let mapped = map_leaves(&doc, Some("_plain"), &mut |path, _| {
            Ok(Value::String(Value::Array(path.to_vec()).to_string()))
        })
        .unwrap();

        assert_eq!(
            Value::Object(mapped),
            json!({
                "a": "[\"a\"]",
                "b": ["[\"b\",0]", {"c": "[\"b\",1,\"c\"]"}],
                "keep_plain": 5
            })
        );
    }

    #[test]
    fn test_paths_do_not_collide() {
        let a = path_bytes(&[json!("a.b")]).unwrap();
        let b = path_bytes(&[json!("a"), json!("b")]).unwrap();
        let c = path_bytes(&[json!("0")]).unwrap();
        let d = path_bytes(&[json!(0)]).unwrap();

        assert_ne!(a, b);
        assert_ne!(c, d);
    }
}
