use serde_json::{Map, Value};

use crate::store::RangeQuery;

impl RangeQuery {
    pub fn new(collection: impl Into<String>, limit: usize) -> Self {
        Self {
            collection: collection.into(),
            start_after: None,
            limit,
        }
    }

    pub fn start_after(mut self, key: Option<String>) -> Self {
        self.start_after = key;
        self
    }

    /// Whether `key` falls after the starting position of this query.
    pub fn admits(&self, key: &str) -> bool {
        self.start_after
            .as_deref()
            .map(|start| key > start)
            .unwrap_or(true)
    }
}

/// Assemble entries keyed by paths relative to some parent into the
/// nested object that parent would hold.  Returns `None` when there are
/// no entries at all.
pub fn nest<I>(entries: I) -> Option<Value>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut root = Map::new();
    let mut found = false;
    for (relative, value) in entries {
        let segments = relative.split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        let Some((last, parents)) = segments.split_last() else {
            continue;
        };
        found = true;
        let mut node = &mut root;
        for segment in parents {
            let child = node.entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = match child {
                Value::Object(map) => map,
                _ => unreachable!(),
            };
        }
        node.insert(last.to_string(), value);
    }
    found.then_some(Value::Object(root))
}

/// Every proper ancestor of `path`, nearest first.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> + '_ {
    let path = path.trim_matches('/');
    path.rmatch_indices('/').map(move |(i, _)| &path[..i])
}

/// The entries replacing the leaf `ancestor` holding `value`, so that
/// `path` below it may be written or removed on its own.
///
/// Every object between the two is split into its children.  Whatever
/// lies on the way to `path` but is not an object, along with the
/// value at `path` itself, is dropped.
pub fn split_leaf(ancestor: &str, value: Value, path: &str) -> Vec<(String, Value)> {
    let ancestor = ancestor.trim_matches('/');
    let Some(rest) = path.trim_matches('/')
        .strip_prefix(ancestor)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Vec::new();
    };

    let mut result = Vec::new();
    let mut current = (ancestor.to_string(), value);
    for segment in rest.split('/') {
        let (base, Value::Object(map)) = current else {
            break;
        };
        let mut next = None;
        for (key, child) in map {
            let child_path = format!("{base}/{key}");
            if key == segment {
                next = Some((child_path, child));
            } else if !child.is_null() {
                result.push((child_path, child));
            }
        }
        match next {
            Some(next) => current = next,
            None => break,
        }
    }
    result
}
