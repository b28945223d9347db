//! Value & Path algebra (§4.1): the hierarchical state-value representation
//! and the conversions between it and flat path sets.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A state value: either a leaf naming an atomic/final substate, or a
/// mapping from region key to the value active in that region (used for
/// compound and parallel nodes). Regions are keyed by the compound/
/// parallel node's own key so two structurally distinct values can be
/// compared for equality without a definition in hand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// A leaf naming an atomic or final substate.
    Leaf(String),
    /// A compound or parallel node's active children, keyed by region.
    Nested(BTreeMap<String, Value>),
}

impl Value {
    pub fn leaf(name: impl Into<String>) -> Self {
        Value::Leaf(name.into())
    }

    pub fn nested(children: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Nested(children.into_iter().collect())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Value::Leaf(_))
    }

    /// Parses a dotted string (`"light.red.walk"`) into a right-leaning
    /// chain of single-child `Nested` maps, terminating in a `Leaf`. This
    /// is the inverse of `Display` for values with no orthogonal regions,
    /// satisfying the round-trip law `to_value(str_of(v)) == v`.
    pub fn from_dotted(path: &str, delimiter: char) -> Self {
        let mut parts: Vec<&str> = path.split(delimiter).collect();
        let leaf = parts.pop().expect("split always yields at least one part");
        let mut value = Value::Leaf(leaf.to_string());
        for key in parts.into_iter().rev() {
            let mut map = BTreeMap::new();
            map.insert(key.to_string(), value);
            value = Value::Nested(map);
        }
        value
    }

    /// Accepts a dotted string, a single-key nested mapping, or another
    /// value unchanged. Mirrors `to_value` in §4.1 (path arrays and
    /// configuration values funnel through the caller before reaching
    /// here, since only `Value` itself is generic-free).
    pub fn to_value(input: impl Into<Value>, delimiter: char) -> Value {
        let _ = delimiter;
        input.into()
    }

    /// Enumerates every leaf path this value denotes, one per orthogonal
    /// region, each as a `Vec<String>` of dotted segments (root to leaf,
    /// not including the synthetic region keys of `Parallel` ancestors
    /// beyond their own key).
    pub fn to_paths(&self) -> Vec<Vec<String>> {
        match self {
            Value::Leaf(name) => vec![vec![name.clone()]],
            Value::Nested(children) => {
                let mut out = Vec::new();
                for (key, child) in children {
                    for mut path in child.to_paths() {
                        path.insert(0, key.clone());
                        out.push(path);
                    }
                }
                out
            }
        }
    }

    /// Inverse of `to_paths`: folds a set of leaf paths back into a
    /// `Value`. Paths sharing a prefix are merged into the same `Nested`
    /// map at that prefix, so `paths_to_value(to_paths(v)) == v` for any
    /// well-formed `v` (every region present, no two leaves under the
    /// same key).
    pub fn paths_to_value(paths: &[Vec<String>]) -> Value {
        if paths.len() == 1 && paths[0].len() == 1 {
            return Value::Leaf(paths[0][0].clone());
        }
        let mut grouped: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();
        for path in paths {
            if path.is_empty() {
                continue;
            }
            let (head, rest) = path.split_first().unwrap();
            grouped.entry(head.clone()).or_default().push(rest.to_vec());
        }
        let mut children = BTreeMap::new();
        for (key, rest_paths) in grouped {
            children.insert(key, Value::paths_to_value(&rest_paths));
        }
        Value::Nested(children)
    }

    /// True iff `pattern` is a prefix of `value` in every region:
    /// `matches("red", {red:"walk"}) == true`,
    /// `matches({red:"walk"}, "red") == false`.
    pub fn matches(pattern: &Value, value: &Value) -> bool {
        match (pattern, value) {
            (Value::Leaf(p), Value::Leaf(v)) => p == v,
            (Value::Leaf(p), Value::Nested(children)) => {
                // A bare leaf pattern matches a compound value when it names
                // the region key directly (e.g. pattern "red" vs value
                // {red:"walk"}), or when every region independently matches.
                if children.contains_key(p) {
                    return true;
                }
                children.values().all(|child| Value::matches(pattern, child))
                    && !children.is_empty()
            }
            (Value::Nested(pat_children), Value::Nested(val_children)) => {
                pat_children.iter().all(|(key, pat_child)| {
                    val_children
                        .get(key)
                        .map(|val_child| Value::matches(pat_child, val_child))
                        .unwrap_or(false)
                })
            }
            (Value::Nested(_), Value::Leaf(_)) => false,
        }
    }

    /// Parses a dot-delimited pattern string against this value using
    /// `matches` semantics; `"*"` at any position matches anything.
    pub fn matches_pattern(&self, pattern: &str, delimiter: char) -> bool {
        if pattern == "*" {
            return true;
        }
        let pattern_value = Value::from_dotted(pattern, delimiter);
        Self::matches_wildcard(&pattern_value, self)
    }

    fn matches_wildcard(pattern: &Value, value: &Value) -> bool {
        match (pattern, value) {
            (Value::Leaf(p), _) if p == "*" => true,
            (Value::Leaf(p), Value::Leaf(v)) => p == v,
            (Value::Leaf(p), Value::Nested(children)) => children
                .get(p)
                .is_some(),
            (Value::Nested(pat_children), Value::Nested(val_children)) => {
                pat_children.iter().all(|(key, pat_child)| {
                    val_children
                        .get(key)
                        .map(|val_child| Value::matches_wildcard(pat_child, val_child))
                        .unwrap_or(false)
                })
            }
            (Value::Nested(_), Value::Leaf(_)) => false,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from_dotted(&s, '.')
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_dotted(s, '.')
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Leaf(name) => write!(f, "{name}"),
            Value::Nested(children) => {
                let mut first = true;
                write!(f, "{{")?;
                for (key, child) in children {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{key}: {child}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_round_trip() {
        let v = Value::from_dotted("light.red.walk", '.');
        assert_eq!(v, Value::nested([(
            "light".into(),
            Value::nested([("red".into(), Value::leaf("walk"))]),
        )]));
    }

    #[test]
    fn paths_round_trip_for_parallel_value() {
        let v = Value::nested([
            ("bold".into(), Value::leaf("on")),
            ("italics".into(), Value::leaf("off")),
        ]);
        let paths = v.to_paths();
        let restored = Value::paths_to_value(&paths);
        assert_eq!(v, restored);
    }

    #[test]
    fn leaf_pattern_is_prefix_of_value() {
        let value = Value::nested([("red".into(), Value::leaf("walk"))]);
        let pattern = Value::leaf("red");
        assert!(Value::matches(&pattern, &value));
        assert!(!Value::matches(&value, &pattern));
    }
}
