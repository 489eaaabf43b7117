//! Flattening nested trees into single-level maps, and re-nesting them.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Leaf, Node};

/// Single-level mapping of joined-path keys to leaves.
pub type FlatMap = BTreeMap<String, Leaf>;

/// Separator placed between path segments.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Collapses a tree into a [`FlatMap`].
///
/// With `keep_nested_name` every key is the separator-joined path from the
/// root to the leaf. Without it only the leaf's own name is kept, which
/// requires leaf names to be unique across the whole tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flattener {
    separator: String,
    keep_nested_name: bool,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR, true)
    }
}

impl Flattener {
    pub fn new(separator: impl Into<String>, keep_nested_name: bool) -> Self {
        Self {
            separator: separator.into(),
            keep_nested_name,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Flatten `tree` depth-first, pre-order.
    ///
    /// Ordered-group children use their decimal index as the segment name.
    /// A bare leaf root yields a single entry under the empty key.
    ///
    /// # Errors
    /// [`DomainError::DuplicateKey`] as soon as a computed key was already
    /// recorded; nothing is overwritten.
    #[instrument(level = "debug", skip(self, tree), fields(keep_nested_name = self.keep_nested_name))]
    pub fn flatten(&self, tree: &Node) -> DomainResult<FlatMap> {
        let mut out = FlatMap::new();
        let mut stack: Vec<(String, &Node)> = vec![(String::new(), tree)];

        while let Some((name, node)) = stack.pop() {
            match node {
                Node::Leaf(leaf) => {
                    let key = name
                        .strip_suffix(self.separator.as_str())
                        .unwrap_or(&name)
                        .to_string();
                    if out.contains_key(&key) {
                        return Err(DomainError::DuplicateKey(key));
                    }
                    trace!("flatten: {}", key);
                    out.insert(key, leaf.clone());
                }
                // pushed in reverse so children pop in order
                Node::Group(children) => {
                    for (child, node) in children.iter().rev() {
                        stack.push((self.child_name(&name, child), node));
                    }
                }
                Node::OrderedGroup(children) => {
                    for (index, node) in children.iter().enumerate().rev() {
                        stack.push((self.child_name(&name, &index.to_string()), node));
                    }
                }
            }
        }

        Ok(out)
    }

    fn child_name(&self, prefix: &str, name: &str) -> String {
        let mut out = if self.keep_nested_name {
            prefix.to_string()
        } else {
            String::new()
        };
        out.push_str(name);
        out.push_str(&self.separator);
        out
    }
}

/// Flatten with the default `_` separator.
pub fn flatten(tree: &Node, keep_nested_name: bool) -> DomainResult<FlatMap> {
    Flattener::new(DEFAULT_SEPARATOR, keep_nested_name).flatten(tree)
}

/// Re-nest a flat map by splitting every key on `separator`.
///
/// Only named groups are produced; index segments of former ordered groups
/// come back as group names. A map holding just the empty key rebuilds a
/// bare leaf.
///
/// # Errors
/// [`DomainError::PathConflict`] when a key is both a leaf and the prefix of
/// another key.
pub fn unflatten(flat: &FlatMap, separator: &str) -> DomainResult<Node> {
    if let Some(leaf) = flat.get("") {
        if flat.len() == 1 {
            return Ok(Node::Leaf(leaf.clone()));
        }
        return Err(DomainError::PathConflict(String::new()));
    }

    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    for (key, leaf) in flat {
        let segments: Vec<&str> = if separator.is_empty() {
            vec![key.as_str()]
        } else {
            key.split(separator).collect()
        };
        let Some((last, parents)) = segments.split_last() else {
            continue;
        };

        let mut current = &mut root;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Node::Group(BTreeMap::new()));
            current = match entry {
                Node::Group(children) => children,
                _ => return Err(DomainError::PathConflict(key.clone())),
            };
        }

        match current.entry(last.to_string()) {
            Entry::Occupied(_) => return Err(DomainError::PathConflict(key.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Node::Leaf(leaf.clone()));
            }
        }
    }

    Ok(Node::Group(root))
}
