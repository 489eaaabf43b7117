//! Hierarchical loader service
//!
//! Materializes a store as a nested [`Node`] tree.

use std::collections::BTreeMap;

use tracing::{debug, instrument, trace};

use crate::application::ApplicationResult;
use crate::domain::{Leaf, Node};
use crate::infrastructure::store::StoreGuard;
use crate::infrastructure::traits::{ChildKind, HierarchicalStore};

/// Group attribute that marks a group as an ordered sequence.
pub const DEFAULT_ORDERED_MARKER: &str = "_iterable";

/// Service for loading nested trees from hierarchical stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderService {
    marker: String,
}

impl Default for LoaderService {
    fn default() -> Self {
        Self::new(DEFAULT_ORDERED_MARKER)
    }
}

impl LoaderService {
    /// Create a loader recognizing ordered groups by the boolean attribute `marker`.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Load the whole store, then close it.
    ///
    /// The store is closed on every exit path: explicitly on success, by the
    /// guard when loading fails.
    pub fn load<S: HierarchicalStore>(&self, store: S) -> ApplicationResult<Node> {
        let guard = StoreGuard::new(store);
        let tree = self.load_path(&*guard, "/")?;
        guard.close()?;
        Ok(tree)
    }

    /// Load the group at `path`, as an ordered group when it carries the marker.
    pub fn load_path<S: HierarchicalStore + ?Sized>(
        &self,
        store: &S,
        path: &str,
    ) -> ApplicationResult<Node> {
        let path = group_path(path);
        if store
            .read_group_attribute(&path, &self.marker)?
            .unwrap_or(false)
        {
            self.load_ordered(store, &path)
        } else {
            self.load_group(store, &path)
        }
    }

    /// Load the group at `path` as a named mapping, recursing into sub-groups.
    #[instrument(level = "debug", skip(self, store))]
    pub fn load_group<S: HierarchicalStore + ?Sized>(
        &self,
        store: &S,
        path: &str,
    ) -> ApplicationResult<Node> {
        let path = group_path(path);
        let mut children = BTreeMap::new();

        for child in store.list_children(&path)? {
            let node = match child.kind {
                ChildKind::Dataset => {
                    Node::Leaf(self.read_leaf(store, &format!("{path}{}", child.name))?)
                }
                ChildKind::Group => self.load_path(store, &format!("{path}{}/", child.name))?,
            };
            children.insert(child.name, node);
        }

        debug!("load_group: {} -> {} children", path, children.len());
        Ok(Node::Group(children))
    }

    /// Load an ordered group: children `"0"`, `"1"`, ... read as datasets.
    ///
    /// The length is the number of index-named children. Elements are read
    /// shallowly; an element that is itself a group fails with
    /// `StoreError::NotADataset`. A missing index fails with
    /// `StoreError::NotFound`.
    #[instrument(level = "debug", skip(self, store))]
    pub fn load_ordered<S: HierarchicalStore + ?Sized>(
        &self,
        store: &S,
        path: &str,
    ) -> ApplicationResult<Node> {
        let path = group_path(path);
        let len = store
            .list_children(&path)?
            .iter()
            .filter(|c| is_index(&c.name))
            .count();
        debug!("load_ordered: {} has {} elements", path, len);

        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            items.push(Node::Leaf(self.read_leaf(store, &format!("{path}{index}"))?));
        }
        Ok(Node::OrderedGroup(items))
    }

    /// Read a dataset, decoding fixed-width byte strings to text.
    fn read_leaf<S: HierarchicalStore + ?Sized>(
        &self,
        store: &S,
        path: &str,
    ) -> ApplicationResult<Leaf> {
        let leaf = store.read_dataset(path)?;
        trace!("read_leaf: {} ({})", path, leaf.dtype());
        if leaf.dtype().is_fixed_bytes() {
            return Ok(leaf.decode_text(path)?);
        }
        Ok(leaf)
    }
}

fn group_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Canonical non-negative decimal: `0`, `7`, `12`, but not `07` or `-1`.
fn is_index(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_digit())
        && (name == "0" || !name.starts_with('0'))
}
