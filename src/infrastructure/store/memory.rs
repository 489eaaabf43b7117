//! In-memory hierarchical store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::domain::{Leaf, Node};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::store::path::split_path;
use crate::infrastructure::traits::{ChildEntry, HierarchicalStore};

#[derive(Debug, Clone, PartialEq)]
enum MemoryEntry {
    Dataset(Leaf),
    Group(MemoryGroup),
}

/// Group of an in-memory store.
///
/// Children keep insertion order, which is the order `list_children`
/// reports, so callers control the "physical" storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryGroup {
    children: Vec<(String, MemoryEntry)>,
    attributes: BTreeMap<String, bool>,
}

impl MemoryGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a dataset child.
    pub fn with_dataset(mut self, name: impl Into<String>, value: impl Into<Leaf>) -> Self {
        self.insert(name.into(), MemoryEntry::Dataset(value.into()));
        self
    }

    /// Add or replace a group child.
    pub fn with_group(mut self, name: impl Into<String>, group: MemoryGroup) -> Self {
        self.insert(name.into(), MemoryEntry::Group(group));
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: bool) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Drop a child by name, if present.
    pub fn without(mut self, name: &str) -> Self {
        self.children.retain(|(n, _)| n != name);
        self
    }

    /// Mirror a tree, tagging ordered groups with `marker = true`.
    pub fn from_node(node: &Node, marker: &str) -> StoreResult<Self> {
        match node {
            Node::Leaf(_) => Err(StoreError::InvalidRoot(node.kind())),
            Node::Group(children) => {
                let mut group = Self::new();
                for (name, child) in children {
                    group = group.with_node(name.clone(), child, marker)?;
                }
                Ok(group)
            }
            Node::OrderedGroup(children) => {
                let mut group = Self::new().with_attribute(marker, true);
                for (index, child) in children.iter().enumerate() {
                    group = group.with_node(index.to_string(), child, marker)?;
                }
                Ok(group)
            }
        }
    }

    fn with_node(self, name: String, node: &Node, marker: &str) -> StoreResult<Self> {
        Ok(match node {
            Node::Leaf(leaf) => self.with_dataset(name, leaf.clone()),
            _ => self.with_group(name, Self::from_node(node, marker)?),
        })
    }

    fn insert(&mut self, name: String, entry: MemoryEntry) {
        match self.children.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.children.push((name, entry)),
        }
    }

    fn child(&self, name: &str) -> Option<&MemoryEntry> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }
}

/// Store backed by an in-memory tree.
///
/// Closing is counted through a shared counter so callers can observe
/// release after handing the store away.
#[derive(Debug)]
pub struct MemoryStore {
    root: MemoryGroup,
    open: bool,
    closes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new(root: MemoryGroup) -> Self {
        Self {
            root,
            open: true,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter incremented on every `close`.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    fn lookup(&self, path: &str) -> StoreResult<Option<&MemoryEntry>> {
        let mut group = &self.root;
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Ok(None);
        };
        for segment in parents {
            match group.child(segment) {
                Some(MemoryEntry::Group(next)) => group = next,
                Some(MemoryEntry::Dataset(_)) => return Err(StoreError::NotAGroup(path.to_string())),
                None => return Err(StoreError::NotFound(path.to_string())),
            }
        }
        match group.child(last) {
            Some(entry) => Ok(Some(entry)),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn group(&self, path: &str) -> StoreResult<&MemoryGroup> {
        match self.lookup(path)? {
            None => Ok(&self.root),
            Some(MemoryEntry::Group(group)) => Ok(group),
            Some(MemoryEntry::Dataset(_)) => Err(StoreError::NotAGroup(path.to_string())),
        }
    }
}

impl HierarchicalStore for MemoryStore {
    fn list_children(&self, path: &str) -> StoreResult<Vec<ChildEntry>> {
        self.ensure_open()?;
        Ok(self
            .group(path)?
            .children
            .iter()
            .map(|(name, entry)| match entry {
                MemoryEntry::Dataset(_) => ChildEntry::dataset(name.clone()),
                MemoryEntry::Group(_) => ChildEntry::group(name.clone()),
            })
            .collect())
    }

    fn read_dataset(&self, path: &str) -> StoreResult<Leaf> {
        self.ensure_open()?;
        match self.lookup(path)? {
            Some(MemoryEntry::Dataset(leaf)) => Ok(leaf.clone()),
            _ => Err(StoreError::NotADataset(path.to_string())),
        }
    }

    fn read_group_attribute(&self, path: &str, name: &str) -> StoreResult<Option<bool>> {
        self.ensure_open()?;
        Ok(self.group(path)?.attributes.get(name).copied())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.open = false;
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
