//! File-backed hierarchical store.
//!
//! Layout:
//! - the store is a directory; every group is a sub-directory
//! - dataset `x` is the file `x.toml` holding `dtype`, `shape` and flat,
//!   row-major `data`
//! - group attributes are top-level keys of `.attrs.toml` in the group directory
//!
//! Hidden entries and files without the dataset extension are ignored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toml::Value;
use tracing::{debug, instrument, trace};

use crate::domain::{ElementType, Elements, Leaf, Node};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::store::path::split_path;
use crate::infrastructure::traits::{
    ChildEntry, FileSystem, HierarchicalStore, RealFileSystem,
};

/// Attribute file inside a group directory.
pub const ATTRIBUTES_FILE: &str = ".attrs.toml";

/// Extension of dataset files.
pub const DATASET_EXTENSION: &str = "toml";

/// Largest integer magnitude an `f64` holds without rounding (2^53).
const MAX_EXACT_FLOAT_INT: u64 = 1 << 53;

/// On-disk form of a dataset.
#[derive(Debug, Serialize, Deserialize)]
struct DatasetFile {
    dtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape: Option<Vec<usize>>,
    data: Value,
}

/// Store rooted at a directory.
pub struct DirectoryStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    open: bool,
}

impl std::fmt::Debug for DirectoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryStore")
            .field("root", &self.root)
            .field("open", &self.open)
            .finish()
    }
}

impl DirectoryStore {
    /// Open the store rooted at `root` on the real filesystem.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(root, Arc::new(RealFileSystem))
    }

    /// Open with a custom filesystem (for testing).
    pub fn open_with(root: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !fs.is_dir(&root) {
            return Err(StoreError::NotFound(root.display().to_string()));
        }
        debug!("open: root={}", root.display());
        Ok(Self {
            root,
            fs,
            open: true,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `node` as a new store under `root`.
    ///
    /// Ordered groups get `marker = true` in their attribute file and one
    /// child per index. The root must be a group or an ordered group.
    pub fn write_tree(root: impl AsRef<Path>, node: &Node, marker: &str) -> StoreResult<()> {
        Self::write_tree_with(&RealFileSystem, root.as_ref(), node, marker)
    }

    #[instrument(level = "debug", skip(fs, node))]
    pub fn write_tree_with(
        fs: &dyn FileSystem,
        root: &Path,
        node: &Node,
        marker: &str,
    ) -> StoreResult<()> {
        if let Node::Leaf(_) = node {
            return Err(StoreError::InvalidRoot(node.kind()));
        }
        write_node(fs, root, node, marker)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    fn group_dir(&self, path: &str) -> StoreResult<PathBuf> {
        let mut dir = self.root.clone();
        for segment in split_path(path)? {
            dir.push(segment);
        }
        Ok(dir)
    }

    fn dataset_file(&self, path: &str) -> StoreResult<PathBuf> {
        let segments = split_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(StoreError::NotADataset(path.to_string()));
        };
        let mut file = self.root.clone();
        for segment in parents {
            file.push(segment);
        }
        file.push(format!("{last}.{DATASET_EXTENSION}"));
        Ok(file)
    }

    /// Resolve a group path to an existing directory.
    fn existing_group_dir(&self, path: &str) -> StoreResult<PathBuf> {
        let dir = self.group_dir(path)?;
        if self.fs.is_dir(&dir) {
            return Ok(dir);
        }
        match self.dataset_file(path) {
            Ok(file) if self.fs.is_file(&file) => Err(StoreError::NotAGroup(path.to_string())),
            _ => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn read_file(&self, file: &Path) -> StoreResult<String> {
        self.fs
            .read_to_string(file)
            .map_err(|e| StoreError::io(format!("read {}", file.display()), e))
    }
}

impl HierarchicalStore for DirectoryStore {
    fn list_children(&self, path: &str) -> StoreResult<Vec<ChildEntry>> {
        self.ensure_open()?;
        let dir = self.existing_group_dir(path)?;
        let entries = self
            .fs
            .list_dir(&dir)
            .map_err(|e| StoreError::io(format!("list {}", dir.display()), e))?;

        let suffix = format!(".{DATASET_EXTENSION}");
        let mut seen = BTreeSet::new();
        let mut children = Vec::new();
        for entry in entries {
            if entry.name.starts_with('.') {
                continue;
            }
            let child = if entry.is_dir {
                ChildEntry::group(entry.name)
            } else if let Some(stem) = entry.name.strip_suffix(&suffix) {
                ChildEntry::dataset(stem)
            } else {
                trace!("list_children: skipping {}", entry.name);
                continue;
            };
            if !seen.insert(child.name.clone()) {
                return Err(StoreError::format(
                    path,
                    format!("'{}' is both a group and a dataset", child.name),
                ));
            }
            children.push(child);
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn read_dataset(&self, path: &str) -> StoreResult<Leaf> {
        self.ensure_open()?;
        let file = self.dataset_file(path)?;
        if !self.fs.is_file(&file) {
            let dir = self.group_dir(path)?;
            if self.fs.is_dir(&dir) {
                return Err(StoreError::NotADataset(path.to_string()));
            }
            return Err(StoreError::NotFound(path.to_string()));
        }

        let content = self.read_file(&file)?;
        let raw: DatasetFile =
            toml::from_str(&content).map_err(|e| StoreError::format(path, e.to_string()))?;
        decode_dataset(path, raw)
    }

    fn read_group_attribute(&self, path: &str, name: &str) -> StoreResult<Option<bool>> {
        self.ensure_open()?;
        let file = self.existing_group_dir(path)?.join(ATTRIBUTES_FILE);
        if !self.fs.is_file(&file) {
            return Ok(None);
        }

        let content = self.read_file(&file)?;
        let table: toml::Table =
            toml::from_str(&content).map_err(|e| StoreError::format(path, e.to_string()))?;
        match table.get(name) {
            None => Ok(None),
            Some(Value::Boolean(flag)) => Ok(Some(*flag)),
            Some(other) => Err(StoreError::format(
                path,
                format!("attribute '{}' is a {}, expected a boolean", name, other.type_str()),
            )),
        }
    }

    fn close(&mut self) -> StoreResult<()> {
        self.open = false;
        Ok(())
    }
}

fn decode_dataset(path: &str, raw: DatasetFile) -> StoreResult<Leaf> {
    let dtype: ElementType = raw.dtype.parse()?;
    let (values, default_shape) = match raw.data {
        Value::Array(values) => {
            let len = values.len();
            (values, vec![len])
        }
        scalar => (vec![scalar], vec![]),
    };
    let shape = raw.shape.unwrap_or(default_shape);

    let mismatch = |v: &Value| {
        StoreError::format(
            path,
            format!("{} element does not fit element type {}", v.type_str(), dtype),
        )
    };

    let elements = match dtype {
        ElementType::Bool => Elements::Bool(
            values
                .iter()
                .map(|v| v.as_bool().ok_or_else(|| mismatch(v)))
                .collect::<StoreResult<_>>()?,
        ),
        ElementType::Int { .. } => Elements::Int(
            values
                .iter()
                .map(|v| v.as_integer().ok_or_else(|| mismatch(v)))
                .collect::<StoreResult<_>>()?,
        ),
        ElementType::UInt { .. } => Elements::UInt(
            values
                .iter()
                .map(|v| {
                    v.as_integer()
                        .and_then(|i| u64::try_from(i).ok())
                        .ok_or_else(|| mismatch(v))
                })
                .collect::<StoreResult<_>>()?,
        ),
        ElementType::Float { .. } => Elements::Float(
            values
                .iter()
                .map(|v| match v {
                    Value::Float(f) => Ok(*f),
                    // integer literals only where f64 represents them exactly
                    Value::Integer(i) if i.unsigned_abs() <= MAX_EXACT_FLOAT_INT => {
                        Ok(*i as f64)
                    }
                    _ => Err(mismatch(v)),
                })
                .collect::<StoreResult<_>>()?,
        ),
        ElementType::FixedBytes { .. } => Elements::Bytes(
            values
                .iter()
                .map(|v| decode_bytes(v).ok_or_else(|| mismatch(v)))
                .collect::<StoreResult<_>>()?,
        ),
        ElementType::Text => Elements::Text(
            values
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(|| mismatch(v)))
                .collect::<StoreResult<_>>()?,
        ),
    };

    Ok(Leaf::new(dtype, shape, elements)?)
}

/// A byte-string element is either a string or an array of byte values.
fn decode_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => Some(s.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|i| i.as_integer().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

fn encode_elements(elements: &Elements) -> Vec<Value> {
    match elements {
        Elements::Bool(v) => v.iter().map(|x| Value::Boolean(*x)).collect(),
        Elements::Int(v) => v.iter().map(|x| Value::Integer(*x)).collect(),
        // TOML integers are signed 64-bit; larger values saturate
        Elements::UInt(v) => v
            .iter()
            .map(|x| Value::Integer(i64::try_from(*x).unwrap_or(i64::MAX)))
            .collect(),
        Elements::Float(v) => v.iter().map(|x| Value::Float(*x)).collect(),
        Elements::Bytes(v) => v
            .iter()
            .map(|raw| match std::str::from_utf8(raw) {
                Ok(s) => Value::String(s.to_string()),
                Err(_) => Value::Array(raw.iter().map(|b| Value::Integer(i64::from(*b))).collect()),
            })
            .collect(),
        Elements::Text(v) => v.iter().map(|x| Value::String(x.clone())).collect(),
    }
}

fn validate_name(dir: &Path, name: &str) -> StoreResult<()> {
    if name.is_empty() || name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(StoreError::InvalidPath(format!("{}/{}", dir.display(), name)));
    }
    Ok(())
}

fn write_node(fs: &dyn FileSystem, dir: &Path, node: &Node, marker: &str) -> StoreResult<()> {
    fs.create_dir_all(dir)
        .map_err(|e| StoreError::io(format!("create {}", dir.display()), e))?;

    let children: Vec<(String, &Node)> = match node {
        Node::Leaf(_) => return Err(StoreError::InvalidRoot(node.kind())),
        Node::Group(children) => children.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Node::OrderedGroup(children) => {
            let mut attributes = toml::Table::new();
            attributes.insert(marker.to_string(), Value::Boolean(true));
            write_toml(fs, &dir.join(ATTRIBUTES_FILE), &attributes)?;
            children
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect()
        }
    };

    for (name, child) in children {
        validate_name(dir, &name)?;
        match child {
            Node::Leaf(leaf) => {
                let file = dir.join(format!("{name}.{DATASET_EXTENSION}"));
                let raw = DatasetFile {
                    dtype: leaf.dtype().to_string(),
                    shape: Some(leaf.shape().to_vec()),
                    data: Value::Array(encode_elements(leaf.elements())),
                };
                write_toml(fs, &file, &raw)?;
            }
            _ => write_node(fs, &dir.join(&name), child, marker)?,
        }
    }
    Ok(())
}

fn write_toml<T: Serialize>(fs: &dyn FileSystem, file: &Path, value: &T) -> StoreResult<()> {
    let content = toml::to_string(value)
        .map_err(|e| StoreError::format(file.display().to_string(), e.to_string()))?;
    fs.write(file, &content)
        .map_err(|e| StoreError::io(format!("write {}", file.display()), e))
}
