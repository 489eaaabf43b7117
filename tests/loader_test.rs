//! Tests for loading trees from directory stores

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use nestkit::infrastructure::{
    ChildEntry, DirEntryInfo, FileSystem, MemoryGroup, MemoryStore, RealFileSystem, StoreResult,
};
use nestkit::util::testing;
use nestkit::{
    flatten, load, load_from, load_with, ApplicationError, DirectoryStore, ElementType, Elements,
    HierarchicalStore, Leaf, LoaderService, Node, Settings, StoreError,
};

/// Helper to create store files for testing
fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create parent");
    std::fs::write(&path, content).expect("write store file");
    path
}

fn int_dataset(value: i64) -> String {
    format!("dtype = \"<i8\"\ndata = {value}\n")
}

#[fixture]
fn store_dir() -> TempDir {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write_file(root, "seed.toml", &int_dataset(7));
    write_file(
        root,
        "labels.toml",
        "dtype = \"|S5\"\nshape = [3]\ndata = [\"cat\", \"horse\", [100, 111, 103, 0, 0]]\n",
    );
    write_file(
        root,
        "model/weights.toml",
        "dtype = \"<f4\"\nshape = [2, 2]\ndata = [1.0, 0.5, 0.25, 0.125]\n",
    );
    write_file(root, "model/hidden.toml", &int_dataset(64));

    // ordered group, files written out of index order
    write_file(root, "sizes/.attrs.toml", "_iterable = true\n");
    for i in [3i64, 0, 4, 2, 1] {
        write_file(root, &format!("sizes/{i}.toml"), &int_dataset(i * 10));
    }

    temp
}

#[rstest]
fn given_store_when_loading_then_groups_become_nested_nodes(store_dir: TempDir) {
    let tree = load(store_dir.path()).unwrap();

    let model = tree.get("model").unwrap();
    assert!(matches!(model, Node::Group(_)));
    assert_eq!(model.get("hidden"), Some(&Node::Leaf(Leaf::from(64i64))));

    let weights = model.get("weights").and_then(Node::as_leaf).unwrap();
    assert_eq!(weights.dtype(), ElementType::Float { bytes: 4 });
    assert_eq!(weights.shape(), &[2, 2]);
    assert_eq!(
        weights.elements(),
        &Elements::Float(vec![1.0, 0.5, 0.25, 0.125])
    );
}

#[rstest]
fn given_marked_group_when_loading_then_ordered_sequence_in_index_order(store_dir: TempDir) {
    let tree = load(store_dir.path()).unwrap();

    let expected = Node::ordered((0..5i64).map(|i| Leaf::from(i * 10)));
    assert_eq!(tree.get("sizes"), Some(&expected));
}

#[rstest]
fn given_byte_string_dataset_when_loading_then_text_elements(store_dir: TempDir) {
    let tree = load(store_dir.path()).unwrap();

    let labels = tree.get("labels").and_then(Node::as_leaf).unwrap();
    assert_eq!(labels.dtype(), ElementType::Text);
    assert_eq!(
        labels.elements(),
        &Elements::Text(vec!["cat".into(), "horse".into(), "dog".into()])
    );
    // non-string datasets untouched
    assert_eq!(tree.get("seed"), Some(&Node::Leaf(Leaf::from(7i64))));
}

#[rstest]
fn given_missing_index_when_loading_then_not_found(store_dir: TempDir) {
    std::fs::remove_file(store_dir.path().join("sizes/2.toml")).unwrap();

    let err = load(store_dir.path()).unwrap_err();

    match err {
        ApplicationError::Store(StoreError::NotFound(path)) => assert_eq!(path, "/sizes/2"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[rstest]
fn given_store_when_loading_and_flattening_then_joined_keys(store_dir: TempDir) {
    let tree = load(store_dir.path()).unwrap();

    let flat = flatten(&tree, true).unwrap();

    assert!(flat.contains_key("model_weights"));
    assert!(flat.contains_key("sizes_4"));
    assert_eq!(flat["sizes_4"], Leaf::from(40i64));
}

#[test]
fn given_missing_store_when_loading_then_not_found() {
    let temp = TempDir::new().unwrap();
    let err = load(temp.path().join("nope")).unwrap_err();
    assert!(matches!(err, ApplicationError::Store(StoreError::NotFound(_))));
}

#[test]
fn given_unreadable_dataset_when_loading_then_format_error_propagates() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "broken.toml", "dtype = \"<i8\"\ndata = [1, 2\n");

    let err = load(temp.path()).unwrap_err();

    assert!(matches!(err, ApplicationError::Store(StoreError::Format { .. })));
}

#[test]
fn given_custom_marker_in_settings_when_loading_then_used() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "xs/.attrs.toml", "is_list = true\n");
    write_file(temp.path(), "xs/0.toml", &int_dataset(1));

    let settings = Settings {
        ordered_marker: "is_list".to_string(),
        ..Settings::default()
    };

    assert_eq!(
        load_with(&settings, temp.path()).unwrap().get("xs"),
        Some(&Node::ordered([Leaf::from(1i64)]))
    );
    // the default marker does not recognize it
    assert!(matches!(
        load(temp.path()).unwrap().get("xs"),
        Some(Node::Group(_))
    ));
}

#[test]
fn given_tree_when_written_and_loaded_then_round_trips() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = Node::group([
        ("name", Node::Leaf(Leaf::from("run-1"))),
        ("flags", Node::Leaf(Leaf::from(true))),
        (
            "grid",
            Node::group([
                ("lrs", Node::Leaf(Leaf::from(vec![0.1, 0.01]))),
                ("seeds", Node::ordered([Leaf::from(1i64), Leaf::from(2i64)])),
            ]),
        ),
        ("raw", Node::Leaf(Leaf::fixed_bytes(vec![b"ok".to_vec()]))),
    ]);

    DirectoryStore::write_tree(temp.path(), &tree, "_iterable").unwrap();
    let loaded = load(temp.path()).unwrap();

    // byte strings come back decoded
    let expected_raw = Leaf::new(
        ElementType::Text,
        vec![1],
        Elements::Text(vec!["ok".to_string()]),
    )
    .unwrap();
    assert_eq!(loaded.get("raw"), Some(&Node::Leaf(expected_raw)));
    assert_eq!(loaded.get("grid"), tree.get("grid"));
    assert_eq!(loaded.get("name"), tree.get("name"));
    assert_eq!(loaded.get("flags"), tree.get("flags"));
}

#[test]
fn given_memory_store_when_loading_fails_then_store_closed() {
    let store = MemoryStore::new(
        MemoryGroup::new().with_group(
            "xs",
            MemoryGroup::new()
                .with_attribute("_iterable", true)
                .with_dataset("1", 1i64),
        ),
    );
    let closes = store.close_counter();

    let err = load_from(store).unwrap_err();

    assert!(matches!(err, ApplicationError::Store(StoreError::NotFound(_))));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn given_memory_store_when_loading_succeeds_then_store_closed() {
    let tree = Node::group([("a", Node::group([("b", Node::Leaf(Leaf::from(1i64)))]))]);
    let store = MemoryStore::new(MemoryGroup::from_node(&tree, "_iterable").unwrap());
    let closes = store.close_counter();

    assert_eq!(load_from(store).unwrap(), tree);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

/// Real filesystem whose dataset reads are refused.
struct DenyingFileSystem;

impl FileSystem for DenyingFileSystem {
    fn read_to_string(&self, _path: &Path) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        RealFileSystem.write(path, content)
    }

    fn is_file(&self, path: &Path) -> bool {
        RealFileSystem.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        RealFileSystem.is_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        RealFileSystem.list_dir(path)
    }
}

/// Counts closes of the wrapped store.
struct CountingStore<S> {
    inner: S,
    closes: Arc<AtomicUsize>,
}

impl<S: HierarchicalStore> HierarchicalStore for CountingStore<S> {
    fn list_children(&self, path: &str) -> StoreResult<Vec<ChildEntry>> {
        self.inner.list_children(path)
    }

    fn read_dataset(&self, path: &str) -> StoreResult<Leaf> {
        self.inner.read_dataset(path)
    }

    fn read_group_attribute(&self, path: &str, name: &str) -> StoreResult<Option<bool>> {
        self.inner.read_group_attribute(path, name)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

#[rstest]
fn given_unreadable_file_when_loading_then_io_error_kept_and_store_closed(store_dir: TempDir) {
    let inner = DirectoryStore::open_with(store_dir.path(), Arc::new(DenyingFileSystem)).unwrap();
    let closes = Arc::new(AtomicUsize::new(0));
    let store = CountingStore {
        inner,
        closes: Arc::clone(&closes),
    };

    let err = LoaderService::default().load(store).unwrap_err();

    match err {
        ApplicationError::Store(StoreError::Io { source, .. }) => {
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied)
        }
        other => panic!("expected Io, got {other:?}"),
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
