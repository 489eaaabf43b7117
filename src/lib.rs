//! Nested key-value trees: flattening to single-level maps and loading from
//! hierarchical group/dataset stores.
//!
//! ```no_run
//! use nestkit::{flatten, load};
//!
//! let tree = load("experiment.store")?;
//! for (key, value) in flatten(&tree, true)? {
//!     println!("{key} = {value}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::LoaderService;
pub use application::{ApplicationError, ApplicationResult};
pub use config::Settings;
pub use domain::{
    flatten, unflatten, DomainError, ElementType, Elements, FlatMap, Flattener, Leaf, Node,
};
pub use infrastructure::{DirectoryStore, HierarchicalStore, StoreError};

/// Load a directory store as a nested tree using default settings.
///
/// # Errors
/// `StoreError::NotFound` when the store or a referenced child is missing;
/// I/O errors are propagated with their original source.
pub fn load(filename: impl AsRef<Path>) -> ApplicationResult<Node> {
    load_with(&Settings::default(), filename)
}

/// Load a directory store with the ordered-group marker from `settings`.
pub fn load_with(settings: &Settings, filename: impl AsRef<Path>) -> ApplicationResult<Node> {
    let store = DirectoryStore::open(filename)?;
    settings.loader().load(store)
}

/// Load any store with default settings, closing it afterwards.
pub fn load_from<S: HierarchicalStore>(store: S) -> ApplicationResult<Node> {
    LoaderService::default().load(store)
}
