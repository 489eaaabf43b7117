//! Hierarchical store implementations

mod directory;
mod guard;
mod memory;
mod path;

pub use directory::{DirectoryStore, ATTRIBUTES_FILE, DATASET_EXTENSION};
pub use guard::StoreGuard;
pub use memory::{MemoryGroup, MemoryStore};
pub use path::split_path;
