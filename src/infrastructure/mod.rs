//! Infrastructure layer: store implementations and I/O boundaries
//!
//! The loader only sees the `HierarchicalStore` trait; concrete stores and the
//! filesystem seam live here.

pub mod error;
pub mod store;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use store::{DirectoryStore, MemoryGroup, MemoryStore, StoreGuard};
pub use traits::{ChildEntry, ChildKind, DirEntryInfo, FileSystem, HierarchicalStore, RealFileSystem};
