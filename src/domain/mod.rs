//! Domain layer: the tree model and pure transformations
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod flatten;
pub mod node;
pub mod view;

pub use error::{DomainError, DomainResult};
pub use flatten::{flatten, unflatten, FlatMap, Flattener, DEFAULT_SEPARATOR};
pub use node::{ElementType, Elements, Leaf, Node};
pub use view::TreeView;
