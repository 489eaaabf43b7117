//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `HierarchicalStore` boundary trait
//! but are themselves concrete structs, not traits.

mod loader;

pub use loader::{LoaderService, DEFAULT_ORDERED_MARKER};
