//! Flat key-value object storage for vblob.
//!
//! This crate defines the primitive operations the versioned layer is built
//! from: put, get, head, delete, delete-many, list-by-prefix, and copy over
//! opaque byte values keyed by `/`-delimited strings. It knows nothing about
//! versions; keys are plain text.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`PrefixedObjectStore`] -- scopes another store under a key prefix
//!
//! # Design Rules
//!
//! 1. The store never interprets object contents.
//! 2. `put` overwrites; there is no compare-and-swap.
//! 3. Every object carries an etag derived from its bytes.
//! 4. Listing returns logical keys in ascending order.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod metadata;
pub mod prefixed;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryObjectStore, OpStats};
pub use metadata::ObjectMetadata;
pub use prefixed::PrefixedObjectStore;
pub use traits::ObjectStore;
