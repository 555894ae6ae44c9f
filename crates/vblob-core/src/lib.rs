//! Versioned blob storage for vblob.
//!
//! [`VersionedBlobStore`] keeps many timestamped versions of one logical
//! object in a flat [`ObjectStore`](vblob_store::ObjectStore), using nothing
//! but put, get, head, delete, list-by-prefix, and copy. It owns no state of
//! its own: "current" is always derived from the key listing at query time.
//!
//! # Lifecycle of a base
//!
//! ```text
//! Unversioned ──upload_version──▶ Versioned-Current ──upload_version──▶ Versioned-Superseded
//!                                        │                                      │
//!                                        └──────────────delete──────────────────┴──▶ Tombstoned
//! ```
//!
//! - A legacy object at the bare base key is moved to `<base>_v-<lastModified>`
//!   the first time a new version is written (or the base is deleted).
//! - Deleting a version writes a zero-length `-deletionmarker` key before the
//!   live key is removed, so [`VersionedBlobStore::version_files`] keeps the
//!   full history.
//! - Handles never fetch content until [`StoredObjectHandle::read`] is called.
//!
//! # Modules
//!
//! - [`store`]: the [`VersionedBlobStore`] itself
//! - [`handle`]: lazily-read [`StoredObjectHandle`]
//! - [`clock`]: injectable clocks and the collision-free [`VersionClock`]
//! - [`verify`]: the [`ChecksumVerifier`] capability
//! - [`adapter`]: locator and feature queries used by the host framework
//! - [`config`]: [`BlobStoreConfig`]
//! - [`error`]: [`BlobError`]

pub mod adapter;
pub mod clock;
pub mod config;
pub mod error;
pub mod handle;
pub mod store;
pub mod verify;

pub use adapter::Feature;
pub use clock::{Clock, ManualClock, SystemClock, VersionClock};
pub use config::BlobStoreConfig;
pub use error::{BlobError, BlobResult};
pub use handle::StoredObjectHandle;
pub use store::VersionedBlobStore;
pub use verify::{ChecksumVerifier, DigestVerifier};

// Re-export key types
pub use vblob_types::{BaseIdentifier, Locator, VersionIdentifier, VersionStamp, VersionToken};
