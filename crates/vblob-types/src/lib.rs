//! Identifier types for vblob.
//!
//! Every object the versioned layer writes lives under a key of the form
//! `<base>_v-<token>`. This crate owns the pure half of that scheme: parsing,
//! formatting, ordering, and classifying those keys. Nothing here performs
//! I/O; every other vblob crate depends on `vblob-types`.
//!
//! # Key Types
//!
//! - [`BaseIdentifier`] — stable name of a logical object family
//! - [`VersionStamp`] — epoch-millisecond stamp with a sortable text form
//! - [`VersionToken`] — live timestamp, `current` reference, or tombstone
//! - [`VersionIdentifier`] — base plus optional version token
//! - [`Locator`] — scheme-prefixed external form of an identifier

pub mod base;
pub mod error;
pub mod locator;
pub mod stamp;
pub mod version;

pub use base::{BaseIdentifier, VERSION_DELIMITER};
pub use error::{Result, TypeError};
pub use locator::Locator;
pub use stamp::VersionStamp;
pub use version::{VersionIdentifier, VersionToken, CURRENT_TOKEN, TOMBSTONE_SUFFIX};
