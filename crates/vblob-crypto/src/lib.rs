//! Content digests for vblob.
//!
//! Backends tag every stored object with an etag computed by
//! [`ContentHasher`]; the versioned layer recomputes the digest after an
//! upload to confirm the bytes arrived intact.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
