use vblob_crypto::ContentHasher;
use vblob_store::ObjectMetadata;

/// Post-upload integrity check.
///
/// Given the bytes that were sent and the metadata the backend reported for
/// the written object, return `true` if they agree. Injected at construction;
/// a store without a verifier skips the check.
pub trait ChecksumVerifier: Send + Sync {
    fn verify(&self, content: &[u8], stored: &ObjectMetadata) -> bool;
}

impl<F> ChecksumVerifier for F
where
    F: Fn(&[u8], &ObjectMetadata) -> bool + Send + Sync,
{
    fn verify(&self, content: &[u8], stored: &ObjectMetadata) -> bool {
        self(content, stored)
    }
}

/// Compares the BLAKE3 etag reported by the backend with a digest of the
/// uploaded bytes. Matches the etags produced by the vblob backends.
#[derive(Clone, Copy, Debug, Default)]
pub struct DigestVerifier;

impl ChecksumVerifier for DigestVerifier {
    fn verify(&self, content: &[u8], stored: &ObjectMetadata) -> bool {
        stored.size == content.len() as u64 && ContentHasher::ETAG.verify_hex(content, &stored.etag)
    }
}
