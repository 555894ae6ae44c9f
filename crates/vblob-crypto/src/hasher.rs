/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every hash computation, so digests from
/// different purposes never collide even for identical bytes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher used for object etags.
    pub const ETAG: Self = Self {
        domain: "vblob-etag-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hex-encoded digest, the form stored as an etag.
    pub fn hash_hex(&self, data: &[u8]) -> String {
        hex::encode(self.hash(data))
    }

    /// Verify that data produces the expected hex digest.
    ///
    /// Comparison is case-insensitive; a malformed digest never verifies.
    pub fn verify_hex(&self, data: &[u8], expected: &str) -> bool {
        match hex::decode(expected.trim_matches('"')) {
            Ok(bytes) => bytes.as_slice() == self.hash(data).as_slice(),
            Err(_) => false,
        }
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
