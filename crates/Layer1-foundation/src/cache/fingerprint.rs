//! Request fingerprints for cache keys
//!
//! A fingerprint identifies one logical request: the operation name, the
//! content hash of the raw input, and the discriminating parameters
//! (target language, question, result limit, ...). Every field is
//! length-prefixed before hashing so that `("ab", "c")` and `("a", "bc")`
//! never collide.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

const DOMAIN_TAG: &[u8] = b"medimind.fingerprint.v1";

/// SHA-256 of raw input bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the content hash of raw input bytes
pub fn content_hash(raw: &[u8]) -> ContentHash {
    ContentHash(Sha256::digest(raw).into())
}

/// Deterministic cache key for a logical request
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Start building a fingerprint for an operation
    pub fn builder(operation: impl Into<String>) -> FingerprintBuilder {
        FingerprintBuilder::new(operation)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Compute a fingerprint in one call
///
/// `params` are discriminating parameters; their order does not matter.
pub fn fingerprint(operation: &str, raw_input: &[u8], params: &[(&str, &str)]) -> Fingerprint {
    params
        .iter()
        .fold(
            Fingerprint::builder(operation).input(raw_input),
            |builder, (name, value)| builder.param(*name, *value),
        )
        .finish()
}

/// Builder combining the parts of a fingerprint
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    operation: String,
    content: Option<ContentHash>,
    params: BTreeMap<String, String>,
}

impl FingerprintBuilder {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            content: None,
            params: BTreeMap::new(),
        }
    }

    /// Hash raw input bytes
    pub fn input(mut self, raw: &[u8]) -> Self {
        self.content = Some(content_hash(raw));
        self
    }

    /// Use an already computed content hash
    pub fn content(mut self, hash: ContentHash) -> Self {
        self.content = Some(hash);
        self
    }

    /// Add a discriminating parameter (a repeated name keeps the last value)
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    pub fn finish(&self) -> Fingerprint {
        let content = self.content.unwrap_or_else(|| content_hash(&[]));

        let mut hasher = Sha256::new();
        write_field(&mut hasher, DOMAIN_TAG);
        write_field(&mut hasher, self.operation.as_bytes());
        write_field(&mut hasher, content.as_bytes());
        hasher.update((self.params.len() as u64).to_le_bytes());
        for (name, value) in &self.params {
            write_field(&mut hasher, name.as_bytes());
            write_field(&mut hasher, value.as_bytes());
        }

        Fingerprint(hasher.finalize().into())
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}
