use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Generate a deterministic semantic hash for rule-text parse requests.
///
/// The hash uses a lower-cased, trimmed version of the input so whitespace
/// and casing variations of the same rule text share one cache entry.
pub fn semantic_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    let normalized = input.trim().to_lowercase();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    STANDARD_NO_PAD.encode(digest)
}
