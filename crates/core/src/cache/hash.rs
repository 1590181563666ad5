//! Request fingerprint generation.

use sha2::{Digest, Sha256};

/// Compute the fingerprint a response is stored under within a cache
/// partition.
///
/// `vary_key` is the serialized request header values the response varies
/// on; the empty string when the response declared no `Vary`.
pub fn compute_fingerprint(method: &str, url: &str, vary_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary_key.as_bytes());
    hex::encode(hasher.finalize())
}
