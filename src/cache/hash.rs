//! Content hashing for plan fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 over the JSON form of `value`, as lowercase hex.
///
/// Serialization is field-order stable, so equal values always produce the
/// same fingerprint.
///
/// # Errors
/// Returns an error if the value cannot be serialized to JSON.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}
