//! Etag Module
//!
//! Fast, non-cryptographic fingerprints of cached payloads.

use serde_json::Value;

use crate::error::Result;

// == Generate Etag ==
/// Computes the etag of a JSON payload.
///
/// The payload is serialized to its compact form (object keys are ordered, so
/// equal values always serialize identically) and folded with a 32-bit
/// multiplicative rolling hash. The result is a quoted hex string suitable
/// for an `ETag` header. Collisions are tolerated.
pub fn generate_etag(data: &Value) -> Result<String> {
    let serialized = serde_json::to_string(data)?;
    Ok(format!("\"{:08x}\"", rolling_hash(serialized.as_bytes())))
}

/// `h = h * 31 + b` over the input, wrapping on overflow.
fn rolling_hash(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |hash, &b| hash.wrapping_mul(31).wrapping_add(u32::from(b)))
}
