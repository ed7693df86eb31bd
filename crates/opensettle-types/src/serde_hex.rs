//! Hex-string serde for 32-byte identifiers.
//!
//! All fixed-length ids (escrow ids, account keys, task hashes, proof
//! digests) travel as lowercase hex strings in JSON and URLs, matching the
//! external ledger's address encoding.

use serde::{Deserialize, Deserializer, Serializer, de};

pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    decode(&s).map_err(de::Error::custom)
}

/// Decode a 64-char hex string into 32 bytes.
pub fn decode(s: &str) -> Result<[u8; 32], String> {
    let raw = hex::decode(s).map_err(|e| format!("invalid hex: {e}"))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| format!("expected 32 bytes, got {} hex chars", s.len()))?;
    Ok(bytes)
}
