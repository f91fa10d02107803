//! # State Digests
//!
//! A [`ContentDigest`] is the SHA-256 of a [`CanonicalBytes`] value. The
//! escrow history stores one per applied transition, so two parties who
//! replay the same bundles can compare post-transition state by digest.
//!
//! The only constructor that hashes is [`ContentDigest::sha256`], which
//! takes `&CanonicalBytes`; raw byte slices cannot be digested.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Textual prefix naming the hash in `Display` output.
const SHA256_PREFIX: &str = "sha256";

/// SHA-256 digest of canonical bytes. Renders as `sha256:<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Hash canonical bytes.
    pub fn sha256(data: &CanonicalBytes) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(data.as_bytes()));
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Lowercase hex, without prefix.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SHA256_PREFIX}:{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn digest_of(value: serde_json::Value) -> ContentDigest {
        ContentDigest::sha256(&CanonicalBytes::new(&value).unwrap())
    }

    #[test]
    fn key_order_does_not_change_digest() {
        let a = digest_of(json!({"deposit_paid": 1, "prop_delivered": 0}));
        let b = digest_of(json!({"prop_delivered": 0, "deposit_paid": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn flag_change_changes_digest() {
        assert_ne!(
            digest_of(json!({"deposit_paid": 0})),
            digest_of(json!({"deposit_paid": 1}))
        );
    }

    #[test]
    fn display_is_prefixed_hex() {
        let s = digest_of(json!({"lease_end": 1_731_859_200u64})).to_string();
        let hex = s.strip_prefix("sha256:").unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_object_vector() {
        assert_eq!(
            digest_of(json!({})).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
