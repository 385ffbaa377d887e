//! Vickrey commit-reveal hash encoding.
//!
//! The commitment is bit-exact: a 32-byte big-endian amount concatenated
//! with a 32-byte salt, hashed with Keccak-256. Byte order and hash
//! primitive are both fixed — a revealer who encodes either differently
//! will never match their own commitment.

use sha3::{Digest, Keccak256};

/// Computes `commitment = Keccak256( BE(amount, 32) || salt )`.
pub fn commit(amount: u128, salt: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(be_bytes_32(amount));
    hasher.update(salt);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Verifies a revealed `(amount, salt)` pair against a stored commitment.
pub fn verify(commitment: &[u8; 32], amount: u128, salt: &[u8; 32]) -> bool {
    &commit(amount, salt) == commitment
}

/// Unsigned big-endian 32-byte encoding of `amount`. `u128` only needs 16
/// bytes; the high 16 bytes are zero-padded, which is the natural
/// zero-extension of a big-endian encoding.
fn be_bytes_32(amount: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&amount.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_commitment() {
        let salt = [7u8; 32];
        assert_eq!(commit(1_000, &salt), commit(1_000, &salt));
    }

    #[test]
    fn different_amount_changes_commitment() {
        let salt = [7u8; 32];
        assert_ne!(commit(1_000, &salt), commit(2_000, &salt));
    }

    #[test]
    fn different_salt_changes_commitment() {
        assert_ne!(commit(1_000, &[1u8; 32]), commit(1_000, &[2u8; 32]));
    }

    #[test]
    fn verify_round_trips() {
        let salt = [9u8; 32];
        let c = commit(42, &salt);
        assert!(verify(&c, 42, &salt));
        assert!(!verify(&c, 43, &salt));
        assert!(!verify(&c, 42, &[0u8; 32]));
    }

    #[test]
    fn encoding_is_big_endian_zero_extended() {
        assert_eq!(be_bytes_32(1)[31], 1);
        assert_eq!(be_bytes_32(1)[..31], [0u8; 31]);
        assert_eq!(be_bytes_32(256)[30], 1);
    }
}
