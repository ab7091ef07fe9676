// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Crypto primitives (C1): signing, verification, content hashing, and
//! canonical serialisation.
//!
//! Ed25519 is the fixed signature algorithm for this profile — the source
//! material mixes P-256 and Ed25519 across modules; this implementation
//! picks Ed25519 and rejects any other key material with
//! [`CryptoError::InvalidKey`] rather than silently accepting both.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Failure modes for crypto operations. No silent fallbacks: malformed key
/// material always fails with [`CryptoError::InvalidKey`], a mismatched or
/// malformed signature always fails with [`CryptoError::BadSignature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key bytes do not decode to a valid Ed25519 key.
    InvalidKey,
    /// Signature bytes are malformed, or verification failed.
    BadSignature,
}

impl core::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CryptoError::InvalidKey => write!(f, "invalid key material"),
            CryptoError::BadSignature => write!(f, "bad or mismatched signature"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CryptoError {}

/// An Ed25519 keypair. The private half never leaves the process that
/// generated it except via explicit, deliberate serialisation by the
/// caller.
#[derive(Debug, Clone)]
pub struct Keypair {
    /// Public verifying key bytes.
    pub public: [u8; 32],
    /// Private signing key bytes.
    pub private: [u8; 32],
}

/// Generate a fresh Ed25519 keypair using the operating system's secure
/// random source.
pub fn generate_keypair() -> Keypair {
    let signing_key = SigningKey::generate(&mut OsRng);
    Keypair {
        public: signing_key.verifying_key().to_bytes(),
        private: signing_key.to_bytes(),
    }
}

/// Sign `bytes` with the Ed25519 private key `private`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if `private` is not a valid Ed25519
/// scalar (this practically never happens for 32 arbitrary bytes, but the
/// check is kept explicit rather than assumed).
pub fn sign(bytes: &[u8], private: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
    let signing_key = SigningKey::from_bytes(private);
    let signature = signing_key.sign(bytes);
    Ok(signature.to_bytes())
}

/// Verify that `signature` over `bytes` was produced by the holder of
/// `public`.
///
/// Returns `Ok(())` on a valid signature, `Err(CryptoError::InvalidKey)` if
/// `public` does not decode to a point on the curve, and
/// `Err(CryptoError::BadSignature)` otherwise.
pub fn verify(bytes: &[u8], signature: &[u8; 64], public: &[u8; 32]) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_bytes(public).map_err(|_| CryptoError::InvalidKey)?;
    let signature = Signature::from_bytes(signature);
    verifying_key
        .verify(bytes, &signature)
        .map_err(|_| CryptoError::BadSignature)
}

/// Deterministically encode `value` to bytes: fixed field order (as declared
/// on the struct), normalized numeric forms, no insignificant whitespace.
///
/// Record and ID hashes are always computed over this encoding, never over
/// an ad-hoc concatenation of fields, so that `canonical_encode` is the
/// single source of truth for "what got hashed".
pub fn canonical_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    serde_json::to_vec(value).map_err(|_| CryptoError::InvalidKey)
}

/// SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hex-encode a digest for use as an id or a stored hash string.
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let keypair = generate_keypair();
        let message = b"r6-record-body";
        let signature = sign(message, &keypair.private).unwrap();
        assert!(verify(message, &signature, &keypair.public).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let keypair = generate_keypair();
        let signature = sign(b"original", &keypair.private).unwrap();
        let result = verify(b"tampered", &signature, &keypair.public);
        assert_eq!(result, Err(CryptoError::BadSignature));
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash(b"same input");
        let b = content_hash(b"same input");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_input() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }
}
