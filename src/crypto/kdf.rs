//! # Key Derivation
//!
//! HKDF-SHA256 based derivations: seed expansion, the hybrid KEM combiner
//! and the document MAC subkey.
//!
//! ## Seed Expansion
//!
//! ```text
//! Seed (32 bytes)
//!       │
//!       ├──► HKDF(info="rabbitlock-seed-x25519-v1")  → X25519 static secret
//!       │
//!       ├──► HKDF(info="rabbitlock-seed-mlkem-d-v1") → ML-KEM seed d
//!       │
//!       └──► HKDF(info="rabbitlock-seed-mlkem-z-v1") → ML-KEM seed z
//! ```
//!
//! ## Hybrid Combiner
//!
//! ```text
//! ikm  = ss_mlkem ∥ ss_x25519 ∥ x25519_ephemeral_pk ∥ x25519_recipient_pk
//! salt = "rabbitlock-hybrid-kem-v1"
//! info = "rabbitlock-hybrid-shared-secret-v1"
//!
//! shared_secret = HKDF-SHA256(salt, ikm).expand(info, 32)
//! ```
//!
//! The output stays uniform as long as either input secret is uniform.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{SEED_SIZE, SHARED_SECRET_SIZE, X25519_PUBLIC_KEY_SIZE};
use crate::error::{Error, Result};

/// Domain separation strings for HKDF
///
/// These ensure that keys derived for different purposes are cryptographically
/// independent, even when derived from the same input.
pub mod domain {
    /// X25519 static secret from a seed
    pub const SEED_X25519: &[u8] = b"rabbitlock-seed-x25519-v1";

    /// ML-KEM `d` seed from a seed
    pub const SEED_MLKEM_D: &[u8] = b"rabbitlock-seed-mlkem-d-v1";

    /// ML-KEM `z` seed from a seed
    pub const SEED_MLKEM_Z: &[u8] = b"rabbitlock-seed-mlkem-z-v1";

    /// Salt of the hybrid combiner
    pub const HYBRID_KEM_SALT: &[u8] = b"rabbitlock-hybrid-kem-v1";

    /// Info of the hybrid combiner
    pub const HYBRID_SHARED_SECRET: &[u8] = b"rabbitlock-hybrid-shared-secret-v1";

    /// Document MAC subkey from a data key
    pub const DOCUMENT_MAC: &[u8] = b"rabbitlock-document-mac-v1";
}

/// Key material expanded from a seed
#[derive(ZeroizeOnDrop)]
pub struct SeedMaterial {
    /// X25519 static secret (32 bytes)
    pub x25519_secret: [u8; 32],

    /// ML-KEM-768 key generation seed `d` (32 bytes)
    pub mlkem_d: [u8; 32],

    /// ML-KEM-768 key generation seed `z` (32 bytes)
    pub mlkem_z: [u8; 32],
}

/// Expand a 32-byte seed into the inputs of both key generators
///
/// Deterministic: the same seed always yields the same material.
pub fn expand_seed(seed: &[u8; SEED_SIZE]) -> Result<SeedMaterial> {
    let hkdf = Hkdf::<Sha256>::new(None, seed);

    let mut material = SeedMaterial {
        x25519_secret: [0u8; 32],
        mlkem_d: [0u8; 32],
        mlkem_z: [0u8; 32],
    };

    hkdf.expand(domain::SEED_X25519, &mut material.x25519_secret)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive X25519 secret".into()))?;
    hkdf.expand(domain::SEED_MLKEM_D, &mut material.mlkem_d)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive ML-KEM seed d".into()))?;
    hkdf.expand(domain::SEED_MLKEM_Z, &mut material.mlkem_z)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive ML-KEM seed z".into()))?;

    Ok(material)
}

/// Combine the ML-KEM and X25519 secrets into the final hybrid secret
///
/// Both encapsulation and decapsulation call this with the same ordering,
/// which is what makes the two sides agree bit for bit.
pub fn combine_hybrid_secrets(
    mlkem_secret: &[u8; SHARED_SECRET_SIZE],
    x25519_secret: &[u8; SHARED_SECRET_SIZE],
    ephemeral_public: &[u8; X25519_PUBLIC_KEY_SIZE],
    recipient_public: &[u8; X25519_PUBLIC_KEY_SIZE],
) -> Result<[u8; SHARED_SECRET_SIZE]> {
    let mut ikm = [0u8; 2 * SHARED_SECRET_SIZE + 2 * X25519_PUBLIC_KEY_SIZE];
    ikm[..32].copy_from_slice(mlkem_secret);
    ikm[32..64].copy_from_slice(x25519_secret);
    ikm[64..96].copy_from_slice(ephemeral_public);
    ikm[96..].copy_from_slice(recipient_public);

    let hkdf = Hkdf::<Sha256>::new(Some(domain::HYBRID_KEM_SALT), &ikm);
    ikm.zeroize();

    let mut combined = [0u8; SHARED_SECRET_SIZE];
    hkdf.expand(domain::HYBRID_SHARED_SECRET, &mut combined)
        .map_err(|_| Error::KeyDerivationFailed("Failed to combine hybrid secrets".into()))?;

    Ok(combined)
}

/// Derive the aggregate MAC key from a document data key
pub fn derive_mac_key(data_key: &[u8; 32]) -> Result<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(None, data_key);

    let mut key = [0u8; 32];
    hkdf.expand(domain::DOCUMENT_MAC, &mut key)
        .map_err(|_| Error::KeyDerivationFailed("Failed to derive MAC key".into()))?;

    Ok(key)
}

// ============================================================================
// TESTS
// ============================================================================
