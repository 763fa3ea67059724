//! # Cryptography Module
//!
//! This module provides the cryptographic primitives of the engine: seed
//! derivation, the post-quantum and hybrid KEMs, and the AEAD envelope.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │                 Seed (32 bytes, hex encoded)                    │   │
//! │  │                          │                                      │   │
//! │  │                    HKDF-SHA256                                  │   │
//! │  │          ┌───────────────┼───────────────┐                      │   │
//! │  │          ▼               ▼               ▼                      │   │
//! │  │   X25519 secret    ML-KEM seed d   ML-KEM seed z                │   │
//! │  │          │               └───────┬───────┘                      │   │
//! │  │          ▼                       ▼                              │   │
//! │  │   X25519 keypair        ML-KEM-768 keypair                      │   │
//! │  │   (32 / 32 bytes)       (2400 / 1184 bytes)                     │   │
//! │  │          └───────────┬───────────┘                              │   │
//! │  │                      ▼                                          │   │
//! │  │         Hybrid keypair (2432 / 1216 bytes)                      │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ENCRYPTION SCHEME                               │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Hybrid KEM: X25519 ECDH + ML-KEM-768 encapsulation         │   │
//! │  │     → combined with HKDF-SHA256 into one 32-byte secret        │   │
//! │  │                                                                 │   │
//! │  │  2. Key wrap: AES-256-GCM(shared secret, data key)              │   │
//! │  │                                                                 │   │
//! │  │  3. Payload: AES-256-GCM(data key, leaf / blob)                 │   │
//! │  │     • 256-bit key                                               │   │
//! │  │     • 96-bit nonce (random per seal)                            │   │
//! │  │     • 128-bit authentication tag                                │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | X25519 | Classical KEM half | Fast ECDH, constant-time dalek implementation |
//! | ML-KEM-768 | Post-quantum KEM half | FIPS 203, NIST category 3 |
//! | AES-256-GCM | Encryption | Hardware acceleration, AEAD |
//! | HKDF-SHA256 | Key Derivation | Industry standard, well-analyzed |
//! | HMAC-SHA256 | Document MAC | Constant-time verification |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: Secret keys, shared secrets and data keys are zeroized when dropped
//! 2. **Constant-Time Operations**: dalek and RustCrypto primitives, constant-time tag/MAC checks
//! 3. **Secure Random**: `rand::rngs::OsRng` by default, injectable through `*_with_rng`
//! 4. **No Nonce Reuse**: A fresh random nonce for every seal

pub mod encryption;
pub mod hybrid;
pub mod kdf;
pub mod keys;
pub mod pq;

pub use encryption::{open, open_hex, seal, seal_hex, DataKey, Nonce};
pub use hybrid::derive_hybrid_keypair;
pub use keys::{Encapsulation, KeyKind, KeyPair, PublicKey, SecretKey, SharedSecret};

/// X25519 secret key size in bytes
pub const X25519_SECRET_KEY_SIZE: usize = 32;

/// X25519 public key size in bytes
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

/// ML-KEM-768 decapsulation (secret) key size in bytes
pub const MLKEM_SECRET_KEY_SIZE: usize = 2400;

/// ML-KEM-768 encapsulation (public) key size in bytes
pub const MLKEM_PUBLIC_KEY_SIZE: usize = 1184;

/// ML-KEM-768 ciphertext size in bytes
pub const MLKEM_CIPHERTEXT_SIZE: usize = 1088;

/// Hybrid secret key size: X25519 secret ∥ ML-KEM-768 decapsulation key
pub const HYBRID_SECRET_KEY_SIZE: usize = X25519_SECRET_KEY_SIZE + MLKEM_SECRET_KEY_SIZE;

/// Hybrid public key size: X25519 public ∥ ML-KEM-768 encapsulation key
pub const HYBRID_PUBLIC_KEY_SIZE: usize = X25519_PUBLIC_KEY_SIZE + MLKEM_PUBLIC_KEY_SIZE;

/// Hybrid ciphertext size: ML-KEM-768 ciphertext ∥ X25519 ephemeral public
pub const HYBRID_CIPHERTEXT_SIZE: usize = MLKEM_CIPHERTEXT_SIZE + X25519_PUBLIC_KEY_SIZE;

/// Shared secret size in bytes, identical for every KEM mode
pub const SHARED_SECRET_SIZE: usize = 32;

/// Seed size in bytes
pub const SEED_SIZE: usize = 32;

// ============================================================================
// KEM DISPATCH
// ============================================================================

/// Encapsulate for a public key of either kind, picking the engine by kind
pub fn encapsulate_for_with_rng<R: rand_core::CryptoRngCore>(
    recipient: &PublicKey,
    rng: &mut R,
) -> crate::Result<Encapsulation> {
    tracing::debug!("Encapsulating for {} recipient", recipient.kind().algorithm());
    match recipient.kind() {
        KeyKind::Hybrid => hybrid::encapsulate_with_rng(recipient.as_bytes(), rng),
        KeyKind::PostQuantum => pq::encapsulate_with_rng(recipient.as_bytes(), rng),
    }
}

/// Decapsulate with a secret key of either kind, picking the engine by kind
pub fn decapsulate_with(secret: &SecretKey, ciphertext: &[u8]) -> crate::Result<SharedSecret> {
    match secret.kind() {
        KeyKind::Hybrid => hybrid::decapsulate(secret.as_bytes(), ciphertext),
        KeyKind::PostQuantum => pq::decapsulate(secret.as_bytes(), ciphertext),
    }
}

/// Size table reported to front-end collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct KemSizes {
    /// X25519 secret key bytes
    pub x25519_secret_key: usize,
    /// X25519 public key bytes
    pub x25519_public_key: usize,
    /// ML-KEM-768 secret key bytes
    pub mlkem_secret_key: usize,
    /// ML-KEM-768 public key bytes
    pub mlkem_public_key: usize,
    /// ML-KEM-768 ciphertext bytes
    pub mlkem_ciphertext: usize,
    /// Hybrid secret key bytes
    pub hybrid_secret_key: usize,
    /// Hybrid public key bytes
    pub hybrid_public_key: usize,
    /// Hybrid ciphertext bytes
    pub hybrid_ciphertext: usize,
    /// Shared secret bytes
    pub shared_secret: usize,
}

/// Returns the fixed key, ciphertext and secret sizes of every KEM mode
pub fn kem_sizes() -> KemSizes {
    KemSizes {
        x25519_secret_key: X25519_SECRET_KEY_SIZE,
        x25519_public_key: X25519_PUBLIC_KEY_SIZE,
        mlkem_secret_key: MLKEM_SECRET_KEY_SIZE,
        mlkem_public_key: MLKEM_PUBLIC_KEY_SIZE,
        mlkem_ciphertext: MLKEM_CIPHERTEXT_SIZE,
        hybrid_secret_key: HYBRID_SECRET_KEY_SIZE,
        hybrid_public_key: HYBRID_PUBLIC_KEY_SIZE,
        hybrid_ciphertext: HYBRID_CIPHERTEXT_SIZE,
        shared_secret: SHARED_SECRET_SIZE,
    }
}
