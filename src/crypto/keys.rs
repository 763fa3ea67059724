//! # Key Management
//!
//! This module defines the key material handled by the engine.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Hybrid (X25519 + ML-KEM-768)                                   │   │
//! │  │  ─────────────────────────────                                   │   │
//! │  │                                                                  │   │
//! │  │  Secret: [ X25519 secret (32) | ML-KEM dk (2400) ] = 2432       │   │
//! │  │  Public: [ X25519 public (32) | ML-KEM ek (1184) ] = 1216       │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  PostQuantum (ML-KEM-768 only)                                  │   │
//! │  │  ─────────────────────────────                                   │   │
//! │  │                                                                  │   │
//! │  │  Secret: ML-KEM dk (2400)                                       │   │
//! │  │  Public: ML-KEM ek (1184)                                       │   │
//! │  │                                                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  The kind is decided by length alone. Any other length is a format      │
//! │  error, never a partial parse.                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keypairs are immutable once created and are never persisted by the engine.
//! The colon-joined `secret_hex:public_hex` form only exists at the string
//! boundary (see [`KeyPair::to_encoded`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroizing, ZeroizeOnDrop};

use super::{
    HYBRID_CIPHERTEXT_SIZE, HYBRID_PUBLIC_KEY_SIZE, HYBRID_SECRET_KEY_SIZE, MLKEM_CIPHERTEXT_SIZE,
    MLKEM_PUBLIC_KEY_SIZE, MLKEM_SECRET_KEY_SIZE, SHARED_SECRET_SIZE, X25519_PUBLIC_KEY_SIZE,
    X25519_SECRET_KEY_SIZE,
};
use crate::error::{Error, Result};

/// Separator used by the boundary encodings (`a_hex:b_hex`); never valid hex
pub const ENCODING_SEPARATOR: char = ':';

/// Which KEM a key or ciphertext belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// X25519 combined with ML-KEM-768
    #[serde(rename = "x25519-mlkem768")]
    Hybrid,
    /// ML-KEM-768 alone
    #[serde(rename = "mlkem768")]
    PostQuantum,
}

impl KeyKind {
    /// Secret key length for this kind
    pub fn secret_key_size(self) -> usize {
        match self {
            KeyKind::Hybrid => HYBRID_SECRET_KEY_SIZE,
            KeyKind::PostQuantum => MLKEM_SECRET_KEY_SIZE,
        }
    }

    /// Public key length for this kind
    pub fn public_key_size(self) -> usize {
        match self {
            KeyKind::Hybrid => HYBRID_PUBLIC_KEY_SIZE,
            KeyKind::PostQuantum => MLKEM_PUBLIC_KEY_SIZE,
        }
    }

    /// KEM ciphertext length for this kind
    pub fn ciphertext_size(self) -> usize {
        match self {
            KeyKind::Hybrid => HYBRID_CIPHERTEXT_SIZE,
            KeyKind::PostQuantum => MLKEM_CIPHERTEXT_SIZE,
        }
    }

    /// Algorithm label used in document metadata
    pub fn algorithm(self) -> &'static str {
        match self {
            KeyKind::Hybrid => "x25519-mlkem768",
            KeyKind::PostQuantum => "mlkem768",
        }
    }

    /// Classify a secret key by its length
    pub fn from_secret_key_len(len: usize) -> Option<Self> {
        match len {
            HYBRID_SECRET_KEY_SIZE => Some(KeyKind::Hybrid),
            MLKEM_SECRET_KEY_SIZE => Some(KeyKind::PostQuantum),
            _ => None,
        }
    }

    /// Classify a public key by its length
    pub fn from_public_key_len(len: usize) -> Option<Self> {
        match len {
            HYBRID_PUBLIC_KEY_SIZE => Some(KeyKind::Hybrid),
            MLKEM_PUBLIC_KEY_SIZE => Some(KeyKind::PostQuantum),
            _ => None,
        }
    }
}

// ============================================================================
// SECRET KEY
// ============================================================================

/// A hybrid or ML-KEM-only secret key
///
/// ## Security
///
/// - Bytes are zeroized when this struct is dropped
/// - `Debug` output never contains key material
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    kind: KeyKind,
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Create from raw bytes, classifying the kind by length
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let kind = KeyKind::from_secret_key_len(bytes.len()).ok_or(Error::InvalidKeyLength {
            what: "secret key",
            expected: HYBRID_SECRET_KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self {
            kind,
            bytes: bytes.to_vec(),
        })
    }

    /// Decode from hex (surrounding whitespace is ignored)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim())
                .map_err(|e| Error::InvalidKeyEncoding(format!("secret key is not hex: {}", e)))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Which KEM this key belongs to
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Get the raw key bytes
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage. Never log or transmit these bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode as hex
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.bytes))
    }

    /// Split a hybrid key into its X25519 and ML-KEM parts
    pub(crate) fn hybrid_parts(&self) -> Option<([u8; X25519_SECRET_KEY_SIZE], &[u8])> {
        if self.kind != KeyKind::Hybrid {
            return None;
        }
        let (classical, pq) = self.bytes.split_at(X25519_SECRET_KEY_SIZE);
        let classical: [u8; X25519_SECRET_KEY_SIZE] = classical.try_into().ok()?;
        Some((classical, pq))
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("kind", &self.kind)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

/// A hybrid or ML-KEM-only public key
///
/// This contains only public information and can be serialized,
/// transmitted, and stored without security concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    kind: KeyKind,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Create from raw bytes, classifying the kind by length
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let kind = KeyKind::from_public_key_len(bytes.len()).ok_or(Error::InvalidKeyLength {
            what: "public key",
            expected: HYBRID_PUBLIC_KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self {
            kind,
            bytes: bytes.to_vec(),
        })
    }

    /// Decode from hex (surrounding whitespace is ignored)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| Error::InvalidKeyEncoding(format!("public key is not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Which KEM this key belongs to
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encode as hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// SHA-256 fingerprint of the key bytes, hex encoded
    ///
    /// Used as the informational recipient label in document metadata.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Split a hybrid key into its X25519 and ML-KEM parts
    pub(crate) fn hybrid_parts(&self) -> Option<([u8; X25519_PUBLIC_KEY_SIZE], &[u8])> {
        if self.kind != KeyKind::Hybrid {
            return None;
        }
        let (classical, pq) = self.bytes.split_at(X25519_PUBLIC_KEY_SIZE);
        let classical: [u8; X25519_PUBLIC_KEY_SIZE] = classical.try_into().ok()?;
        Some((classical, pq))
    }
}

// ============================================================================
// KEYPAIR
// ============================================================================

/// A secret key together with its public half
///
/// Created once (from a seed or from randomness) and immutable thereafter.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Secret half (zeroized on drop)
    pub secret: SecretKey,
    /// Public half (shared freely)
    pub public: PublicKey,
}

impl KeyPair {
    /// Assemble a keypair, checking that both halves are the same kind
    pub(crate) fn from_parts(secret: &[u8], public: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_bytes(secret)?;
        let public = PublicKey::from_bytes(public)?;
        if secret.kind() != public.kind() {
            return Err(Error::InvalidKeyLength {
                what: "public key",
                expected: secret.kind().public_key_size(),
                actual: public.as_bytes().len(),
            });
        }
        Ok(Self { secret, public })
    }

    /// Which KEM this keypair belongs to
    pub fn kind(&self) -> KeyKind {
        self.secret.kind()
    }

    /// Boundary encoding: `secret_hex:public_hex`
    pub fn to_encoded(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}{}{}",
            self.secret.to_hex().as_str(),
            ENCODING_SEPARATOR,
            self.public.to_hex()
        ))
    }

    /// Parse the `secret_hex:public_hex` boundary encoding
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let (secret_hex, public_hex) = encoded
            .trim()
            .split_once(ENCODING_SEPARATOR)
            .ok_or_else(|| Error::InvalidKeyEncoding("expected secret_hex:public_hex".into()))?;
        let secret = SecretKey::from_hex(secret_hex)?;
        let public = PublicKey::from_hex(public_hex)?;
        Self::from_parts(secret.as_bytes(), public.as_bytes())
    }
}

// ============================================================================
// SHARED SECRET / ENCAPSULATION
// ============================================================================

/// A 32-byte KEM shared secret
///
/// Uniformly random and used directly as an AES-256-GCM key.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.bytes
    }

    /// Encode as hex
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Result of a KEM encapsulation
///
/// Produced per encrypt-for-recipient operation and consumed immediately.
#[derive(Debug)]
pub struct Encapsulation {
    /// Shared secret (32 bytes)
    pub shared_secret: SharedSecret,
    /// KEM ciphertext (1120 bytes hybrid, 1088 bytes ML-KEM only)
    pub ciphertext: Vec<u8>,
}

impl Encapsulation {
    /// Boundary encoding: `shared_secret_hex:ciphertext_hex`
    pub fn to_encoded(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}{}{}",
            self.shared_secret.to_hex().as_str(),
            ENCODING_SEPARATOR,
            hex::encode(&self.ciphertext)
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================
