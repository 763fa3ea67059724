//! # AEAD Envelope
//!
//! AES-256-GCM sealing of arbitrary byte payloads. Used to wrap per-document
//! data keys, to encrypt every document leaf, and to encrypt raw binary blobs.
//!
//! ## Envelope Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SEALED VALUE                                     │
//! ├──────────────┬──────────────────────────────────────┬───────────────────┤
//! │  nonce (12)  │  ciphertext (len(plaintext))         │  tag (16)         │
//! └──────────────┴──────────────────────────────────────┴───────────────────┘
//! ```
//!
//! ## Fail-Closed
//!
//! [`open`] returns either the full plaintext or `AuthenticationFailed`.
//! A wrong key length, a truncated envelope, a wrong associated-data value
//! and a flipped bit all produce the same error.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use zeroize::{Zeroizing, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// ## Critical Security Requirement
///
/// **NEVER reuse a nonce with the same key!**
///
/// Nonce reuse completely breaks AES-GCM security:
/// - Allows recovering the authentication key
/// - Allows forging messages
/// - May allow recovering plaintext
///
/// We use random nonces, which are safe for up to 2^32 messages
/// per key (birthday bound for 96-bit nonces).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a random nonce from the supplied source
    pub fn random_with_rng<R: CryptoRngCore>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A 256-bit document data key
///
/// Zeroized when dropped for security.
#[derive(Clone, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_SIZE]);

impl DataKey {
    /// Generate a fresh random data key from the OS
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a fresh random data key from the supplied source
    pub fn generate_with_rng<R: CryptoRngCore>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; KEY_SIZE];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice that must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| Error::InvalidKeyLength {
            what: "data key",
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Decode from hex (surrounding whitespace is ignored)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim())
                .map_err(|e| Error::InvalidKeyEncoding(format!("data key is not hex: {}", e)))?,
        );
        Self::from_slice(&bytes)
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encode as hex
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey(<redacted>)")
    }
}

/// The (nonce, ciphertext, tag) triple of one sealed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedParts {
    /// Nonce used for this seal
    pub nonce: Nonce,
    /// Ciphertext, same length as the plaintext
    pub ciphertext: Vec<u8>,
    /// Authentication tag
    pub tag: [u8; TAG_SIZE],
}

fn cipher_for_seal(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_SIZE {
        return Err(Error::InvalidKeyLength {
            what: "AEAD key",
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| Error::InvalidKeyLength {
        what: "AEAD key",
        expected: KEY_SIZE,
        actual: key.len(),
    })
}

/// Seal a payload into its (nonce, ciphertext, tag) parts
pub fn seal_parts_with_rng<R: CryptoRngCore>(
    key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<SealedParts> {
    let cipher = cipher_for_seal(key)?;
    let nonce = Nonce::random_with_rng(rng)?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let mut ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|_| Error::SerializationError("payload exceeds AES-GCM limits".into()))?;

    let tag_bytes = ciphertext.split_off(ciphertext.len() - TAG_SIZE);
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&tag_bytes);

    Ok(SealedParts {
        nonce,
        ciphertext,
        tag,
    })
}

/// Seal a payload into its parts using the OS random source
pub fn seal_parts(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<SealedParts> {
    seal_parts_with_rng(key, plaintext, aad, &mut OsRng)
}

/// Open a payload from its (nonce, ciphertext, tag) parts
///
/// ## Errors
///
/// Returns `AuthenticationFailed` if:
/// - The ciphertext, tag or nonce was tampered with
/// - The AAD doesn't match
/// - The key is wrong or not 32 bytes
pub fn open_parts(key: &[u8], parts: &SealedParts, aad: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_SIZE {
        return Err(Error::AuthenticationFailed);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::AuthenticationFailed)?;

    let mut combined = Vec::with_capacity(parts.ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(&parts.ciphertext);
    combined.extend_from_slice(&parts.tag);

    let payload = Payload {
        msg: &combined,
        aad,
    };

    cipher
        .decrypt(AesNonce::from_slice(&parts.nonce.0), payload)
        .map_err(|_| Error::AuthenticationFailed)
}

/// Seal a payload as `nonce ∥ ciphertext ∥ tag`
///
/// ## Parameters
///
/// - `key`: 256-bit key (`InvalidKeyLength` otherwise)
/// - `plaintext`: Payload to encrypt
/// - `aad`: Additional authenticated data (not encrypted, but authenticated)
///
/// ## Example
///
/// ```ignore
/// let key = DataKey::generate()?;
/// let sealed = seal(key.as_bytes(), b"secret", b"context")?;
/// ```
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    seal_with_rng(key, plaintext, aad, &mut OsRng)
}

/// Seal with an injected random source
pub fn seal_with_rng<R: CryptoRngCore>(
    key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let parts = seal_parts_with_rng(key, plaintext, aad, rng)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + parts.ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(&parts.nonce.0);
    sealed.extend_from_slice(&parts.ciphertext);
    sealed.extend_from_slice(&parts.tag);
    Ok(sealed)
}

/// Open a `nonce ∥ ciphertext ∥ tag` value
pub fn open(key: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::AuthenticationFailed);
    }

    let (nonce, rest) = sealed.split_at(NONCE_SIZE);
    let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);
    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag);

    let parts = SealedParts {
        nonce: Nonce(nonce_bytes),
        ciphertext: ciphertext.to_vec(),
        tag: tag_bytes,
    };
    open_parts(key, &parts, aad)
}

/// Seal and hex-encode (string boundary helper)
pub fn seal_hex(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<String> {
    seal(key, plaintext, aad).map(hex::encode)
}

/// Hex-decode and open (string boundary helper)
///
/// Input that is not hex is treated like any other unopenable envelope.
pub fn open_hex(key: &[u8], sealed_hex: &str, aad: &[u8]) -> Result<Vec<u8>> {
    let sealed = hex::decode(sealed_hex.trim()).map_err(|_| Error::AuthenticationFailed)?;
    open(key, &sealed, aad)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_seal_open_basic() {
        let key = DataKey::from_bytes([42u8; 32]);
        let plaintext = b"Hello, World!";
        let aad = b"context";

        let sealed = seal(key.as_bytes(), plaintext, aad).unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);

        let opened = open(key.as_bytes(), &sealed, aad).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_seal_open_empty() {
        let key = DataKey::from_bytes([42u8; 32]);

        let sealed = seal(key.as_bytes(), b"", b"").unwrap();
        let opened = open(key.as_bytes(), &sealed, b"").unwrap();

        assert!(opened.is_empty());
    }

    #[test]
    fn test_seal_rejects_short_key() {
        let result = seal(&[0u8; 31], b"data", b"");
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidKeyLength {
                what: "AEAD key",
                expected: 32,
                actual: 31,
            }
        );
    }

    #[test]
    fn test_open_wrong_key_length_fails_closed() {
        let key = DataKey::from_bytes([42u8; 32]);
        let sealed = seal(key.as_bytes(), b"data", b"").unwrap();

        assert_eq!(open(&[42u8; 16], &sealed, b""), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn test_open_truncated_fails() {
        let key = DataKey::from_bytes([42u8; 32]);
        assert_eq!(
            open(key.as_bytes(), &[0u8; NONCE_SIZE + TAG_SIZE - 1], b""),
            Err(Error::AuthenticationFailed)
        );
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = DataKey::from_bytes([42u8; 32]);
        let sealed = seal(key.as_bytes(), b"Hello", b"context").unwrap();

        assert_eq!(
            open(key.as_bytes(), &sealed, b"wrong context"),
            Err(Error::AuthenticationFailed)
        );
    }

    #[test]
    fn test_every_bit_flip_detected() {
        let key = DataKey::from_bytes([7u8; 32]);
        let sealed = seal(key.as_bytes(), b"short secret", b"aad").unwrap();

        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    open(key.as_bytes(), &tampered, b"aad"),
                    Err(Error::AuthenticationFailed),
                    "flip at byte {} bit {} went unnoticed",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = DataKey::from_bytes([42u8; 32]);

        let a = seal(key.as_bytes(), b"same", b"").unwrap();
        let b = seal(key.as_bytes(), b"same", b"").unwrap();

        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_injected_rng_is_deterministic() {
        let key = [1u8; 32];
        let a = seal_with_rng(&key, b"x", b"", &mut StdRng::seed_from_u64(5)).unwrap();
        let b = seal_with_rng(&key, b"x", b"", &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parts_round_trip() {
        let key = [9u8; 32];
        let parts = seal_parts(&key, b"leaf value", b"[\"a\"]").unwrap();

        assert_eq!(parts.ciphertext.len(), b"leaf value".len());
        assert_eq!(open_parts(&key, &parts, b"[\"a\"]").unwrap(), b"leaf value");
    }

    #[test]
    fn test_hex_helpers() {
        let key = [3u8; 32];
        let sealed = seal_hex(&key, b"wrapped", b"").unwrap();

        assert_eq!(open_hex(&key, &sealed, b"").unwrap(), b"wrapped");
        assert_eq!(open_hex(&key, "not hex", b""), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn test_data_key_from_hex() {
        let key = DataKey::from_hex(&"ab".repeat(32)).unwrap();
        assert_eq!(key.as_bytes(), &[0xAB; 32]);

        assert!(matches!(
            DataKey::from_hex(&"ab".repeat(31)),
            Err(Error::InvalidKeyLength { actual: 31, .. })
        ));
        assert!(matches!(DataKey::from_hex("xyz"), Err(Error::InvalidKeyEncoding(_))));
    }

    proptest! {
        #[test]
        fn prop_seal_open_round_trip(
            key in any::<[u8; 32]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            aad in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let sealed = seal(&key, &plaintext, &aad).unwrap();
            prop_assert_eq!(open(&key, &sealed, &aad).unwrap(), plaintext);
        }
    }
}
