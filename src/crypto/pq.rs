//! # Post-Quantum KEM Engine
//!
//! ML-KEM-768 on its own, for recipients that only hold a post-quantum key.
//!
//! ```text
//! encapsulate(ek: 1184 B) ──► (shared secret: 32 B, ciphertext: 1088 B)
//! decapsulate(dk: 2400 B, ciphertext: 1088 B) ──► shared secret: 32 B
//! ```
//!
//! Decapsulating a ciphertext that was made for another key does not fail:
//! ML-KEM's implicit rejection returns a pseudorandom secret, and the
//! mismatch is caught later by the AEAD tag check of whatever that secret
//! was supposed to open.

use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, Encoded, EncodedSizeUser, KemCore, MlKem768, B32};
use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use super::keys::{Encapsulation, KeyPair, SharedSecret};
use super::{MLKEM_CIPHERTEXT_SIZE, MLKEM_PUBLIC_KEY_SIZE, MLKEM_SECRET_KEY_SIZE, SHARED_SECRET_SIZE};
use crate::error::{Error, Result};

type DecapsulationKey = <MlKem768 as KemCore>::DecapsulationKey;
type EncapsulationKey = <MlKem768 as KemCore>::EncapsulationKey;

fn check_len(what: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(Error::InvalidKeyLength {
            what,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn decode_encapsulation_key(bytes: &[u8]) -> Result<EncapsulationKey> {
    check_len("ML-KEM public key", bytes, MLKEM_PUBLIC_KEY_SIZE)?;
    let encoded = Encoded::<EncapsulationKey>::try_from(bytes).map_err(|_| {
        Error::InvalidKeyLength {
            what: "ML-KEM public key",
            expected: MLKEM_PUBLIC_KEY_SIZE,
            actual: bytes.len(),
        }
    })?;
    Ok(EncapsulationKey::from_bytes(&encoded))
}

fn decode_decapsulation_key(bytes: &[u8]) -> Result<DecapsulationKey> {
    check_len("ML-KEM secret key", bytes, MLKEM_SECRET_KEY_SIZE)?;
    let encoded = Encoded::<DecapsulationKey>::try_from(bytes).map_err(|_| {
        Error::InvalidKeyLength {
            what: "ML-KEM secret key",
            expected: MLKEM_SECRET_KEY_SIZE,
            actual: bytes.len(),
        }
    })?;
    Ok(DecapsulationKey::from_bytes(&encoded))
}

fn shared_secret_from(bytes: &[u8]) -> Result<[u8; SHARED_SECRET_SIZE]> {
    bytes
        .try_into()
        .map_err(|_| Error::KeyDerivationFailed("ML-KEM shared key has unexpected size".into()))
}

/// Encode a freshly generated ML-KEM keypair as (secret bytes, public bytes)
fn encode_pair(dk: &DecapsulationKey, ek: &EncapsulationKey) -> (Zeroizing<Vec<u8>>, Vec<u8>) {
    (Zeroizing::new(dk.as_bytes().to_vec()), ek.as_bytes().to_vec())
}

/// Deterministic ML-KEM-768 key generation from the FIPS 203 `(d, z)` seeds
pub(crate) fn keypair_from_seeds(d: &[u8; 32], z: &[u8; 32]) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
    let d = B32::try_from(&d[..])
        .map_err(|_| Error::KeyDerivationFailed("ML-KEM seed d has unexpected size".into()))?;
    let z = B32::try_from(&z[..])
        .map_err(|_| Error::KeyDerivationFailed("ML-KEM seed z has unexpected size".into()))?;

    let (dk, ek) = MlKem768::generate_deterministic(&d, &z);
    Ok(encode_pair(&dk, &ek))
}

/// Generate a random ML-KEM-768 keypair with an injected random source
pub(crate) fn raw_keypair_with_rng<R: CryptoRngCore>(rng: &mut R) -> (Zeroizing<Vec<u8>>, Vec<u8>) {
    let (dk, ek) = MlKem768::generate(rng);
    encode_pair(&dk, &ek)
}

/// Run ML-KEM encapsulation against raw encapsulation-key bytes
pub(crate) fn encapsulate_raw<R: CryptoRngCore>(
    public: &[u8],
    rng: &mut R,
) -> Result<([u8; SHARED_SECRET_SIZE], Vec<u8>)> {
    let ek = decode_encapsulation_key(public)?;
    let (ciphertext, shared) = ek
        .encapsulate(rng)
        .map_err(|_| Error::EntropySourceFailure("ML-KEM encapsulation failed".into()))?;

    Ok((shared_secret_from(&shared)?, ciphertext.to_vec()))
}

/// Run ML-KEM decapsulation against raw decapsulation-key bytes
pub(crate) fn decapsulate_raw(secret: &[u8], ciphertext: &[u8]) -> Result<[u8; SHARED_SECRET_SIZE]> {
    let dk = decode_decapsulation_key(secret)?;
    if ciphertext.len() != MLKEM_CIPHERTEXT_SIZE {
        return Err(Error::InvalidCiphertextLength {
            expected: MLKEM_CIPHERTEXT_SIZE,
            actual: ciphertext.len(),
        });
    }
    let ciphertext = Ciphertext::<MlKem768>::try_from(ciphertext).map_err(|_| {
        Error::InvalidCiphertextLength {
            expected: MLKEM_CIPHERTEXT_SIZE,
            actual: ciphertext.len(),
        }
    })?;

    let shared = dk
        .decapsulate(&ciphertext)
        .map_err(|_| Error::KeyDerivationFailed("ML-KEM decapsulation failed".into()))?;
    shared_secret_from(&shared)
}

// ============================================================================
// PUBLIC ENGINE
// ============================================================================

/// Generate a new random ML-KEM-768 keypair
///
/// Non-deterministic: every call yields an independent keypair.
pub fn generate_keypair() -> Result<KeyPair> {
    generate_keypair_with_rng(&mut OsRng)
}

/// Generate a new ML-KEM-768 keypair from the supplied random source
pub fn generate_keypair_with_rng<R: CryptoRngCore>(rng: &mut R) -> Result<KeyPair> {
    let (secret, public) = raw_keypair_with_rng(rng);
    KeyPair::from_parts(&secret, &public)
}

/// Encapsulate a fresh shared secret for an ML-KEM-768 public key (1184 bytes)
pub fn encapsulate(recipient_public: &[u8]) -> Result<Encapsulation> {
    encapsulate_with_rng(recipient_public, &mut OsRng)
}

/// Encapsulate with an injected random source
pub fn encapsulate_with_rng<R: CryptoRngCore>(
    recipient_public: &[u8],
    rng: &mut R,
) -> Result<Encapsulation> {
    let (shared, ciphertext) = encapsulate_raw(recipient_public, rng)?;
    tracing::debug!("ML-KEM-768 encapsulation produced {} byte ciphertext", ciphertext.len());

    Ok(Encapsulation {
        shared_secret: SharedSecret::from_bytes(shared),
        ciphertext,
    })
}

/// Recover the shared secret with an ML-KEM-768 secret key (2400 bytes)
///
/// Lengths are validated before any cryptographic work runs. A ciphertext
/// made for a different key yields a useless secret rather than an error.
pub fn decapsulate(secret_key: &[u8], ciphertext: &[u8]) -> Result<SharedSecret> {
    decapsulate_raw(secret_key, ciphertext).map(SharedSecret::from_bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyKind;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_generate_keypair_sizes() {
        let pair = generate_keypair().unwrap();

        assert_eq!(pair.kind(), KeyKind::PostQuantum);
        assert_eq!(pair.secret.as_bytes().len(), MLKEM_SECRET_KEY_SIZE);
        assert_eq!(pair.public.as_bytes().len(), MLKEM_PUBLIC_KEY_SIZE);
    }

    #[test]
    fn test_generate_keypair_independent() {
        let a = generate_keypair().unwrap();
        let b = generate_keypair().unwrap();
        assert_ne!(a.public, b.public);
    }

    #[test]
    fn test_encapsulate_decapsulate_round_trip() {
        let pair = generate_keypair().unwrap();

        let encapsulation = encapsulate(pair.public.as_bytes()).unwrap();
        assert_eq!(encapsulation.ciphertext.len(), MLKEM_CIPHERTEXT_SIZE);

        let recovered = decapsulate(pair.secret.as_bytes(), &encapsulation.ciphertext).unwrap();
        assert_eq!(recovered.as_bytes(), encapsulation.shared_secret.as_bytes());
    }

    #[test]
    fn test_mismatched_key_returns_different_secret() {
        let alice = generate_keypair().unwrap();
        let mallory = generate_keypair().unwrap();

        let encapsulation = encapsulate(alice.public.as_bytes()).unwrap();
        let wrong = decapsulate(mallory.secret.as_bytes(), &encapsulation.ciphertext).unwrap();

        assert_ne!(wrong.as_bytes(), encapsulation.shared_secret.as_bytes());
    }

    #[test]
    fn test_deterministic_seeds() {
        let (sk1, pk1) = keypair_from_seeds(&[1u8; 32], &[2u8; 32]).unwrap();
        let (sk2, pk2) = keypair_from_seeds(&[1u8; 32], &[2u8; 32]).unwrap();
        let (_, pk3) = keypair_from_seeds(&[3u8; 32], &[2u8; 32]).unwrap();

        assert_eq!(*sk1, *sk2);
        assert_eq!(pk1, pk2);
        assert_ne!(pk1, pk3);
    }

    #[test]
    fn test_injected_rng_is_deterministic() {
        let pair = generate_keypair_with_rng(&mut StdRng::seed_from_u64(1)).unwrap();

        let a = encapsulate_with_rng(pair.public.as_bytes(), &mut StdRng::seed_from_u64(2)).unwrap();
        let b = encapsulate_with_rng(pair.public.as_bytes(), &mut StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(a.ciphertext, b.ciphertext);
        assert_eq!(a.shared_secret.as_bytes(), b.shared_secret.as_bytes());
    }

    #[test]
    fn test_encapsulate_rejects_wrong_length() {
        let result = encapsulate(&[0u8; MLKEM_PUBLIC_KEY_SIZE - 1]);
        assert!(matches!(
            result,
            Err(Error::InvalidKeyLength { expected: 1184, actual: 1183, .. })
        ));
    }

    #[test]
    fn test_decapsulate_rejects_wrong_lengths() {
        let pair = generate_keypair().unwrap();
        let encapsulation = encapsulate(pair.public.as_bytes()).unwrap();

        assert!(matches!(
            decapsulate(&pair.secret.as_bytes()[1..], &encapsulation.ciphertext),
            Err(Error::InvalidKeyLength { expected: 2400, actual: 2399, .. })
        ));
        assert!(matches!(
            decapsulate(pair.secret.as_bytes(), &encapsulation.ciphertext[1..]),
            Err(Error::InvalidCiphertextLength { expected: 1088, actual: 1087 })
        ));
    }
}
