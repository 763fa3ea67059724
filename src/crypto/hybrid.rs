//! # Hybrid KEM Engine
//!
//! X25519 and ML-KEM-768 run side by side, and their two secrets are folded
//! into one with HKDF (see [`kdf::combine_hybrid_secrets`]).
//!
//! ## Encapsulation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      HYBRID ENCAPSULATION                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  recipient public (1216) = [ x25519_pk (32) | mlkem_ek (1184) ]         │
//! │                                                                         │
//! │  ephemeral X25519 secret ──► eph_pk                                     │
//! │  ss_x25519 = DH(eph_sk, x25519_pk)                                      │
//! │  (ss_mlkem, ct_mlkem) = ML-KEM.Encaps(mlkem_ek)                         │
//! │                                                                         │
//! │  shared    = combine(ss_mlkem, ss_x25519, eph_pk, x25519_pk)            │
//! │  ciphertext (1120) = [ ct_mlkem (1088) | eph_pk (32) ]                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decapsulation splits key and ciphertext at the same fixed offsets and
//! recomputes both halves. A key that does not match the ciphertext still
//! produces a value; the caller finds out through the AEAD tag it guards.

use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use super::kdf::{self, combine_hybrid_secrets};
use super::keys::{Encapsulation, KeyPair, PublicKey, SecretKey, SharedSecret};
use super::pq;
use super::{
    HYBRID_CIPHERTEXT_SIZE, HYBRID_PUBLIC_KEY_SIZE, HYBRID_SECRET_KEY_SIZE, MLKEM_CIPHERTEXT_SIZE,
    SEED_SIZE, X25519_PUBLIC_KEY_SIZE, X25519_SECRET_KEY_SIZE,
};
use crate::error::{Error, Result};

/// Concatenate the classical and post-quantum halves into one keypair
fn assemble_keypair(x25519_secret: StaticSecret, mlkem_secret: &[u8], mlkem_public: &[u8]) -> Result<KeyPair> {
    let x25519_public = X25519PublicKey::from(&x25519_secret);

    let mut secret = Zeroizing::new(Vec::with_capacity(HYBRID_SECRET_KEY_SIZE));
    secret.extend_from_slice(x25519_secret.as_bytes());
    secret.extend_from_slice(mlkem_secret);

    let mut public = Vec::with_capacity(HYBRID_PUBLIC_KEY_SIZE);
    public.extend_from_slice(x25519_public.as_bytes());
    public.extend_from_slice(mlkem_public);

    KeyPair::from_parts(&secret, &public)
}

fn random_x25519_secret<R: CryptoRngCore>(rng: &mut R) -> Result<StaticSecret> {
    let mut bytes = [0u8; X25519_SECRET_KEY_SIZE];
    rng.try_fill_bytes(&mut bytes)?;
    let secret = StaticSecret::from(bytes);
    bytes.zeroize();
    Ok(secret)
}

// ============================================================================
// KEY GENERATION
// ============================================================================

/// Deterministically derive a hybrid keypair from a hex-encoded 32-byte seed
///
/// The same seed always yields the same keypair, so callers can keep the
/// seed instead of the private key.
///
/// ## Errors
///
/// `InvalidSeedFormat` if the seed is not hex or not exactly 32 bytes.
///
/// ## Example
///
/// ```
/// use rabbitlock_crypto::crypto::derive_hybrid_keypair;
///
/// let seed = "11".repeat(32);
/// let a = derive_hybrid_keypair(&seed).unwrap();
/// let b = derive_hybrid_keypair(&seed).unwrap();
/// assert_eq!(a.public, b.public);
/// ```
pub fn derive_hybrid_keypair(seed_hex: &str) -> Result<KeyPair> {
    let seed = Zeroizing::new(
        hex::decode(seed_hex.trim())
            .map_err(|e| Error::InvalidSeedFormat(format!("seed is not hex: {}", e)))?,
    );
    let seed: Zeroizing<[u8; SEED_SIZE]> = Zeroizing::new(seed.as_slice().try_into().map_err(|_| {
        Error::InvalidSeedFormat(format!(
            "seed must be {} bytes, got {}",
            SEED_SIZE,
            seed.len()
        ))
    })?);

    let material = kdf::expand_seed(&seed)?;
    let (mlkem_secret, mlkem_public) = pq::keypair_from_seeds(&material.mlkem_d, &material.mlkem_z)?;
    let pair = assemble_keypair(
        StaticSecret::from(material.x25519_secret),
        &mlkem_secret,
        &mlkem_public,
    )?;

    tracing::debug!("Derived hybrid keypair from seed");
    Ok(pair)
}

/// Generate a new random hybrid keypair
pub fn generate_keypair() -> Result<KeyPair> {
    generate_keypair_with_rng(&mut OsRng)
}

/// Generate a new hybrid keypair from the supplied random source
pub fn generate_keypair_with_rng<R: CryptoRngCore>(rng: &mut R) -> Result<KeyPair> {
    let x25519_secret = random_x25519_secret(rng)?;
    let (mlkem_secret, mlkem_public) = pq::raw_keypair_with_rng(rng);
    assemble_keypair(x25519_secret, &mlkem_secret, &mlkem_public)
}

// ============================================================================
// ENCAPSULATION
// ============================================================================

/// Encapsulate a fresh shared secret for a hybrid public key (1216 bytes)
pub fn encapsulate(recipient_public: &[u8]) -> Result<Encapsulation> {
    encapsulate_with_rng(recipient_public, &mut OsRng)
}

/// Encapsulate with an injected random source
pub fn encapsulate_with_rng<R: CryptoRngCore>(
    recipient_public: &[u8],
    rng: &mut R,
) -> Result<Encapsulation> {
    if recipient_public.len() != HYBRID_PUBLIC_KEY_SIZE {
        return Err(Error::InvalidKeyLength {
            what: "hybrid public key",
            expected: HYBRID_PUBLIC_KEY_SIZE,
            actual: recipient_public.len(),
        });
    }
    let public = PublicKey::from_bytes(recipient_public)?;
    let (x25519_bytes, mlkem_public) = public.hybrid_parts().ok_or(Error::InvalidKeyLength {
        what: "hybrid public key",
        expected: HYBRID_PUBLIC_KEY_SIZE,
        actual: recipient_public.len(),
    })?;
    let recipient_x25519 = X25519PublicKey::from(x25519_bytes);

    let ephemeral = random_x25519_secret(rng)?;
    let ephemeral_public = X25519PublicKey::from(&ephemeral);
    let classical = ephemeral.diffie_hellman(&recipient_x25519);
    if !classical.was_contributory() {
        return Err(Error::InvalidKeyEncoding(
            "X25519 public key is a low-order point".into(),
        ));
    }

    let (mut mlkem_shared, mlkem_ciphertext) = pq::encapsulate_raw(mlkem_public, rng)?;
    let combined = combine_hybrid_secrets(
        &mlkem_shared,
        classical.as_bytes(),
        ephemeral_public.as_bytes(),
        recipient_x25519.as_bytes(),
    );
    mlkem_shared.zeroize();
    let combined = combined?;

    let mut ciphertext = Vec::with_capacity(HYBRID_CIPHERTEXT_SIZE);
    ciphertext.extend_from_slice(&mlkem_ciphertext);
    ciphertext.extend_from_slice(ephemeral_public.as_bytes());

    tracing::debug!("Hybrid encapsulation produced {} byte ciphertext", ciphertext.len());

    Ok(Encapsulation {
        shared_secret: SharedSecret::from_bytes(combined),
        ciphertext,
    })
}

// ============================================================================
// DECAPSULATION
// ============================================================================

/// Recover the shared secret with a hybrid secret key (2432 bytes)
///
/// Both lengths are checked before any cryptographic work runs.
///
/// ## Errors
///
/// - `InvalidKeyLength` if the secret key is not 2432 bytes
/// - `InvalidCiphertextLength` if the ciphertext is not 1120 bytes
pub fn decapsulate(secret_key: &[u8], ciphertext: &[u8]) -> Result<SharedSecret> {
    if secret_key.len() != HYBRID_SECRET_KEY_SIZE {
        return Err(Error::InvalidKeyLength {
            what: "hybrid secret key",
            expected: HYBRID_SECRET_KEY_SIZE,
            actual: secret_key.len(),
        });
    }
    if ciphertext.len() != HYBRID_CIPHERTEXT_SIZE {
        return Err(Error::InvalidCiphertextLength {
            expected: HYBRID_CIPHERTEXT_SIZE,
            actual: ciphertext.len(),
        });
    }

    let secret = SecretKey::from_bytes(secret_key)?;
    let (x25519_bytes, mlkem_secret) = secret.hybrid_parts().ok_or(Error::InvalidKeyLength {
        what: "hybrid secret key",
        expected: HYBRID_SECRET_KEY_SIZE,
        actual: secret_key.len(),
    })?;
    let x25519_secret = StaticSecret::from(x25519_bytes);
    let recipient_public = X25519PublicKey::from(&x25519_secret);

    let (mlkem_ciphertext, ephemeral_bytes) = ciphertext.split_at(MLKEM_CIPHERTEXT_SIZE);
    let ephemeral_bytes: [u8; X25519_PUBLIC_KEY_SIZE] =
        ephemeral_bytes
            .try_into()
            .map_err(|_| Error::InvalidCiphertextLength {
                expected: HYBRID_CIPHERTEXT_SIZE,
                actual: ciphertext.len(),
            })?;
    let ephemeral_public = X25519PublicKey::from(ephemeral_bytes);

    let classical = x25519_secret.diffie_hellman(&ephemeral_public);
    let mut mlkem_shared = pq::decapsulate_raw(mlkem_secret, mlkem_ciphertext)?;

    let combined = combine_hybrid_secrets(
        &mlkem_shared,
        classical.as_bytes(),
        ephemeral_public.as_bytes(),
        recipient_public.as_bytes(),
    );
    mlkem_shared.zeroize();

    combined.map(SharedSecret::from_bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyKind;
    use rand::{rngs::StdRng, SeedableRng};

    fn seed_0x11() -> String {
        "11".repeat(32)
    }

    #[test]
    fn test_derive_hybrid_keypair_sizes() {
        let pair = derive_hybrid_keypair(&seed_0x11()).unwrap();

        assert_eq!(pair.kind(), KeyKind::Hybrid);
        assert_eq!(pair.secret.as_bytes().len(), HYBRID_SECRET_KEY_SIZE);
        assert_eq!(pair.public.as_bytes().len(), HYBRID_PUBLIC_KEY_SIZE);
    }

    #[test]
    fn test_derive_hybrid_keypair_deterministic() {
        let a = derive_hybrid_keypair(&seed_0x11()).unwrap();
        let b = derive_hybrid_keypair(&seed_0x11()).unwrap();

        assert_eq!(a.public, b.public);
        assert_eq!(a.secret.as_bytes(), b.secret.as_bytes());
        assert_eq!(*a.to_encoded(), *b.to_encoded());
    }

    #[test]
    fn test_derive_hybrid_keypair_trims_whitespace() {
        let a = derive_hybrid_keypair(&seed_0x11()).unwrap();
        let b = derive_hybrid_keypair(&format!("  {}\n", seed_0x11())).unwrap();
        assert_eq!(a.public, b.public);
    }

    #[test]
    fn test_different_seeds_different_keypairs() {
        let a = derive_hybrid_keypair(&seed_0x11()).unwrap();
        let b = derive_hybrid_keypair(&"22".repeat(32)).unwrap();

        assert_ne!(a.public, b.public);
        assert_ne!(a.secret.as_bytes(), b.secret.as_bytes());
    }

    #[test]
    fn test_derive_rejects_bad_seeds() {
        assert!(matches!(
            derive_hybrid_keypair("not hex"),
            Err(Error::InvalidSeedFormat(_))
        ));
        assert!(matches!(
            derive_hybrid_keypair(&"11".repeat(31)),
            Err(Error::InvalidSeedFormat(_))
        ));
        assert!(matches!(
            derive_hybrid_keypair(&"11".repeat(33)),
            Err(Error::InvalidSeedFormat(_))
        ));
    }

    #[test]
    fn test_encapsulate_decapsulate_round_trip() {
        let pair = generate_keypair().unwrap();

        let encapsulation = encapsulate(pair.public.as_bytes()).unwrap();
        assert_eq!(encapsulation.ciphertext.len(), HYBRID_CIPHERTEXT_SIZE);

        let recovered = decapsulate(pair.secret.as_bytes(), &encapsulation.ciphertext).unwrap();
        assert_eq!(recovered.as_bytes(), encapsulation.shared_secret.as_bytes());
    }

    #[test]
    fn test_seed_derived_round_trip() {
        let pair = derive_hybrid_keypair(&seed_0x11()).unwrap();

        let encapsulation = encapsulate(pair.public.as_bytes()).unwrap();
        let recovered = decapsulate(pair.secret.as_bytes(), &encapsulation.ciphertext).unwrap();

        assert_eq!(recovered.as_bytes(), encapsulation.shared_secret.as_bytes());
    }

    #[test]
    fn test_ciphertext_ends_with_ephemeral_public() {
        let pair = generate_keypair().unwrap();
        let a = encapsulate(pair.public.as_bytes()).unwrap();
        let b = encapsulate(pair.public.as_bytes()).unwrap();

        assert_ne!(
            a.ciphertext[MLKEM_CIPHERTEXT_SIZE..],
            b.ciphertext[MLKEM_CIPHERTEXT_SIZE..]
        );
        assert_ne!(a.shared_secret.as_bytes(), b.shared_secret.as_bytes());
    }

    #[test]
    fn test_injected_rng_is_deterministic() {
        let pair = generate_keypair_with_rng(&mut StdRng::seed_from_u64(7)).unwrap();
        let again = generate_keypair_with_rng(&mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(pair.public, again.public);

        let a = encapsulate_with_rng(pair.public.as_bytes(), &mut StdRng::seed_from_u64(8)).unwrap();
        let b = encapsulate_with_rng(pair.public.as_bytes(), &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.ciphertext, b.ciphertext);
        assert_eq!(a.shared_secret.as_bytes(), b.shared_secret.as_bytes());
    }

    #[test]
    fn test_secret_key_one_byte_short_fails() {
        let pair = generate_keypair().unwrap();
        let encapsulation = encapsulate(pair.public.as_bytes()).unwrap();

        let short = &pair.secret.as_bytes()[..HYBRID_SECRET_KEY_SIZE - 1];
        let result = decapsulate(short, &encapsulation.ciphertext);

        assert_eq!(
            result.unwrap_err(),
            Error::InvalidKeyLength {
                what: "hybrid secret key",
                expected: 2432,
                actual: 2431,
            }
        );
    }

    #[test]
    fn test_wrong_ciphertext_length_fails() {
        let pair = generate_keypair().unwrap();
        let result = decapsulate(pair.secret.as_bytes(), &[0u8; MLKEM_CIPHERTEXT_SIZE]);

        assert!(matches!(
            result,
            Err(Error::InvalidCiphertextLength { expected: 1120, actual: 1088 })
        ));
    }

    #[test]
    fn test_wrong_public_key_length_fails() {
        let pair = pq::generate_keypair().unwrap();
        let result = encapsulate(pair.public.as_bytes());

        assert!(matches!(
            result,
            Err(Error::InvalidKeyLength { expected: 1216, actual: 1184, .. })
        ));
    }

    #[test]
    fn test_mismatched_key_returns_different_secret() {
        let alice = derive_hybrid_keypair(&seed_0x11()).unwrap();
        let bob = derive_hybrid_keypair(&"22".repeat(32)).unwrap();

        let encapsulation = encapsulate(alice.public.as_bytes()).unwrap();
        let wrong = decapsulate(bob.secret.as_bytes(), &encapsulation.ciphertext).unwrap();

        assert_ne!(wrong.as_bytes(), encapsulation.shared_secret.as_bytes());
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        let pair = generate_keypair().unwrap();
        let mut public = pair.public.as_bytes().to_vec();
        public[..X25519_PUBLIC_KEY_SIZE].fill(0);

        assert!(matches!(
            encapsulate(&public),
            Err(Error::InvalidKeyEncoding(_))
        ));
    }
}
