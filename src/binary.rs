//! # Raw Binary Container
//!
//! Single-payload variant of the wrap-then-seal pattern: no tree walk and
//! no document MAC, the KEM shared secret itself is the one-shot AEAD key.
//!
//! ```text
//! ┌───────┬─────────┬──────┬──────────────────┬───────────┬────────────┬──────────┐
//! │ "RLB" │ version │ mode │ KEM ciphertext   │ nonce(12) │ ciphertext │ tag (16) │
//! │  3 B  │  0x01   │ 1 B  │ 1120 B / 1088 B  │           │            │          │
//! └───────┴─────────┴──────┴──────────────────┴───────────┴────────────┴──────────┘
//!   mode: 0x01 = X25519 + ML-KEM-768, 0x02 = ML-KEM-768 only
//!   AAD:  header ∥ KEM ciphertext
//! ```

use rand::rngs::OsRng;
use rand_core::CryptoRngCore;

use crate::crypto::encryption::{open, seal_with_rng, NONCE_SIZE, TAG_SIZE};
use crate::crypto::{decapsulate_with, encapsulate_for_with_rng, KeyKind, PublicKey, SecretKey};
use crate::error::{Error, Result};

/// Container magic bytes
pub const MAGIC: &[u8; 3] = b"RLB";

/// Container format version
pub const CONTAINER_VERSION: u8 = 0x01;

/// Magic, version and mode
pub const HEADER_SIZE: usize = MAGIC.len() + 2;

const MODE_HYBRID: u8 = 0x01;
const MODE_POST_QUANTUM: u8 = 0x02;

fn mode_byte(kind: KeyKind) -> u8 {
    match kind {
        KeyKind::Hybrid => MODE_HYBRID,
        KeyKind::PostQuantum => MODE_POST_QUANTUM,
    }
}

fn header(kind: KeyKind) -> [u8; HEADER_SIZE] {
    [MAGIC[0], MAGIC[1], MAGIC[2], CONTAINER_VERSION, mode_byte(kind)]
}

/// Smallest valid container for a KEM kind (empty payload)
pub fn min_container_size(kind: KeyKind) -> usize {
    HEADER_SIZE + kind.ciphertext_size() + NONCE_SIZE + TAG_SIZE
}

/// Read the KEM kind from a container header
///
/// ## Errors
///
/// - `InvalidCiphertextLength` if the header itself is truncated
/// - `MalformedDocument` for a wrong magic, version or mode byte
pub fn container_kind(container: &[u8]) -> Result<KeyKind> {
    if container.len() < HEADER_SIZE {
        return Err(Error::InvalidCiphertextLength {
            expected: HEADER_SIZE,
            actual: container.len(),
        });
    }
    if &container[..MAGIC.len()] != MAGIC {
        return Err(Error::MalformedDocument("not a binary container".into()));
    }
    if container[3] != CONTAINER_VERSION {
        return Err(Error::MalformedDocument(format!(
            "unsupported container version {}",
            container[3]
        )));
    }
    match container[4] {
        MODE_HYBRID => Ok(KeyKind::Hybrid),
        MODE_POST_QUANTUM => Ok(KeyKind::PostQuantum),
        other => Err(Error::MalformedDocument(format!(
            "unknown container mode {:#04x}",
            other
        ))),
    }
}

/// Encrypt a payload for a hybrid or ML-KEM-only public key
pub fn encrypt_binary(payload: &[u8], recipient: &PublicKey) -> Result<Vec<u8>> {
    encrypt_binary_with_rng(payload, recipient, &mut OsRng)
}

/// [`encrypt_binary`] with an injected random source
pub fn encrypt_binary_with_rng<R: CryptoRngCore>(
    payload: &[u8],
    recipient: &PublicKey,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let kind = recipient.kind();
    let encapsulation = encapsulate_for_with_rng(recipient, rng)?;

    let mut aad = Vec::with_capacity(HEADER_SIZE + encapsulation.ciphertext.len());
    aad.extend_from_slice(&header(kind));
    aad.extend_from_slice(&encapsulation.ciphertext);

    let sealed = seal_with_rng(encapsulation.shared_secret.as_bytes(), payload, &aad, rng)?;

    let mut container = aad;
    container.extend_from_slice(&sealed);

    tracing::debug!(
        "Sealed {} byte payload into {} container",
        payload.len(),
        kind.algorithm()
    );
    Ok(container)
}

/// Decrypt a container with the matching secret key
///
/// ## Errors
///
/// - `MalformedDocument` for a wrong magic or version
/// - `InvalidCiphertextLength` if the container is truncated
/// - `InvalidKeyLength` if the key kind does not match the container mode
/// - `AuthenticationFailed` if the payload does not open under this key
pub fn decrypt_binary(container: &[u8], secret: &SecretKey) -> Result<Vec<u8>> {
    let kind = container_kind(container)?;
    if kind != secret.kind() {
        return Err(Error::InvalidKeyLength {
            what: "secret key",
            expected: kind.secret_key_size(),
            actual: secret.as_bytes().len(),
        });
    }

    let minimum = min_container_size(kind);
    if container.len() < minimum {
        return Err(Error::InvalidCiphertextLength {
            expected: minimum,
            actual: container.len(),
        });
    }

    let (aad, sealed) = container.split_at(HEADER_SIZE + kind.ciphertext_size());
    let shared = decapsulate_with(secret, &aad[HEADER_SIZE..])?;

    open(shared.as_bytes(), sealed, aad).map_err(|e| {
        tracing::warn!("Binary container failed authentication");
        e
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_hybrid_keypair, hybrid, pq};

    #[test]
    fn test_hybrid_round_trip() {
        let pair = derive_hybrid_keypair(&"11".repeat(32)).unwrap();
        let payload = b"\x00\x01binary\xffpayload".to_vec();

        let container = encrypt_binary(&payload, &pair.public).unwrap();
        assert_eq!(&container[..5], b"RLB\x01\x01");
        assert_eq!(container.len(), min_container_size(KeyKind::Hybrid) + payload.len());

        assert_eq!(decrypt_binary(&container, &pair.secret).unwrap(), payload);
    }

    #[test]
    fn test_pq_round_trip() {
        let pair = pq::generate_keypair().unwrap();

        let container = encrypt_binary(b"pq only", &pair.public).unwrap();
        assert_eq!(container[4], 0x02);
        assert_eq!(container_kind(&container).unwrap(), KeyKind::PostQuantum);

        assert_eq!(decrypt_binary(&container, &pair.secret).unwrap(), b"pq only");
    }

    #[test]
    fn test_empty_payload() {
        let pair = hybrid::generate_keypair().unwrap();
        let container = encrypt_binary(&[], &pair.public).unwrap();

        assert_eq!(container.len(), min_container_size(KeyKind::Hybrid));
        assert!(decrypt_binary(&container, &pair.secret).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let alice = hybrid::generate_keypair().unwrap();
        let bob = hybrid::generate_keypair().unwrap();
        let container = encrypt_binary(b"for alice", &alice.public).unwrap();

        assert_eq!(
            decrypt_binary(&container, &bob.secret).unwrap_err(),
            Error::AuthenticationFailed
        );
    }

    #[test]
    fn test_mode_mismatch_is_key_length_error() {
        let hybrid_pair = hybrid::generate_keypair().unwrap();
        let pq_pair = pq::generate_keypair().unwrap();
        let container = encrypt_binary(b"x", &hybrid_pair.public).unwrap();

        assert!(matches!(
            decrypt_binary(&container, &pq_pair.secret),
            Err(Error::InvalidKeyLength { expected: 2432, actual: 2400, .. })
        ));
    }

    #[test]
    fn test_tampering_detected() {
        let pair = hybrid::generate_keypair().unwrap();
        let container = encrypt_binary(b"payload", &pair.public).unwrap();

        // KEM ciphertext start, ephemeral key end, tag, ciphertext
        for index in [HEADER_SIZE, HEADER_SIZE + 1119, container.len() - 1, container.len() - 20] {
            let mut tampered = container.clone();
            tampered[index] ^= 0x01;
            assert_eq!(
                decrypt_binary(&tampered, &pair.secret).unwrap_err(),
                Error::AuthenticationFailed,
                "byte {} not covered",
                index
            );
        }
    }

    #[test]
    fn test_bad_header() {
        let pair = hybrid::generate_keypair().unwrap();
        let container = encrypt_binary(b"x", &pair.public).unwrap();

        let mut bad_magic = container.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            decrypt_binary(&bad_magic, &pair.secret),
            Err(Error::MalformedDocument(_))
        ));

        let mut bad_version = container.clone();
        bad_version[3] = 0x09;
        assert!(matches!(
            decrypt_binary(&bad_version, &pair.secret),
            Err(Error::MalformedDocument(_))
        ));

        let mut bad_mode = container;
        bad_mode[4] = 0x07;
        assert!(matches!(
            decrypt_binary(&bad_mode, &pair.secret),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_truncated_container() {
        let pair = hybrid::generate_keypair().unwrap();
        let container = encrypt_binary(b"x", &pair.public).unwrap();

        assert!(matches!(
            decrypt_binary(&container[..3], &pair.secret),
            Err(Error::InvalidCiphertextLength { expected: 5, actual: 3 })
        ));
        assert!(matches!(
            decrypt_binary(&container[..100], &pair.secret),
            Err(Error::InvalidCiphertextLength { .. })
        ));
    }
}
