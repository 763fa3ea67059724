//! # Document Metadata
//!
//! The `sops` block stored next to the encrypted tree.
//!
//! ```text
//! "sops": {
//!   "pq": [ RecipientStanza, ... ],     one wrapped data key per recipient
//!   "lastmodified": "<RFC 3339>",
//!   "mac": "<HMAC-SHA256 hex>",
//!   "unencrypted_suffix": "<suffix>",   only when configured
//!   "version": "rabbitlock-1"
//! }
//! ```

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::crypto::encryption::{open, seal_with_rng, DataKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::crypto::{decapsulate_with, encapsulate_for_with_rng, KeyKind, PublicKey, SecretKey};
use crate::error::{Error, Result};

/// Top-level key holding the metadata block
pub const METADATA_KEY: &str = "sops";

/// Format version written by this crate
pub const FORMAT_VERSION: &str = "rabbitlock-1";

/// Hex length of a wrapped data key: nonce ∥ ciphertext ∥ tag
const WRAPPED_KEY_HEX_LEN: usize = 2 * (NONCE_SIZE + KEY_SIZE + TAG_SIZE);

/// Hex length of the aggregate MAC
const MAC_HEX_LEN: usize = 64;

/// The data key wrapped for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientStanza {
    /// KEM used for this recipient
    pub kem: KeyKind,
    /// SHA-256 fingerprint of the recipient public key (informational)
    pub recipient: String,
    /// KEM ciphertext, hex
    pub enc: String,
    /// `seal(shared_secret, data_key, aad = kem ciphertext)`, hex
    pub wrapped_key: String,
}

impl RecipientStanza {
    /// Encapsulate for `recipient` and wrap the data key under the result
    pub fn wrap<R: CryptoRngCore>(
        data_key: &DataKey,
        recipient: &PublicKey,
        rng: &mut R,
    ) -> Result<Self> {
        let encapsulation = encapsulate_for_with_rng(recipient, rng)?;
        let wrapped = seal_with_rng(
            encapsulation.shared_secret.as_bytes(),
            data_key.as_bytes(),
            &encapsulation.ciphertext,
            rng,
        )?;

        Ok(Self {
            kem: recipient.kind(),
            recipient: recipient.fingerprint(),
            enc: hex::encode(&encapsulation.ciphertext),
            wrapped_key: hex::encode(wrapped),
        })
    }

    /// Recover the data key with a secret key of the same kind
    ///
    /// Any failure is reported as `AuthenticationFailed`; the caller decides
    /// whether to try the next stanza.
    pub fn unwrap(&self, secret: &SecretKey) -> Result<DataKey> {
        let ciphertext = hex::decode(&self.enc).map_err(|_| Error::AuthenticationFailed)?;
        let wrapped = hex::decode(&self.wrapped_key).map_err(|_| Error::AuthenticationFailed)?;

        let shared = decapsulate_with(secret, &ciphertext)?;
        let data_key = zeroize::Zeroizing::new(open(shared.as_bytes(), &wrapped, &ciphertext)?);
        DataKey::from_slice(&data_key)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let expected_enc = 2 * self.kem.ciphertext_size();
        let bad = |what: &str| {
            Error::MalformedDocument(format!("recipient entry {}: {}", index, what))
        };

        if self.enc.len() != expected_enc || hex::decode(&self.enc).is_err() {
            return Err(bad("enc is not a KEM ciphertext of the declared kind"));
        }
        if self.wrapped_key.len() != WRAPPED_KEY_HEX_LEN || hex::decode(&self.wrapped_key).is_err() {
            return Err(bad("wrapped_key is not a sealed 32-byte key"));
        }
        Ok(())
    }
}

/// The `sops` metadata block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    /// Wrapped data keys, one per recipient
    #[serde(default)]
    pub pq: Vec<RecipientStanza>,
    /// Time of the last encryption, RFC 3339
    pub lastmodified: String,
    /// Aggregate HMAC-SHA256 over the document, hex
    pub mac: String,
    /// Suffix of keys left in plaintext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unencrypted_suffix: Option<String>,
    /// Format version
    pub version: String,
}

impl Metadata {
    /// Check every field the codec relies on
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(Error::MalformedDocument(format!(
                "unsupported version {:?}",
                self.version
            )));
        }
        if self.lastmodified.is_empty() {
            return Err(Error::MalformedDocument("lastmodified is empty".into()));
        }
        if self.mac.len() != MAC_HEX_LEN || hex::decode(&self.mac).is_err() {
            return Err(Error::MalformedDocument("mac is not 32 bytes of hex".into()));
        }
        for (index, stanza) in self.pq.iter().enumerate() {
            stanza.validate(index)?;
        }
        Ok(())
    }

    /// Try every stanza of the secret key's kind in order; first open wins
    pub fn unwrap_data_key(&self, secret: &SecretKey) -> Result<DataKey> {
        let kind = secret.kind();
        let mut attempted = 0;

        for (index, stanza) in self.pq.iter().enumerate().filter(|(_, s)| s.kem == kind) {
            attempted += 1;
            match stanza.unwrap(secret) {
                Ok(data_key) => {
                    tracing::debug!("Unwrapped data key from recipient entry {}", index);
                    return Ok(data_key);
                }
                Err(e) => tracing::debug!("Recipient entry {} did not open: {}", index, e.kind()),
            }
        }

        tracing::warn!(
            "No {} recipient entry opened ({} tried)",
            kind.algorithm(),
            attempted
        );
        Err(Error::KeyUnwrapFailed(if attempted == 0 {
            format!("no recipient entry for a {} key", kind.algorithm())
        } else {
            "no recipient entry could be opened with this key".into()
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{hybrid, pq};

    fn metadata(pq: Vec<RecipientStanza>) -> Metadata {
        Metadata {
            pq,
            lastmodified: "2026-10-16T12:00:00Z".into(),
            mac: "00".repeat(32),
            unencrypted_suffix: None,
            version: FORMAT_VERSION.into(),
        }
    }

    #[test]
    fn test_wrap_unwrap_hybrid() {
        let pair = hybrid::generate_keypair().unwrap();
        let data_key = DataKey::generate().unwrap();

        let stanza = RecipientStanza::wrap(&data_key, &pair.public, &mut rand::rngs::OsRng).unwrap();
        assert_eq!(stanza.kem, KeyKind::Hybrid);
        assert_eq!(stanza.recipient, pair.public.fingerprint());
        assert_eq!(stanza.enc.len(), 2 * 1120);

        let recovered = stanza.unwrap(&pair.secret).unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());
    }

    #[test]
    fn test_unwrap_tries_entries_in_order() {
        let alice = pq::generate_keypair().unwrap();
        let bob = pq::generate_keypair().unwrap();
        let data_key = DataKey::generate().unwrap();
        let mut rng = rand::rngs::OsRng;

        let meta = metadata(vec![
            RecipientStanza::wrap(&data_key, &alice.public, &mut rng).unwrap(),
            RecipientStanza::wrap(&data_key, &bob.public, &mut rng).unwrap(),
        ]);
        meta.validate().unwrap();

        let recovered = meta.unwrap_data_key(&bob.secret).unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());
    }

    #[test]
    fn test_unwrap_without_matching_kind() {
        let pq_pair = pq::generate_keypair().unwrap();
        let hybrid_pair = hybrid::generate_keypair().unwrap();
        let data_key = DataKey::generate().unwrap();

        let meta = metadata(vec![RecipientStanza::wrap(
            &data_key,
            &pq_pair.public,
            &mut rand::rngs::OsRng,
        )
        .unwrap()]);

        assert!(matches!(
            meta.unwrap_data_key(&hybrid_pair.secret),
            Err(Error::KeyUnwrapFailed(_))
        ));
    }

    #[test]
    fn test_tampered_wrapped_key_fails() {
        let pair = hybrid::generate_keypair().unwrap();
        let data_key = DataKey::generate().unwrap();

        let mut stanza =
            RecipientStanza::wrap(&data_key, &pair.public, &mut rand::rngs::OsRng).unwrap();
        let flipped = if stanza.wrapped_key.starts_with('0') { "1" } else { "0" };
        stanza.wrapped_key.replace_range(0..1, flipped);

        let meta = metadata(vec![stanza]);
        meta.validate().unwrap();
        assert!(matches!(
            meta.unwrap_data_key(&pair.secret),
            Err(Error::KeyUnwrapFailed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut meta = metadata(vec![]);
        meta.version = "sops-3".into();
        assert!(matches!(meta.validate(), Err(Error::MalformedDocument(_))));

        let mut meta = metadata(vec![]);
        meta.mac = "abc".into();
        assert!(matches!(meta.validate(), Err(Error::MalformedDocument(_))));

        let mut stanza = RecipientStanza {
            kem: KeyKind::PostQuantum,
            recipient: String::new(),
            enc: "00".repeat(1088),
            wrapped_key: "00".repeat(60),
        };
        metadata(vec![stanza.clone()]).validate().unwrap();

        stanza.enc = "00".repeat(1120);
        assert!(matches!(
            metadata(vec![stanza]).validate(),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_value(metadata(vec![])).unwrap();

        assert_eq!(json["version"], "rabbitlock-1");
        assert!(json["pq"].as_array().unwrap().is_empty());
        assert!(json.get("unencrypted_suffix").is_none());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut json = serde_json::to_value(metadata(vec![])).unwrap();
        json["injected"] = "attacker".into();
        assert!(serde_json::from_value::<Metadata>(json).is_err());

        let stanza = serde_json::json!({
            "kem": "mlkem768",
            "recipient": "",
            "enc": "00".repeat(1088),
            "wrapped_key": "00".repeat(60),
        });
        serde_json::from_value::<RecipientStanza>(stanza.clone()).unwrap();

        let mut extended = stanza;
        extended["note"] = "hi".into();
        assert!(serde_json::from_value::<RecipientStanza>(extended).is_err());
    }
}
