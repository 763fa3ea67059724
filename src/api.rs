//! # String Boundary
//!
//! Hex- and JSON-string entry points for front-end collaborators (CLI,
//! archive packager, host loader). Each function is a thin adapter over the
//! typed API; this is the only place where the colon-joined encodings
//! `secret_hex:public_hex` and `shared_secret_hex:ciphertext_hex` appear.
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`derive_hybrid_keypair`] | seed hex | `secret_hex:public_hex` |
//! | [`hybrid_generate_keypair`] / [`pq_generate_keypair`] | - | `secret_hex:public_hex` |
//! | [`hybrid_encapsulate`] / [`pq_encapsulate`] | public hex | `shared_secret_hex:ciphertext_hex` |
//! | [`hybrid_decapsulate`] / [`pq_decapsulate`] | secret hex, ciphertext hex | shared secret hex |
//! | [`encrypt_document_for_recipient`] | plaintext JSON, public hex | document JSON |
//! | [`encrypt_document_with_key`] | plaintext JSON, data key hex | document JSON |
//! | [`decrypt_document`] | document JSON, secret hex | plaintext JSON |
//! | [`unwrap_data_key`] | document JSON, secret hex | data key hex |
//! | [`verify_document_integrity`] | document JSON, data key hex | status string |
//! | [`encrypt_binary`] / [`decrypt_binary`] | bytes, key hex | bytes |

use serde_json::Value;

use crate::binary;
use crate::crypto::{self, hybrid, pq, DataKey, KeyPair, PublicKey, SecretKey};
use crate::document::{self, DocumentConfig, EncryptedDocument, IntegrityStatus};
use crate::error::{Error, Result};

fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).map_err(|e| Error::InvalidKeyEncoding(format!("{} is not hex: {}", what, e)))
}

fn parse_plaintext(plaintext_json: &str) -> Result<Value> {
    serde_json::from_str(plaintext_json)
        .map_err(|e| Error::MalformedDocument(format!("plaintext is not JSON: {}", e)))
}

fn encoded_pair(pair: KeyPair) -> String {
    pair.to_encoded().to_string()
}

// ============================================================================
// KEYS & KEM
// ============================================================================

/// Derive a hybrid keypair from a 32-byte hex seed
pub fn derive_hybrid_keypair(seed_hex: &str) -> Result<String> {
    crypto::derive_hybrid_keypair(seed_hex).map(encoded_pair)
}

/// Generate a random hybrid keypair
pub fn hybrid_generate_keypair() -> Result<String> {
    hybrid::generate_keypair().map(encoded_pair)
}

/// Encapsulate for a hybrid public key (1216 bytes hex)
pub fn hybrid_encapsulate(public_hex: &str) -> Result<String> {
    let public = decode_hex("public key", public_hex)?;
    Ok(hybrid::encapsulate(&public)?.to_encoded().to_string())
}

/// Decapsulate with a hybrid secret key; returns the shared secret hex
pub fn hybrid_decapsulate(secret_hex: &str, ciphertext_hex: &str) -> Result<String> {
    let secret = zeroize::Zeroizing::new(decode_hex("secret key", secret_hex)?);
    let ciphertext = decode_hex("ciphertext", ciphertext_hex)?;
    Ok(hybrid::decapsulate(&secret, &ciphertext)?.to_hex().to_string())
}

/// Generate a random ML-KEM-768 keypair
pub fn pq_generate_keypair() -> Result<String> {
    pq::generate_keypair().map(encoded_pair)
}

/// Encapsulate for an ML-KEM-768 public key (1184 bytes hex)
pub fn pq_encapsulate(public_hex: &str) -> Result<String> {
    let public = decode_hex("public key", public_hex)?;
    Ok(pq::encapsulate(&public)?.to_encoded().to_string())
}

/// Decapsulate with an ML-KEM-768 secret key; returns the shared secret hex
pub fn pq_decapsulate(secret_hex: &str, ciphertext_hex: &str) -> Result<String> {
    let secret = zeroize::Zeroizing::new(decode_hex("secret key", secret_hex)?);
    let ciphertext = decode_hex("ciphertext", ciphertext_hex)?;
    Ok(pq::decapsulate(&secret, &ciphertext)?.to_hex().to_string())
}

/// Key and ciphertext sizes of every mode, as JSON
pub fn kem_sizes() -> Result<String> {
    Ok(serde_json::to_string(&crypto::kem_sizes())?)
}

// ============================================================================
// DOCUMENTS
// ============================================================================

/// Encrypt a plaintext JSON object under a caller-supplied data key
pub fn encrypt_document_with_key(plaintext_json: &str, data_key_hex: &str) -> Result<String> {
    let plaintext = parse_plaintext(plaintext_json)?;
    let data_key = DataKey::from_hex(data_key_hex)?;
    document::encrypt_with_data_key(&plaintext, &data_key, &DocumentConfig::default())?.to_json_pretty()
}

/// Encrypt a plaintext JSON object for a hybrid or ML-KEM-only public key
pub fn encrypt_document_for_recipient(plaintext_json: &str, public_hex: &str) -> Result<String> {
    encrypt_document_with_config(plaintext_json, &[public_hex], &DocumentConfig::default())
}

/// Encrypt for several recipients with explicit settings
pub fn encrypt_document_with_config(
    plaintext_json: &str,
    public_hexes: &[&str],
    config: &DocumentConfig,
) -> Result<String> {
    let plaintext = parse_plaintext(plaintext_json)?;
    let recipients = public_hexes
        .iter()
        .map(|public_hex| PublicKey::from_hex(public_hex))
        .collect::<Result<Vec<_>>>()?;
    document::encrypt_for_recipients(&plaintext, &recipients, config)?.to_json_pretty()
}

/// Unwrap, verify and decrypt; returns the plaintext JSON
pub fn decrypt_document(document_json: &str, secret_hex: &str) -> Result<String> {
    let document = EncryptedDocument::parse(document_json)?;
    let secret = SecretKey::from_hex(secret_hex)?;
    Ok(serde_json::to_string_pretty(&document::decrypt(&document, &secret)?)?)
}

/// Like [`decrypt_document`] but keeps the `sops` metadata block
pub fn decrypt_document_content(document_json: &str, secret_hex: &str) -> Result<String> {
    let document = EncryptedDocument::parse(document_json)?;
    let secret = SecretKey::from_hex(secret_hex)?;
    let content = document.unwrap_key(&secret)?.verify()?.decrypt_content()?;
    Ok(serde_json::to_string_pretty(&content)?)
}

/// Recover only the data key, hex encoded
pub fn unwrap_data_key(document_json: &str, secret_hex: &str) -> Result<String> {
    let document = EncryptedDocument::parse(document_json)?;
    let secret = SecretKey::from_hex(secret_hex)?;
    Ok(document::unwrap_data_key(&document, &secret)?.to_hex().to_string())
}

/// `"Integrity check Passed"` or `"Integrity check Failed: <reason>"`
///
/// Never fails: a document that does not parse or a malformed key is
/// reported as a failed check.
pub fn verify_document_integrity(document_json: &str, data_key_hex: &str) -> String {
    let status = EncryptedDocument::parse(document_json)
        .and_then(|document| {
            let data_key = DataKey::from_hex(data_key_hex)?;
            Ok(document::verify_integrity(&document, &data_key))
        })
        .unwrap_or_else(|e| IntegrityStatus::Failed(e.to_string()));
    status.to_string()
}

/// Structural summary of an encrypted document, as JSON
pub fn inspect_document(document_json: &str) -> Result<String> {
    let summary = EncryptedDocument::parse(document_json)?.inspect()?;
    Ok(serde_json::to_string_pretty(&summary)?)
}

// ============================================================================
// BINARY
// ============================================================================

/// Encrypt raw bytes for a hybrid or ML-KEM-only public key
pub fn encrypt_binary(payload: &[u8], public_hex: &str) -> Result<Vec<u8>> {
    binary::encrypt_binary(payload, &PublicKey::from_hex(public_hex)?)
}

/// Decrypt a binary container
pub fn decrypt_binary(container: &[u8], secret_hex: &str) -> Result<Vec<u8>> {
    binary::decrypt_binary(container, &SecretKey::from_hex(secret_hex)?)
}

// ============================================================================
// TESTS
// ============================================================================
