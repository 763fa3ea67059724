//! # WASM Bindings
//!
//! WebAssembly bindings for the browser and Node host loader. Export names
//! match the JavaScript module the front ends already import.
//!
//! ## Available Functions
//!
//! - Keys: derive_hybrid_keypair
//! - Hybrid KEM: pq_generate_keypair, pq_encapsulate, pq_decapsulate
//! - ML-KEM only: pq_mlkem_generate_keypair, pq_mlkem_encapsulate, pq_mlkem_decapsulate
//! - Sizes: pq_get_sizes
//! - Documents: encrypt_sops_json, encrypt_sops_json_for_recipient, decrypt_and_verify_sops,
//!   decrypt_sops_content, decrypt_data_key, verify_sops_integrity, parse_and_verify_sops
//! - Binary: encrypt_binary_hybrid, decrypt_binary_hybrid

use wasm_bindgen::prelude::*;

use crate::api;
use crate::error::{Error, ErrorReport};

fn to_js(err: Error) -> JsValue {
    JsValue::from_str(&ErrorReport::from(err).to_string())
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Runs when the module is instantiated
///
/// Sets up the panic hook and tracing.
#[wasm_bindgen(start)]
pub fn rabbitlock_wasm_init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize tracing for wasm
    tracing_wasm::set_as_global_default();

    tracing::info!("rabbitlock-crypto v{} loaded", crate::version());
}

/// Get version
#[wasm_bindgen]
pub fn rabbitlock_wasm_version() -> String {
    crate::version().to_string()
}

// ============================================================================
// KEYS & KEM
// ============================================================================

/// Derive a hybrid keypair from a 32-byte hex seed
///
/// Returns: "secret_key_hex:public_key_hex"
#[wasm_bindgen]
pub fn derive_hybrid_keypair(seed_hex: &str) -> Result<String, JsValue> {
    api::derive_hybrid_keypair(seed_hex).map_err(to_js)
}

/// Generate a new hybrid keypair (X25519 + ML-KEM-768)
///
/// Returns: "secret_key_hex:public_key_hex"
#[wasm_bindgen]
pub fn pq_generate_keypair() -> Result<String, JsValue> {
    api::hybrid_generate_keypair().map_err(to_js)
}

/// Encapsulate a shared secret for a hybrid public key (1216 bytes hex)
///
/// Returns: "shared_secret_hex:ciphertext_hex"
#[wasm_bindgen]
pub fn pq_encapsulate(pub_key_hex: &str) -> Result<String, JsValue> {
    api::hybrid_encapsulate(pub_key_hex).map_err(to_js)
}

/// Decapsulate with a hybrid secret key (2432 bytes hex) and ciphertext (1120 bytes hex)
#[wasm_bindgen]
pub fn pq_decapsulate(secret_key_hex: &str, ciphertext_hex: &str) -> Result<String, JsValue> {
    api::hybrid_decapsulate(secret_key_hex, ciphertext_hex).map_err(to_js)
}

/// Generate a new ML-KEM-768 keypair (PQ-only)
#[wasm_bindgen]
pub fn pq_mlkem_generate_keypair() -> Result<String, JsValue> {
    api::pq_generate_keypair().map_err(to_js)
}

/// Encapsulate for an ML-KEM-768 public key (1184 bytes hex)
#[wasm_bindgen]
pub fn pq_mlkem_encapsulate(pub_key_hex: &str) -> Result<String, JsValue> {
    api::pq_encapsulate(pub_key_hex).map_err(to_js)
}

/// Decapsulate with an ML-KEM-768 secret key (2400 bytes hex)
#[wasm_bindgen]
pub fn pq_mlkem_decapsulate(secret_key_hex: &str, ciphertext_hex: &str) -> Result<String, JsValue> {
    api::pq_decapsulate(secret_key_hex, ciphertext_hex).map_err(to_js)
}

/// Key and ciphertext sizes as JSON
#[wasm_bindgen]
pub fn pq_get_sizes() -> Result<String, JsValue> {
    api::kem_sizes().map_err(to_js)
}

// ============================================================================
// DOCUMENTS
// ============================================================================

/// Encrypt a plaintext JSON object under a raw data key (hex)
#[wasm_bindgen]
pub fn encrypt_sops_json(plain_json: &str, data_key_hex: &str) -> Result<String, JsValue> {
    api::encrypt_document_with_key(plain_json, data_key_hex).map_err(to_js)
}

/// Encrypt a plaintext JSON object for a recipient public key (hex)
#[wasm_bindgen]
pub fn encrypt_sops_json_for_recipient(
    plain_json: &str,
    recipient_pubkey_hex: &str,
) -> Result<String, JsValue> {
    api::encrypt_document_for_recipient(plain_json, recipient_pubkey_hex).map_err(to_js)
}

/// Unwrap, verify and decrypt; returns the plaintext JSON
#[wasm_bindgen]
pub fn decrypt_and_verify_sops(json_input: &str, private_key: &str) -> Result<String, JsValue> {
    api::decrypt_document(json_input, private_key).map_err(to_js)
}

/// Decrypt and return the full document with the `sops` block kept
#[wasm_bindgen]
pub fn decrypt_sops_content(json_input: &str, private_key: &str) -> Result<String, JsValue> {
    api::decrypt_document_content(json_input, private_key).map_err(to_js)
}

/// Recover only the data key (hex)
#[wasm_bindgen]
pub fn decrypt_data_key(json_input: &str, private_key: &str) -> Result<String, JsValue> {
    api::unwrap_data_key(json_input, private_key).map_err(to_js)
}

/// Returns "Integrity check Passed" or "Integrity check Failed: <reason>"
#[wasm_bindgen]
pub fn verify_sops_integrity(json_input: &str, data_key_hex: &str) -> String {
    api::verify_document_integrity(json_input, data_key_hex)
}

/// Validate structure without a key; returns the summary JSON
#[wasm_bindgen]
pub fn parse_and_verify_sops(json_input: &str) -> Result<String, JsValue> {
    api::inspect_document(json_input).map_err(to_js)
}

// ============================================================================
// BINARY
// ============================================================================

/// Encrypt raw bytes for a recipient public key (hex)
#[wasm_bindgen]
pub fn encrypt_binary_hybrid(data: &[u8], recipient_pubkey_hex: &str) -> Result<Vec<u8>, JsValue> {
    api::encrypt_binary(data, recipient_pubkey_hex).map_err(to_js)
}

/// Decrypt a binary container with a secret key (hex)
#[wasm_bindgen]
pub fn decrypt_binary_hybrid(data: &[u8], secret_key_hex: &str) -> Result<Vec<u8>, JsValue> {
    api::decrypt_binary(data, secret_key_hex).map_err(to_js)
}
