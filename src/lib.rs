//! # RabbitLock Crypto
//!
//! A hybrid classical/post-quantum encryption engine for configuration
//! secrets at rest: JSON secrets documents and raw binary payloads.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       RABBITLOCK CORE MODULES                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────┐  ┌──────────────────────────┐  │
//! │  │          Document Codec             │  │     Binary Container     │  │
//! │  │                                     │  │                          │  │
//! │  │ - ENC[...] leaf markers             │  │ - "RLB" header           │  │
//! │  │ - Aggregate HMAC                    │  │ - One-shot KEM key       │  │
//! │  │ - Wrapped data keys                 │  │                          │  │
//! │  └──────────────────┬──────────────────┘  └────────────┬─────────────┘  │
//! │                     │                                  │                │
//! │                     └────────────────┬─────────────────┘                │
//! │                                      ▼                                  │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐    │
//! │  │  Key        │  │  Hybrid KEM │  │   PQ KEM    │  │    AEAD      │    │
//! │  │  Derivation │  │             │  │             │  │              │    │
//! │  │ - HKDF seed │  │ - X25519    │  │ - ML-KEM-768│  │ - AES-256-GCM│    │
//! │  │   expansion │  │ - ML-KEM-768│  │             │  │              │    │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └──────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key derivation, hybrid and ML-KEM engines, AEAD envelope
//! - [`document`] - SOPS-style secrets document codec
//! - [`binary`] - Raw binary container
//! - [`api`] - Hex/JSON string boundary for front ends
//! - `ffi` - wasm-bindgen exports (feature `wasm`)
//!
//! ## Quick Start
//!
//! ```
//! use rabbitlock_crypto::crypto::derive_hybrid_keypair;
//! use rabbitlock_crypto::document::{self, DocumentConfig};
//! use serde_json::json;
//!
//! let pair = derive_hybrid_keypair(&"11".repeat(32)).unwrap();
//! let plaintext = json!({"API_KEY": "abc", "DB_URL": "postgres://example"});
//!
//! let encrypted =
//!     document::encrypt_for_recipient(&plaintext, &pair.public, &DocumentConfig::default()).unwrap();
//! let decrypted = document::decrypt(&encrypted, &pair.secret).unwrap();
//!
//! assert_eq!(decrypted, plaintext);
//! ```
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Key Encapsulation (X25519 + ML-KEM-768)                      │
//! │  ────────────────────────────────────────────────                       │
//! │  The per-document data key is wrapped under a secret that stays        │
//! │  safe as long as either the classical or the lattice half holds.       │
//! │                                                                         │
//! │  Layer 2: Leaf Encryption (AES-256-GCM)                                │
//! │  ──────────────────────────────────────                                 │
//! │  Every scalar is sealed separately, bound to its path in the tree.     │
//! │                                                                         │
//! │  Layer 3: Document Integrity (HMAC-SHA256)                             │
//! │  ─────────────────────────────────────────                              │
//! │  One MAC over every node and the metadata. It is checked before any    │
//! │  leaf is decrypted, and a mismatch releases nothing.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod api;
pub mod binary;
pub mod crypto;
pub mod document;
pub mod error;

/// Platform-aware time utilities for native and WASM targets.
pub mod time;

#[cfg(feature = "wasm")]
pub mod ffi;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{DataKey, KeyKind, KeyPair, PublicKey, SecretKey, SharedSecret};
pub use document::{DocumentConfig, EncryptedDocument, IntegrityStatus};
pub use error::{Error, Result};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of the engine
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        #[cfg(target_arch = "wasm32")]
        target: "wasm32",
        #[cfg(all(not(target_arch = "wasm32"), target_os = "macos"))]
        target: "macos",
        #[cfg(all(not(target_arch = "wasm32"), target_os = "linux"))]
        target: "linux",
        #[cfg(all(not(target_arch = "wasm32"), target_os = "windows"))]
        target: "windows",
        #[cfg(not(any(
            target_os = "macos",
            target_os = "linux",
            target_os = "windows",
            target_arch = "wasm32"
        )))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        format_version: document::FORMAT_VERSION,
        wasm_exports: cfg!(feature = "wasm"),
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target platform
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    /// Document format version written by this build
    pub format_version: &'static str,
    /// Whether the wasm-bindgen exports are compiled in
    pub wasm_exports: bool,
}

// ============================================================================
// TESTS
// ============================================================================
