//! # Error Handling
//!
//! This module provides the error taxonomy for the encryption engine.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors (100-199)                                              │
//! │  │   ├── InvalidSeedFormat     - Seed is not 32 bytes of hex           │
//! │  │   ├── InvalidKeyLength      - Key has the wrong size for its slot   │
//! │  │   ├── InvalidKeyEncoding    - Key is not valid hex                  │
//! │  │   └── KeyDerivationFailed   - HKDF expansion failed                 │
//! │  │                                                                      │
//! │  ├── KEM Errors (200-299)                                              │
//! │  │   └── InvalidCiphertextLength - KEM ciphertext has the wrong size   │
//! │  │                                                                      │
//! │  ├── AEAD Errors (300-399)                                             │
//! │  │   ├── AuthenticationFailed  - Tag mismatch / truncated envelope     │
//! │  │   └── EntropySourceFailure  - OS RNG unavailable (fatal)            │
//! │  │                                                                      │
//! │  ├── Document Errors (400-499)                                         │
//! │  │   ├── MalformedDocument     - Structure or metadata is invalid      │
//! │  │   ├── KeyUnwrapFailed       - No recipient entry opens              │
//! │  │   └── IntegrityCheckFailed  - Aggregate MAC mismatch                │
//! │  │                                                                      │
//! │  └── Internal Errors (900-999)                                         │
//! │      └── SerializationError    - JSON encoding failed                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fail-Closed Rule
//!
//! `AuthenticationFailed` and `IntegrityCheckFailed` carry no payload. Once
//! either is produced, no plaintext byte leaves the engine, and the message
//! never says where the mismatch occurred.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the encryption engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================

    /// Seed is not valid hex or not exactly 32 bytes
    #[error("Invalid seed format: {0}")]
    InvalidSeedFormat(String),

    /// Key material has the wrong length for the requested operation
    #[error("Invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Which key slot was being validated
        what: &'static str,
        /// Required length in bytes
        expected: usize,
        /// Supplied length in bytes
        actual: usize,
    },

    /// Key material could not be decoded from hex
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Key derivation failed
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // KEM Errors (200-299)
    // ========================================================================

    /// KEM ciphertext has the wrong length
    #[error("Invalid ciphertext length: expected {expected} bytes, got {actual}")]
    InvalidCiphertextLength {
        /// Required length in bytes
        expected: usize,
        /// Supplied length in bytes
        actual: usize,
    },

    // ========================================================================
    // AEAD Errors (300-399)
    // ========================================================================

    /// AEAD tag did not verify, or the sealed value was truncated
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The secure random source could not produce entropy
    #[error("Entropy source failure: {0}")]
    EntropySourceFailure(String),

    // ========================================================================
    // Document Errors (400-499)
    // ========================================================================

    /// Document structure or metadata is invalid
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The data key could not be recovered for the supplied private key
    #[error("Failed to unwrap data key: {0}")]
    KeyUnwrapFailed(String),

    /// The aggregate document MAC did not verify
    #[error("Integrity check failed")]
    IntegrityCheckFailed,

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code for the host boundary
    ///
    /// Error codes are organized by category:
    /// - 100-199: Keys and seeds
    /// - 200-299: KEM
    /// - 300-399: AEAD
    /// - 400-499: Documents
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Keys (100-199)
            Error::InvalidSeedFormat(_) => 100,
            Error::InvalidKeyLength { .. } => 101,
            Error::InvalidKeyEncoding(_) => 102,
            Error::KeyDerivationFailed(_) => 103,

            // KEM (200-299)
            Error::InvalidCiphertextLength { .. } => 200,

            // AEAD (300-399)
            Error::AuthenticationFailed => 300,
            Error::EntropySourceFailure(_) => 301,

            // Documents (400-499)
            Error::MalformedDocument(_) => 400,
            Error::KeyUnwrapFailed(_) => 401,
            Error::IntegrityCheckFailed => 402,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
        }
    }

    /// Short, stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidSeedFormat(_) => "InvalidSeedFormat",
            Error::InvalidKeyLength { .. } => "InvalidKeyLength",
            Error::InvalidKeyEncoding(_) => "InvalidKeyEncoding",
            Error::KeyDerivationFailed(_) => "KeyDerivationFailed",
            Error::InvalidCiphertextLength { .. } => "InvalidCiphertextLength",
            Error::AuthenticationFailed => "AuthenticationFailed",
            Error::EntropySourceFailure(_) => "EntropySourceFailure",
            Error::MalformedDocument(_) => "MalformedDocument",
            Error::KeyUnwrapFailed(_) => "KeyUnwrapFailed",
            Error::IntegrityCheckFailed => "IntegrityCheckFailed",
            Error::SerializationError(_) => "SerializationError",
        }
    }

    /// Check if this error is fatal
    ///
    /// A fatal error means the process cannot safely continue producing
    /// keys or nonces. Everything else is an input problem the caller can
    /// report and move past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::EntropySourceFailure(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<rand::Error> for Error {
    fn from(err: rand::Error) -> Self {
        Error::EntropySourceFailure(err.to_string())
    }
}

// ============================================================================
// BOUNDARY ERROR REPRESENTATION
// ============================================================================

/// Boundary-friendly error representation
///
/// This is what front-end collaborators (CLI, host loader) surface to users:
/// the error kind and a short message, never partial plaintext or key bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Numeric error code
    pub code: i32,
    /// Error kind name
    pub kind: &'static str,
    /// Human-readable error message
    pub message: String,
}

impl From<Error> for ErrorReport {
    fn from(err: Error) -> Self {
        Self {
            code: err.code(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// ============================================================================
// TESTS
// ============================================================================
