//! # Document Codec
//!
//! Encrypts every scalar of a JSON secrets document under one data key,
//! wraps that key for each recipient, and guards the whole document with
//! one aggregate MAC.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DOCUMENT LIFECYCLE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  EncryptedDocument::parse()        structure + markers validated        │
//! │            │                       (MalformedDocument)                  │
//! │            ▼                                                           │
//! │  .unwrap_key(secret)               KEM decapsulate + AEAD open          │
//! │  .with_data_key(key)               (KeyUnwrapFailed)                    │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  KeyUnwrapped::verify()            aggregate MAC, constant time         │
//! │            │                       (IntegrityCheckFailed)               │
//! │            ▼                                                           │
//! │  Verified::decrypt()               every leaf opened and retyped        │
//! │  Verified::add_recipient(pk)       new document, one more recipient     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each state can only be reached from the previous one, so no plaintext
//! can be produced from a document whose MAC has not been checked. No
//! operation mutates a document: every transform returns a new one.

pub mod config;
pub mod leaf;
mod mac;
pub mod metadata;
mod tree;

use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::crypto::{DataKey, KeyKind, PublicKey, SecretKey};
use crate::error::{Error, Result};

pub use config::DocumentConfig;
pub use leaf::{EncryptedLeaf, LeafType};
pub use metadata::{Metadata, RecipientStanza, FORMAT_VERSION, METADATA_KEY};

use mac::MacContext;

// ============================================================================
// ENCRYPTED DOCUMENT (Unopened)
// ============================================================================

/// A parsed, structurally valid encrypted document
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedDocument {
    tree: Map<String, Value>,
    metadata: Metadata,
}

impl EncryptedDocument {
    /// Parse an encrypted document from JSON text
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::MalformedDocument(format!("not JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value as an encrypted document
    ///
    /// ## Errors
    ///
    /// `MalformedDocument` if the value is not an object, the `sops` block
    /// is missing or invalid, or any leaf outside an unencrypted subtree is
    /// not a well-formed `ENC[...]` marker.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut tree) = value else {
            return Err(Error::MalformedDocument("document is not a JSON object".into()));
        };
        let metadata = tree
            .remove(METADATA_KEY)
            .ok_or_else(|| Error::MalformedDocument("missing sops metadata".into()))?;
        let metadata: Metadata = serde_json::from_value(metadata)
            .map_err(|e| Error::MalformedDocument(format!("invalid sops metadata: {}", e)))?;
        metadata.validate()?;

        tree::visit(&tree, metadata.unencrypted_suffix.as_deref(), &mut |_, node| {
            if let tree::Node::Encrypted(marker) = node {
                EncryptedLeaf::parse(marker)?;
            }
            Ok(())
        })?;

        tracing::debug!("Parsed document with {} recipient entries", metadata.pq.len());
        Ok(Self { tree, metadata })
    }

    /// The metadata block
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The encrypted tree without the metadata block
    pub fn tree(&self) -> &Map<String, Value> {
        &self.tree
    }

    /// The full document as JSON, metadata block last
    pub fn to_value(&self) -> Result<Value> {
        let mut out = self.tree.clone();
        out.insert(METADATA_KEY.to_string(), serde_json::to_value(&self.metadata)?);
        Ok(Value::Object(out))
    }

    /// The full document as pretty-printed JSON text
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// Structural summary; needs no key
    pub fn inspect(&self) -> Result<DocumentSummary> {
        let counts = tree::count_leaves(&self.tree, self.metadata.unencrypted_suffix.as_deref())?;
        Ok(DocumentSummary {
            version: self.metadata.version.clone(),
            lastmodified: self.metadata.lastmodified.clone(),
            encrypted_leaves: counts.encrypted,
            plaintext_leaves: counts.plaintext,
            recipients: self
                .metadata
                .pq
                .iter()
                .map(|s| RecipientSummary {
                    kem: s.kem,
                    recipient: s.recipient.clone(),
                })
                .collect(),
            unencrypted_suffix: self.metadata.unencrypted_suffix.clone(),
        })
    }

    /// Recover the data key with the caller's secret key
    ///
    /// Every recipient entry of the key's kind is tried in order and the
    /// first one that opens wins.
    pub fn unwrap_key(&self, secret: &SecretKey) -> Result<KeyUnwrapped<'_>> {
        let data_key = self.metadata.unwrap_data_key(secret)?;
        Ok(self.with_data_key(data_key))
    }

    /// Use a raw data key supplied by the caller
    pub fn with_data_key(&self, data_key: DataKey) -> KeyUnwrapped<'_> {
        KeyUnwrapped {
            document: self,
            data_key,
        }
    }

    fn mac_context(&self) -> MacContext<'_> {
        MacContext::from(&self.metadata)
    }
}

/// Recipient entry as reported by [`EncryptedDocument::inspect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientSummary {
    /// KEM of the entry
    pub kem: KeyKind,
    /// Public key fingerprint recorded in the entry
    pub recipient: String,
}

/// Key-free description of an encrypted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Format version
    pub version: String,
    /// Last encryption time
    pub lastmodified: String,
    /// Number of `ENC[...]` leaves
    pub encrypted_leaves: usize,
    /// Number of leaves left in plaintext
    pub plaintext_leaves: usize,
    /// Recipient entries in stored order
    pub recipients: Vec<RecipientSummary>,
    /// Configured unencrypted suffix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unencrypted_suffix: Option<String>,
}

// ============================================================================
// KEY UNWRAPPED
// ============================================================================

/// A document together with its data key, MAC not yet checked
#[derive(Debug)]
pub struct KeyUnwrapped<'a> {
    document: &'a EncryptedDocument,
    data_key: DataKey,
}

impl<'a> KeyUnwrapped<'a> {
    /// The recovered data key
    pub fn data_key(&self) -> &DataKey {
        &self.data_key
    }

    /// Check the aggregate MAC; the only way to reach [`Verified`]
    pub fn verify(self) -> Result<Verified<'a>> {
        let document = self.document;
        mac::verify(
            &self.data_key,
            document.mac_context(),
            &document.tree,
            &document.metadata.mac,
        )
        .map_err(|e| {
            tracing::warn!("Document integrity check failed");
            e
        })?;

        tracing::debug!("Document MAC verified");
        Ok(Verified {
            document,
            data_key: self.data_key,
        })
    }
}

// ============================================================================
// VERIFIED
// ============================================================================

/// A document whose MAC has been verified with its data key
#[derive(Debug)]
pub struct Verified<'a> {
    document: &'a EncryptedDocument,
    data_key: DataKey,
}

impl<'a> Verified<'a> {
    /// The verified data key
    pub fn data_key(&self) -> &DataKey {
        &self.data_key
    }

    /// Decrypt every leaf into the plaintext tree, metadata dropped
    pub fn decrypt(&self) -> Result<Value> {
        let tree = self.decrypt_tree()?;
        Ok(Value::Object(tree))
    }

    /// Decrypt every leaf, keeping the `sops` block as stored
    pub fn decrypt_content(&self) -> Result<Value> {
        let mut tree = self.decrypt_tree()?;
        tree.insert(
            METADATA_KEY.to_string(),
            serde_json::to_value(&self.document.metadata)?,
        );
        Ok(Value::Object(tree))
    }

    /// Wrap the data key for one more recipient
    ///
    /// Leaves are untouched; `lastmodified` and the MAC are renewed.
    pub fn add_recipient(&self, recipient: &PublicKey) -> Result<EncryptedDocument> {
        self.add_recipient_with_rng(recipient, &mut OsRng)
    }

    /// [`Verified::add_recipient`] with an injected random source
    pub fn add_recipient_with_rng<R: CryptoRngCore>(
        &self,
        recipient: &PublicKey,
        rng: &mut R,
    ) -> Result<EncryptedDocument> {
        let mut metadata = self.document.metadata.clone();
        metadata
            .pq
            .push(RecipientStanza::wrap(&self.data_key, recipient, rng)?);
        metadata.lastmodified = crate::time::now_rfc3339();
        metadata.mac = mac::compute(&self.data_key, MacContext::from(&metadata), &self.document.tree)?;

        tracing::debug!("Added recipient entry {}", metadata.pq.len() - 1);
        Ok(EncryptedDocument {
            tree: self.document.tree.clone(),
            metadata,
        })
    }

    fn decrypt_tree(&self) -> Result<Map<String, Value>> {
        let document = self.document;
        let mut leaves = 0usize;
        let tree = tree::map_leaves(
            &document.tree,
            document.metadata.unencrypted_suffix.as_deref(),
            &mut |path, value| {
                let marker = value.as_str().ok_or_else(|| {
                    Error::MalformedDocument("encrypted leaf is not a string".into())
                })?;
                let encrypted = EncryptedLeaf::parse(marker)?;
                leaves += 1;
                leaf::open_leaf(&self.data_key, &encrypted, &tree::path_bytes(path)?)
            },
        )?;

        tracing::debug!("Decrypted {} leaves", leaves);
        Ok(tree)
    }
}

// ============================================================================
// ENCRYPTION
// ============================================================================

fn plaintext_object(plaintext: &Value) -> Result<&Map<String, Value>> {
    let Value::Object(tree) = plaintext else {
        return Err(Error::MalformedDocument("plaintext must be a JSON object".into()));
    };
    if tree.contains_key(METADATA_KEY) {
        return Err(Error::MalformedDocument(
            "plaintext already contains a sops key".into(),
        ));
    }
    Ok(tree)
}

/// Encrypt a plaintext object under `data_key` and wrap it for `recipients`
///
/// The raw-key path passes no recipients; the result then carries an
/// empty `pq` list and can only be opened with the same data key.
pub fn encrypt_with_rng<R: CryptoRngCore>(
    plaintext: &Value,
    data_key: &DataKey,
    recipients: &[PublicKey],
    config: &DocumentConfig,
    rng: &mut R,
) -> Result<EncryptedDocument> {
    let plaintext = plaintext_object(plaintext)?;
    let suffix = config.unencrypted_suffix.as_deref();

    let mut leaves = 0usize;
    let tree = tree::map_leaves(plaintext, suffix, &mut |path, value| {
        let sealed = leaf::seal_leaf(data_key, value, &tree::path_bytes(path)?, rng)?;
        leaves += 1;
        Ok(Value::String(sealed.to_string()))
    })?;

    let pq = recipients
        .iter()
        .map(|recipient| RecipientStanza::wrap(data_key, recipient, rng))
        .collect::<Result<Vec<_>>>()?;

    let mut metadata = Metadata {
        pq,
        lastmodified: crate::time::now_rfc3339(),
        mac: String::new(),
        unencrypted_suffix: config.unencrypted_suffix.clone(),
        version: FORMAT_VERSION.to_string(),
    };
    metadata.mac = mac::compute(data_key, MacContext::from(&metadata), &tree)?;

    tracing::debug!(
        "Encrypted {} leaves for {} recipients",
        leaves,
        metadata.pq.len()
    );
    Ok(EncryptedDocument { tree, metadata })
}

/// Encrypt with a caller-supplied data key and no recipient entries
pub fn encrypt_with_data_key(
    plaintext: &Value,
    data_key: &DataKey,
    config: &DocumentConfig,
) -> Result<EncryptedDocument> {
    encrypt_with_rng(plaintext, data_key, &[], config, &mut OsRng)
}

/// Encrypt under a fresh data key wrapped for one recipient
pub fn encrypt_for_recipient(
    plaintext: &Value,
    recipient: &PublicKey,
    config: &DocumentConfig,
) -> Result<EncryptedDocument> {
    encrypt_for_recipients(plaintext, std::slice::from_ref(recipient), config)
}

/// Encrypt under a fresh data key wrapped for every recipient
pub fn encrypt_for_recipients(
    plaintext: &Value,
    recipients: &[PublicKey],
    config: &DocumentConfig,
) -> Result<EncryptedDocument> {
    let mut rng = OsRng;
    let data_key = DataKey::generate_with_rng(&mut rng)?;
    encrypt_with_rng(plaintext, &data_key, recipients, config, &mut rng)
}

// ============================================================================
// DECRYPTION / VERIFICATION
// ============================================================================

/// Unwrap, verify and decrypt with the caller's secret key
pub fn decrypt(document: &EncryptedDocument, secret: &SecretKey) -> Result<Value> {
    document.unwrap_key(secret)?.verify()?.decrypt()
}

/// Verify and decrypt with a raw data key
pub fn decrypt_with_data_key(document: &EncryptedDocument, data_key: &DataKey) -> Result<Value> {
    document.with_data_key(data_key.clone()).verify()?.decrypt()
}

/// Recover only the data key
pub fn unwrap_data_key(document: &EncryptedDocument, secret: &SecretKey) -> Result<DataKey> {
    document.metadata.unwrap_data_key(secret)
}

/// Outcome of a standalone integrity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// The MAC verified under the supplied key
    Passed,
    /// The MAC did not verify; the reason never names a position
    Failed(String),
}

impl IntegrityStatus {
    /// Whether the check passed
    pub fn is_passed(&self) -> bool {
        matches!(self, IntegrityStatus::Passed)
    }
}

impl std::fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityStatus::Passed => write!(f, "Integrity check Passed"),
            IntegrityStatus::Failed(reason) => write!(f, "Integrity check Failed: {}", reason),
        }
    }
}

/// Check the MAC with a raw data key; reports failure as a status, never an error
pub fn verify_integrity(document: &EncryptedDocument, data_key: &DataKey) -> IntegrityStatus {
    match document.with_data_key(data_key.clone()).verify() {
        Ok(_) => IntegrityStatus::Passed,
        Err(Error::IntegrityCheckFailed) => IntegrityStatus::Failed("MAC mismatch".into()),
        Err(e) => IntegrityStatus::Failed(e.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
