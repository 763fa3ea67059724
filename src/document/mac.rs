//! # Aggregate Document MAC
//!
//! One HMAC-SHA256 over the whole document, keyed by a subkey of the data
//! key. Every field is written with a 4-byte big-endian length prefix:
//!
//! ```text
//! version ∥ lastmodified ∥ unencrypted_suffix (or "")
//!   ∥ "recipients:<n>"
//!   ∥ for each recipient entry in stored order:
//!       kem ∥ recipient ∥ enc ∥ wrapped_key
//!   ∥ for each node in document order:
//!       path ∥ "object:<n>" | "array:<n>" | <ENC marker> | <plaintext JSON>
//! ```
//!
//! Because the structure records, the paths and every recipient entry are
//! authenticated, changing, reordering, adding or removing any node or
//! entry changes the MAC.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use super::metadata::{Metadata, RecipientStanza};
use super::tree::{path_bytes, visit, Node};
use crate::crypto::encryption::DataKey;
use crate::crypto::kdf::derive_mac_key;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Fields of the metadata block covered by the MAC
#[derive(Debug, Clone, Copy)]
pub(crate) struct MacContext<'a> {
    pub version: &'a str,
    pub lastmodified: &'a str,
    pub unencrypted_suffix: Option<&'a str>,
    pub recipients: &'a [RecipientStanza],
}

impl<'a> From<&'a Metadata> for MacContext<'a> {
    fn from(metadata: &'a Metadata) -> Self {
        Self {
            version: &metadata.version,
            lastmodified: &metadata.lastmodified,
            unencrypted_suffix: metadata.unencrypted_suffix.as_deref(),
            recipients: &metadata.pq,
        }
    }
}

fn update_field(mac: &mut HmacSha256, field: &[u8]) -> Result<()> {
    let len = u32::try_from(field.len())
        .map_err(|_| Error::SerializationError("MAC field exceeds 4 GiB".into()))?;
    mac.update(&len.to_be_bytes());
    mac.update(field);
    Ok(())
}

fn keyed_mac(data_key: &DataKey, context: MacContext<'_>, tree: &Map<String, Value>) -> Result<HmacSha256> {
    let mut key = derive_mac_key(data_key.as_bytes())?;
    let mac = <HmacSha256 as Mac>::new_from_slice(&key);
    zeroize::Zeroize::zeroize(&mut key);
    let mut mac = mac.map_err(|_| Error::KeyDerivationFailed("invalid MAC key".into()))?;

    update_field(&mut mac, context.version.as_bytes())?;
    update_field(&mut mac, context.lastmodified.as_bytes())?;
    update_field(&mut mac, context.unencrypted_suffix.unwrap_or("").as_bytes())?;

    update_field(&mut mac, format!("recipients:{}", context.recipients.len()).as_bytes())?;
    for stanza in context.recipients {
        update_field(&mut mac, stanza.kem.algorithm().as_bytes())?;
        update_field(&mut mac, stanza.recipient.as_bytes())?;
        update_field(&mut mac, stanza.enc.as_bytes())?;
        update_field(&mut mac, stanza.wrapped_key.as_bytes())?;
    }

    visit(tree, context.unencrypted_suffix, &mut |path, node| {
        update_field(&mut mac, &path_bytes(path)?)?;
        match node {
            Node::Object(len) => update_field(&mut mac, format!("object:{}", len).as_bytes()),
            Node::Array(len) => update_field(&mut mac, format!("array:{}", len).as_bytes()),
            Node::Encrypted(marker) => update_field(&mut mac, marker.as_bytes()),
            Node::Plain(value) => update_field(&mut mac, serde_json::to_string(value)?.as_bytes()),
        }
    })?;

    Ok(mac)
}

/// Compute the MAC, hex encoded
pub(crate) fn compute(data_key: &DataKey, context: MacContext<'_>, tree: &Map<String, Value>) -> Result<String> {
    let mac = keyed_mac(data_key, context, tree)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify the stored MAC in constant time
///
/// ## Errors
///
/// `IntegrityCheckFailed` on any mismatch, including a stored value that
/// is not hex.
pub(crate) fn verify(
    data_key: &DataKey,
    context: MacContext<'_>,
    tree: &Map<String, Value>,
    expected_hex: &str,
) -> Result<()> {
    let expected = hex::decode(expected_hex).map_err(|_| Error::IntegrityCheckFailed)?;
    let mac = keyed_mac(data_key, context, tree)?;
    mac.verify_slice(&expected)
        .map_err(|_| Error::IntegrityCheckFailed)
}
