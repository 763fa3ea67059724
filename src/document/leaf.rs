//! # Encrypted Leaf Markers
//!
//! Every encrypted scalar is replaced by a self-describing string:
//!
//! ```text
//! ENC[AES256_GCM,data:<base64>,iv:<base64 12 B>,tag:<base64 16 B>,type:<str|int|float|bool|null>]
//! ```
//!
//! The marker carries everything needed to open the leaf on its own. The
//! associated data is the leaf's path in the tree, so a marker moved to
//! another position no longer opens.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand_core::CryptoRngCore;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::crypto::encryption::{
    open_parts, seal_parts_with_rng, DataKey, Nonce, SealedParts, NONCE_SIZE, TAG_SIZE,
};
use crate::error::{Error, Result};

/// Cipher label written into every marker
pub const ALGORITHM: &str = "AES256_GCM";

const MARKER_PREFIX: &str = "ENC[";
const MARKER_SUFFIX: char = ']';

/// Original JSON type of an encrypted scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    /// JSON string
    Str,
    /// JSON number representable as a 64-bit integer
    Int,
    /// Any other JSON number
    Float,
    /// JSON boolean
    Bool,
    /// JSON null
    Null,
}

impl LeafType {
    /// Tag written after `type:`
    pub fn as_str(self) -> &'static str {
        match self {
            LeafType::Str => "str",
            LeafType::Int => "int",
            LeafType::Float => "float",
            LeafType::Bool => "bool",
            LeafType::Null => "null",
        }
    }

    /// Parse a `type:` tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "str" => Some(LeafType::Str),
            "int" => Some(LeafType::Int),
            "float" => Some(LeafType::Float),
            "bool" => Some(LeafType::Bool),
            "null" => Some(LeafType::Null),
            _ => None,
        }
    }
}

/// A parsed `ENC[...]` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedLeaf {
    /// Nonce, ciphertext and tag of the sealed scalar
    pub sealed: SealedParts,
    /// Type to coerce the plaintext back into
    pub leaf_type: LeafType,
}

fn malformed(reason: &str) -> Error {
    Error::MalformedDocument(format!("invalid leaf marker: {}", reason))
}

fn decode_field(name: &str, value: Option<&str>) -> Result<Vec<u8>> {
    let value = value.ok_or_else(|| malformed(&format!("missing {}", name)))?;
    STANDARD
        .decode(value)
        .map_err(|_| malformed(&format!("{} is not base64", name)))
}

impl EncryptedLeaf {
    /// Parse and validate a marker string
    ///
    /// ## Errors
    ///
    /// `MalformedDocument` for a wrong algorithm, a missing, duplicate or
    /// unknown field, invalid base64, or a nonce/tag of the wrong size.
    pub fn parse(marker: &str) -> Result<Self> {
        let body = marker
            .strip_prefix(MARKER_PREFIX)
            .and_then(|rest| rest.strip_suffix(MARKER_SUFFIX))
            .ok_or_else(|| malformed("not an ENC[...] value"))?;

        let mut fields = body.split(',');
        if fields.next() != Some(ALGORITHM) {
            return Err(malformed("unsupported algorithm"));
        }

        let (mut data, mut iv, mut tag, mut leaf_type) = (None, None, None, None);
        for field in fields {
            let (name, value) = field
                .split_once(':')
                .ok_or_else(|| malformed("field without a name"))?;
            let slot = match name {
                "data" => &mut data,
                "iv" => &mut iv,
                "tag" => &mut tag,
                "type" => &mut leaf_type,
                other => return Err(malformed(&format!("unknown field {}", other))),
            };
            if slot.replace(value).is_some() {
                return Err(malformed(&format!("duplicate field {}", name)));
            }
        }

        let ciphertext = decode_field("data", data)?;
        let nonce: [u8; NONCE_SIZE] = decode_field("iv", iv)?
            .try_into()
            .map_err(|_| malformed("iv must be 12 bytes"))?;
        let tag: [u8; TAG_SIZE] = decode_field("tag", tag)?
            .try_into()
            .map_err(|_| malformed("tag must be 16 bytes"))?;
        let leaf_type = leaf_type
            .and_then(LeafType::from_tag)
            .ok_or_else(|| malformed("missing or unknown type"))?;

        Ok(Self {
            sealed: SealedParts {
                nonce: Nonce::from_bytes(nonce),
                ciphertext,
                tag,
            },
            leaf_type,
        })
    }
}

impl fmt::Display for EncryptedLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{},data:{},iv:{},tag:{},type:{}{}",
            MARKER_PREFIX,
            ALGORITHM,
            STANDARD.encode(&self.sealed.ciphertext),
            STANDARD.encode(self.sealed.nonce.as_bytes()),
            STANDARD.encode(self.sealed.tag),
            self.leaf_type.as_str(),
            MARKER_SUFFIX
        )
    }
}

// ============================================================================
// SCALAR CODING
// ============================================================================

/// Plaintext bytes and type tag of a JSON scalar
fn encode_scalar(value: &Value) -> Result<(Zeroizing<Vec<u8>>, LeafType)> {
    let (text, leaf_type) = match value {
        Value::String(s) => (s.clone(), LeafType::Str),
        Value::Number(n) if n.is_i64() || n.is_u64() => (n.to_string(), LeafType::Int),
        Value::Number(n) => (n.to_string(), LeafType::Float),
        Value::Bool(b) => (b.to_string(), LeafType::Bool),
        Value::Null => (String::new(), LeafType::Null),
        Value::Array(_) | Value::Object(_) => {
            return Err(Error::MalformedDocument("container is not a leaf".into()))
        }
    };
    Ok((Zeroizing::new(text.into_bytes()), leaf_type))
}

/// Coerce opened plaintext back into its declared JSON type
fn decode_scalar(plaintext: &[u8], leaf_type: LeafType) -> Result<Value> {
    let text = std::str::from_utf8(plaintext)
        .map_err(|_| Error::MalformedDocument("leaf plaintext is not UTF-8".into()))?;
    let mismatch = || {
        Error::MalformedDocument(format!("leaf plaintext is not a valid {}", leaf_type.as_str()))
    };

    match leaf_type {
        LeafType::Str => Ok(Value::String(text.to_owned())),
        LeafType::Int => text
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| text.parse::<u64>().map(Value::from))
            .map_err(|_| mismatch()),
        LeafType::Float => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch),
        LeafType::Bool => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },
        LeafType::Null if text.is_empty() => Ok(Value::Null),
        LeafType::Null => Err(mismatch()),
    }
}

/// Encrypt one scalar under the data key, bound to `aad`
pub(crate) fn seal_leaf<R: CryptoRngCore>(
    data_key: &DataKey,
    value: &Value,
    aad: &[u8],
    rng: &mut R,
) -> Result<EncryptedLeaf> {
    let (plaintext, leaf_type) = encode_scalar(value)?;
    let sealed = seal_parts_with_rng(data_key.as_bytes(), &plaintext, aad, rng)?;
    Ok(EncryptedLeaf { sealed, leaf_type })
}

/// Decrypt one scalar; fails closed with `AuthenticationFailed`
pub(crate) fn open_leaf(data_key: &DataKey, leaf: &EncryptedLeaf, aad: &[u8]) -> Result<Value> {
    let plaintext = Zeroizing::new(open_parts(data_key.as_bytes(), &leaf.sealed, aad)?);
    decode_scalar(&plaintext, leaf.leaf_type)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> DataKey {
        DataKey::from_bytes([7u8; 32])
    }

    fn seal(value: &Value, aad: &[u8]) -> EncryptedLeaf {
        seal_leaf(&key(), value, aad, &mut rand::rngs::OsRng).unwrap()
    }

    #[test]
    fn test_marker_shape() {
        let marker = seal(&json!("abc"), b"[]").to_string();

        assert!(marker.starts_with("ENC[AES256_GCM,data:"));
        assert!(marker.contains(",iv:"));
        assert!(marker.contains(",tag:"));
        assert!(marker.ends_with(",type:str]"));
    }

    #[test]
    fn test_marker_parse_round_trip() {
        let leaf = seal(&json!(8080), b"[\"port\"]");
        let parsed = EncryptedLeaf::parse(&leaf.to_string()).unwrap();
        assert_eq!(parsed, leaf);
        assert_eq!(parsed.leaf_type, LeafType::Int);
    }

    #[test]
    fn test_every_type_round_trips() {
        let values = [
            json!("postgres://example"),
            json!(""),
            json!(-42),
            json!(u64::MAX),
            json!(3.25),
            json!(true),
            json!(false),
            json!(null),
        ];
        for value in values {
            let leaf = seal(&value, b"aad");
            let reparsed = EncryptedLeaf::parse(&leaf.to_string()).unwrap();
            assert_eq!(open_leaf(&key(), &reparsed, b"aad").unwrap(), value);
        }
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(seal(&json!(1), b"").leaf_type, LeafType::Int);
        assert_eq!(seal(&json!(1.5), b"").leaf_type, LeafType::Float);
        assert_eq!(seal(&json!(false), b"").leaf_type, LeafType::Bool);
        assert_eq!(seal(&json!(null), b"").leaf_type, LeafType::Null);
    }

    #[test]
    fn test_wrong_aad_fails_closed() {
        let leaf = seal(&json!("secret"), b"[\"a\"]");
        assert_eq!(
            open_leaf(&key(), &leaf, b"[\"b\"]").unwrap_err(),
            Error::AuthenticationFailed
        );
    }

    #[test]
    fn test_containers_are_not_leaves() {
        let result = seal_leaf(&key(), &json!({}), b"", &mut rand::rngs::OsRng);
        assert!(matches!(result, Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_parse_rejects_malformed_markers() {
        let good = seal(&json!("x"), b"").to_string();

        let cases = [
            "plain text".to_string(),
            good.replace("AES256_GCM", "CHACHA20"),
            good.replace("type:str", "type:blob"),
            good.replace(",tag:", ",mac:"),
            good.replace("data:", "data:!!"),
            format!("{},type:str]", good.trim_end_matches(']')),
            "ENC[AES256_GCM,data:,iv:AAAA,tag:AAAAAAAAAAAAAAAAAAAAAA==,type:str]".to_string(),
        ];
        for case in cases {
            assert!(
                matches!(EncryptedLeaf::parse(&case), Err(Error::MalformedDocument(_))),
                "accepted {}",
                case
            );
        }
    }

    #[test]
    fn test_decode_rejects_type_mismatch() {
        assert!(decode_scalar(b"maybe", LeafType::Bool).is_err());
        assert!(decode_scalar(b"1.5", LeafType::Int).is_err());
        assert!(decode_scalar(b"x", LeafType::Null).is_err());
        assert_eq!(decode_scalar(b"1.5", LeafType::Float).unwrap(), json!(1.5));
    }
}
