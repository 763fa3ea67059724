//! Document encryption settings.

/// Settings applied when a plaintext tree is encrypted
///
/// ## Example
///
/// ```
/// use rabbitlock_crypto::document::DocumentConfig;
///
/// let config = DocumentConfig::default().with_unencrypted_suffix("_unencrypted");
/// assert!(config.is_unencrypted_key("region_unencrypted"));
/// assert!(!config.is_unencrypted_key("password"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Map keys ending with this suffix keep their whole subtree in plaintext.
    /// Those values are still covered by the document MAC.
    pub unencrypted_suffix: Option<String>,
}

impl DocumentConfig {
    /// Leave values under keys ending in `suffix` unencrypted
    pub fn with_unencrypted_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.unencrypted_suffix = if suffix.is_empty() { None } else { Some(suffix) };
        self
    }

    /// Whether values under `key` stay in plaintext
    pub fn is_unencrypted_key(&self, key: &str) -> bool {
        is_unencrypted_key(self.unencrypted_suffix.as_deref(), key)
    }
}

/// Suffix rule shared by encryption and by the walk over a stored document
pub(crate) fn is_unencrypted_key(suffix: Option<&str>, key: &str) -> bool {
    matches!(suffix, Some(suffix) if !suffix.is_empty() && key.ends_with(suffix))
}
