//! Domain primitives shared by the API, the bot and the upload worker.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest Telegram `file_id` accepted by the stream proxy.
pub const MAX_FILE_ID_LEN: usize = 256;

/// Opaque Telegram file identifier.
///
/// Only URL-safe base64 characters are accepted so the value can be embedded in
/// a Bot API path without escaping.
///
/// ```rust
/// use zeexclub::domain::FileId;
///
/// let id = FileId::parse("BAACAgQAAxkBAAIB").unwrap();
/// assert_eq!(id.as_str(), "BAACAgQAAxkBAAIB");
/// assert!(FileId::parse("../etc/passwd").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_FILE_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        valid.then(|| Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("invalid file_id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_rejects_path_characters() {
        assert!(FileId::parse("abc/def").is_none());
        assert!(FileId::parse("abc def").is_none());
        assert!(FileId::parse("").is_none());
        assert!(FileId::parse(&"a".repeat(MAX_FILE_ID_LEN + 1)).is_none());
    }

    #[test]
    fn file_id_trims_and_keeps_urlsafe_chars() {
        let id = FileId::parse("  AgAD_x-9  ").unwrap();
        assert_eq!(id.as_str(), "AgAD_x-9");
        assert_eq!(id.to_string(), "AgAD_x-9");
    }

    #[test]
    fn file_id_serde() {
        let id: FileId = serde_json::from_str("\"BQAC-1\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"BQAC-1\"");
        assert!(serde_json::from_str::<FileId>("\"a/b\"").is_err());
    }
}
