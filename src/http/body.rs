//! The decoded request body: either a raw byte buffer or, for multipart
//! requests, a named collection of parts with their own headers.

use std::collections::HashMap;

use bytes::Bytes;

use super::headers::Headers;

/// A decoded request body.
///
/// `parts` and `partition_headers` are populated only for multipart
/// requests; a plain (non-multipart) body leaves them empty and stores its
/// bytes in `raw`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub parts: HashMap<String, Bytes>,
    pub partition_headers: HashMap<String, Headers>,
    pub raw: Bytes,
}

impl Body {
    /// The distinguished empty body: no parts, no bytes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: Bytes) -> Self {
        Self {
            parts: HashMap::new(),
            partition_headers: HashMap::new(),
            raw,
        }
    }

    /// Decodes `raw` as UTF-8, or a named multipart part as UTF-8 if `raw` is
    /// empty and `name` is present among `parts`.
    pub fn as_string(&self, name: &str) -> Option<String> {
        if let Some(bytes) = self.parts.get(name) {
            return String::from_utf8(bytes.to_vec()).ok();
        }
        if name.is_empty() && !self.raw.is_empty() {
            return String::from_utf8(self.raw.to_vec()).ok();
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.parts.is_empty()
    }
}
