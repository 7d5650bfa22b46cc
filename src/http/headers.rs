//! Header parsing — case-insensitive, multi-valued, with size and count caps.
//!
//! HTTP headers are order-preserving and case-insensitive per [RFC 9110 §5].

use std::fmt;

use thiserror::Error;

use super::reader::{self, ReaderError};

/// Errors raised parsing or interpreting a header block.
#[derive(Debug, Error)]
pub enum HeadersError {
    #[error("too many headers: {count} exceeds maximum of {max}")]
    TooManyHeaders { count: usize, max: usize },

    #[error("header block of {bytes} bytes exceeds maximum of {max} bytes")]
    TooManyBytes { bytes: usize, max: usize },

    #[error("content-length value {value:?} is not a valid non-negative integer")]
    BadContentLength { value: String },

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// A case-insensitive, multi-value HTTP header map.
///
/// Preserves insertion order and allows multiple values per header name,
/// matching the semantics of HTTP/1.1 header fields (RFC 9110 §5.3). Nothing
/// is collapsed or overwritten on insert — duplicates survive.
///
/// # Examples
///
/// ```
/// use minum::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.push("Content-Type", "text/html; charset=utf-8");
/// headers.push("X-Custom", "first");
/// headers.push("X-Custom", "second");
///
/// assert_eq!(headers.value_by_key("content-type"), Some("text/html; charset=utf-8"));
/// assert_eq!(headers.values_by_key("x-custom"), Some(vec!["first", "second"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a header. `name` is lowercased on insertion.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into().to_ascii_lowercase(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All values for `name`, in insertion order. `None` — not an empty
    /// `Vec` — when the header was never sent; the distinction is load-bearing.
    pub fn values_by_key(&self, name: &str) -> Option<Vec<&str>> {
        let name = name.to_ascii_lowercase();
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// The last occurrence of `name`, or `None` if it was never sent.
    pub fn value_by_key(&self, name: &str) -> Option<&str> {
        self.values_by_key(name).and_then(|v| v.last().copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.value_by_key(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.entries.len();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.len() < before
    }

    /// The integer value of the last `content-length` header, or `0` if
    /// absent. A negative or non-numeric value is a bad-input error.
    pub fn content_length(&self) -> Result<u64, HeadersError> {
        match self.value_by_key("content-length") {
            None => Ok(0),
            Some(value) => value.trim().parse::<u64>().map_err(|_| HeadersError::BadContentLength {
                value: value.to_string(),
            }),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.value_by_key("content-type")
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.value_by_key("transfer-encoding")
    }

    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding()
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// Reads header lines from `reader` until the first blank line, enforcing
/// `max_headers` and `max_header_bytes`. Each line is split at the first
/// `:`; the name is lowercased and the value is trimmed of surrounding
/// whitespace.
pub async fn parse<R>(
    reader: &mut R,
    max_line_bytes: usize,
    max_headers: usize,
    max_header_bytes: usize,
) -> Result<Headers, HeadersError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut headers = Headers::new();
    let mut total_bytes = 0usize;

    loop {
        let line = reader::read_line(reader, max_line_bytes)
            .await?
            .ok_or(ReaderError::Incomplete)?;
        if line.is_empty() {
            break;
        }

        total_bytes += line.len();
        if total_bytes > max_header_bytes {
            return Err(HeadersError::TooManyBytes {
                bytes: total_bytes,
                max: max_header_bytes,
            });
        }

        if let Some(colon) = line.find(':') {
            let name = &line[..colon];
            let value = line[colon + 1..].trim();
            headers.push(name, value);
        }
        // A line with no `:` contributes nothing — tolerated rather than
        // rejected, matching this parser's leniency on malformed framing
        // that isn't one of the hard limits.

        if headers.len() > max_headers {
            return Err(HeadersError::TooManyHeaders {
                count: headers.len(),
                max: max_headers,
            });
        }
    }

    Ok(headers)
}
