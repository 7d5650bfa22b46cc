//! `multipart/form-data` decoding (RFC 2046), binary-safe throughout.
//!
//! The boundary search is a single forward pass using Boyer-Moore-Horspool —
//! a plain byte-window `contains` would be quadratic on adversarial input and
//! risks mistaking a part's binary payload for the separator.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use super::headers::Headers;

#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("boundary token must not be empty")]
    EmptyBoundary,
}

/// Decodes a multipart body into named parts. Parts without a usable
/// `content-disposition` `name` are silently skipped, per the tolerant
/// reading this format requires in practice.
pub fn decode(raw: &[u8], boundary_token: &str) -> Result<Body, MultipartError> {
    if boundary_token.is_empty() {
        return Err(MultipartError::EmptyBoundary);
    }

    let separator = format!("--{boundary_token}");
    let separator = separator.as_bytes();

    let boundaries = find_all(raw, separator);

    let mut parts = HashMap::new();
    let mut partition_headers = HashMap::new();

    // Each segment between consecutive separator occurrences is a candidate
    // part, except the preamble (before the first separator) and the
    // epilogue (after the terminal `--<token>--`).
    for window in boundaries.windows(2) {
        let (start, end) = (window[0] + separator.len(), window[1]);
        if start > end {
            continue;
        }
        let mut segment = &raw[start..end];

        // Each part begins with `\r\n` after the separator.
        if let Some(rest) = segment.strip_prefix(b"\r\n") {
            segment = rest;
        }
        // ...and the payload is terminated by the `\r\n` immediately
        // preceding the next separator.
        if let Some(rest) = segment.strip_suffix(b"\r\n") {
            segment = rest;
        }

        let Some((header_block, payload)) = split_part_headers(segment) else {
            continue;
        };

        let part_headers = parse_part_headers(header_block);
        let Some(name) = content_disposition_name(&part_headers) else {
            continue;
        };

        parts.insert(name.clone(), Bytes::copy_from_slice(payload));
        partition_headers.insert(name, part_headers);
    }

    Ok(Body { parts, partition_headers })
}

/// The two maps a multipart decode produces; kept separate from
/// [`crate::http::body::Body`] so this module has no dependency on the
/// broader request/response types.
#[derive(Debug, Default)]
pub struct Body {
    pub parts: HashMap<String, Bytes>,
    pub partition_headers: HashMap<String, Headers>,
}

/// Splits a part into its header block and payload at the first `\r\n\r\n`.
fn split_part_headers(segment: &[u8]) -> Option<(&[u8], &[u8])> {
    let sep = find_all(segment, b"\r\n\r\n");
    let at = *sep.first()?;
    Some((&segment[..at], &segment[at + 4..]))
}

fn parse_part_headers(block: &[u8]) -> Headers {
    let mut headers = Headers::new();
    let text = String::from_utf8_lossy(block);
    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        if let Some(colon) = line.find(':') {
            let name = &line[..colon];
            let value = line[colon + 1..].trim();
            headers.push(name, value);
        }
    }
    headers
}

fn content_disposition_name(headers: &Headers) -> Option<String> {
    let value = headers.value_by_key("content-disposition")?;
    let marker = "name=\"";
    let start = value.find(marker)? + marker.len();
    let rest = &value[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Extracts the boundary token from a `content-type: multipart/form-data;
/// boundary=...` header value. Returns `None` if no `boundary=` parameter is
/// present.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("boundary=") {
            return Some(value.trim_matches('"').to_string());
        }
    }
    None
}

/// Every starting index at which `needle` occurs in `haystack`, scanning
/// once left to right using the Boyer-Moore-Horspool bad-character rule.
/// Matches do not overlap: after a match at `i`, the next search resumes at
/// `i + needle.len()`.
fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut matches = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return matches;
    }

    let m = needle.len();
    let mut bad_char = [m; 256];
    for (i, &b) in needle[..m - 1].iter().enumerate() {
        bad_char[b as usize] = m - 1 - i;
    }

    let mut i = 0;
    while i + m <= haystack.len() {
        let window = &haystack[i..i + m];
        if window == needle {
            matches.push(i);
            i += m;
            continue;
        }
        let last = haystack[i + m - 1];
        i += bad_char[last as usize];
    }

    matches
}
