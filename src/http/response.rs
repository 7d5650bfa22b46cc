//! HTTP/1.1 response model and wire serialization.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::clock::Clock;
use super::status_line::StatusCode;

/// An HTTP response: a status code, a flat map of extra headers the handler
/// wants sent, and a body. `content-type`/`content-length`/`date`/`server`
/// are derived at serialization time rather than stored here.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub extra_headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, extra_headers: BTreeMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            extra_headers,
            body: body.into(),
        }
    }

    /// `200 OK` with `content-type: text/html; charset=UTF-8` and `text`'s
    /// UTF-8 bytes as the body.
    pub fn html_ok(text: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html; charset=UTF-8".to_string());
        Self {
            status: StatusCode::Ok,
            extra_headers: headers,
            body: Bytes::from(text.into().into_bytes()),
        }
    }

    /// An empty-bodied response with the given status — used for `404`s and
    /// similar connection-handler-generated responses.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            extra_headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Serializes this response to wire format:
    ///
    /// ```text
    /// HTTP/1.1 <code> <reason>\r\n
    /// date: <RFC 1123>\r\n
    /// server: minum\r\n
    /// content-type: <from response or default>\r\n
    /// content-length: <|body|>\r\n
    /// <keep-alive: timeout=N, if keep_alive_timeout is Some>\r\n
    /// \r\n
    /// <body bytes>
    /// ```
    ///
    /// There is deliberately no `Connection` header — keep-alive is signaled
    /// purely through the presence or absence of `keep-alive`.
    pub fn serialize(&self, clock: &dyn Clock, keep_alive_timeout: Option<u64>) -> BytesMut {
        let content_type = self
            .extra_headers
            .get("content-type")
            .cloned()
            .unwrap_or_else(|| "text/html; charset=UTF-8".to_string());

        let mut buf = BytesMut::with_capacity(128 + self.extra_headers.len() * 64 + self.body.len());

        buf.put(format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status.canonical_reason()).as_bytes());
        buf.put(format!("date: {}\r\n", clock.now_http_date()).as_bytes());
        buf.put(&b"server: minum\r\n"[..]);
        buf.put(format!("content-type: {content_type}\r\n").as_bytes());
        buf.put(format!("content-length: {}\r\n", self.body.len()).as_bytes());

        for (name, value) in &self.extra_headers {
            if name == "content-type" {
                continue;
            }
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        if let Some(timeout) = keep_alive_timeout {
            buf.put(format!("keep-alive: timeout={timeout}\r\n").as_bytes());
        }

        buf.put(&b"\r\n"[..]);
        buf.put(&self.body[..]);

        buf
    }
}
