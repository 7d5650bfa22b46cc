//! The request model handlers receive: a parsed start line, headers, a
//! decoded body, and the peer address.

use std::net::SocketAddr;

use super::body::Body;
use super::headers::Headers;
use super::start_line::StartLine;

/// A fully parsed, fully decoded HTTP request. Created per-request by the
/// connection handler and discarded once the handler returns.
#[derive(Debug, Clone)]
pub struct Request {
    pub start_line: StartLine,
    pub headers: Headers,
    pub body: Body,
    pub remote_requester: SocketAddr,
}

impl Request {
    pub fn new(start_line: StartLine, headers: Headers, body: Body, remote_requester: SocketAddr) -> Self {
        Self {
            start_line,
            headers,
            body,
            remote_requester,
        }
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.start_line.path_details.query_pairs.get(key).map(String::as_str)
    }
}
