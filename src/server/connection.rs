//! Per-connection request/response loop (component I).

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::http::body::Body;
use crate::http::clock::Clock;
use crate::http::form;
use crate::http::headers::{self, Headers, HeadersError};
use crate::http::multipart;
use crate::http::reader::{self, ReaderError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::start_line::{self, HttpVersion};
use crate::http::status_line::StatusCode;
use crate::router::Router;

/// The error taxonomy for [`read_body`]: either the byte-stream reader failed
/// (oversized/truncated body) or a header derived from the header block was
/// malformed (bad `content-length`). Kept distinct from [`ReaderError`]
/// itself so a bad `content-length` doesn't have to be disguised as a reader
/// failure to propagate.
#[derive(Debug, Error)]
enum BodyError {
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Headers(#[from] HeadersError),
}

/// Runs the request/response loop for one accepted connection until the
/// peer closes the socket, a `connection: close` is negotiated, or a parse
/// error forces the connection shut.
///
/// Per request:
/// 1. Read the start line; `None` closes the connection.
/// 2. Read headers until the blank line.
/// 3. Decide whether a body is present (§4.I.3) and decode it if so.
/// 4. Route to a handler; render `404` on a miss.
/// 5. Serialize and write the response.
/// 6. Decide keep-alive for the next iteration.
pub async fn serve<S>(
    mut stream: S,
    remote_requester: SocketAddr,
    router: &Router,
    config: &Config,
    clock: &dyn Clock,
) -> Result<(), std::io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let read_timeout = Duration::from_secs(config.keep_alive_timeout_seconds);

    loop {
        let line = match timeout(read_timeout, reader::read_line(&mut stream, config.max_line_bytes)).await {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                debug!(peer = %remote_requester, error = %e, "read failed, closing");
                return Ok(());
            }
            Err(_elapsed) => {
                debug!(peer = %remote_requester, timeout_secs = config.keep_alive_timeout_seconds, "read timed out, closing");
                return Ok(());
            }
        };

        let Some(line) = line else {
            debug!(peer = %remote_requester, "connection closed by peer");
            return Ok(());
        };

        let start_line = match start_line::extract(Some(&line), config) {
            Ok(sl) => sl,
            Err(e) => {
                warn!(peer = %remote_requester, error = %e, "forbidden-use error in start line");
                write_response(&mut stream, &Response::empty(StatusCode::BadRequest), clock, None).await?;
                return Ok(());
            }
        };

        let headers_result = timeout(
            read_timeout,
            headers::parse(&mut stream, config.max_line_bytes, config.max_headers, config.max_header_bytes),
        )
        .await;

        let parsed_headers = match headers_result {
            Ok(Ok(h)) => h,
            Ok(Err(e)) => {
                warn!(peer = %remote_requester, error = %e, "bad headers");
                let status = match e {
                    HeadersError::TooManyHeaders { .. } | HeadersError::TooManyBytes { .. } => {
                        StatusCode::PayloadTooLarge
                    }
                    _ => StatusCode::BadRequest,
                };
                write_response(&mut stream, &Response::empty(status), clock, None).await?;
                return Ok(());
            }
            Err(_elapsed) => {
                debug!(peer = %remote_requester, timeout_secs = config.keep_alive_timeout_seconds, "header read timed out, closing");
                return Ok(());
            }
        };

        let body_result = timeout(read_timeout, read_body(&mut stream, &parsed_headers, config)).await;

        let body = match body_result {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                warn!(peer = %remote_requester, error = %e, "bad body");
                let status = match e {
                    BodyError::Reader(ReaderError::BodyTooLarge { .. }) => StatusCode::PayloadTooLarge,
                    _ => StatusCode::BadRequest,
                };
                write_response(&mut stream, &Response::empty(status), clock, None).await?;
                return Ok(());
            }
            Err(_elapsed) => {
                debug!(peer = %remote_requester, timeout_secs = config.keep_alive_timeout_seconds, "body read timed out, closing");
                return Ok(());
            }
        };

        let keep_alive = decide_keep_alive(&start_line, &parsed_headers);

        let request = Request::new(start_line.clone(), parsed_headers, body, remote_requester);

        let response = match router.find(&start_line) {
            Some(handler) => handler(request).await,
            None => {
                debug!(peer = %remote_requester, path = %start_line.path_details.isolated_path, "no route, 404");
                Response::empty(StatusCode::NotFound)
            }
        };

        let keep_alive_timeout = keep_alive.then_some(config.keep_alive_timeout_seconds);
        write_response(&mut stream, &response, clock, keep_alive_timeout).await?;

        if !keep_alive {
            debug!(peer = %remote_requester, "connection: close negotiated");
            return Ok(());
        }
    }
}

async fn write_response<S>(
    stream: &mut S,
    response: &Response,
    clock: &dyn Clock,
    keep_alive_timeout: Option<u64>,
) -> Result<(), std::io::Error>
where
    S: AsyncWrite + Unpin,
{
    let bytes = response.serialize(clock, keep_alive_timeout);
    stream.write_all(&bytes).await?;
    stream.flush().await
}

/// §4.I.3: a body is present iff `transfer-encoding` contains `chunked`, or
/// `content-type` is present and `content-length` is present and greater
/// than zero. A `content-type` with no usable framing header is *not* a
/// body — preserved exactly as written even though RFC-strict readers would
/// reject it (open question, §9). A malformed `content-length` is only an
/// error when it would otherwise matter (`content-type` present) — surfaced
/// to the caller rather than silently treated as "no body".
fn has_body(headers: &Headers) -> Result<bool, HeadersError> {
    if headers.is_chunked() {
        return Ok(true);
    }
    if headers.content_type().is_none() {
        return Ok(false);
    }
    Ok(headers.content_length()? > 0)
}

async fn read_body<S>(stream: &mut S, headers: &Headers, config: &Config) -> Result<Body, BodyError>
where
    S: AsyncRead + Unpin,
{
    if !has_body(headers)? {
        return Ok(Body::empty());
    }

    let raw = if headers.is_chunked() {
        reader::read_chunked(stream, config.max_line_bytes, config.max_body_bytes).await?
    } else {
        let content_length = headers.content_length()? as usize;
        reader::read_exact(stream, content_length, config.max_body_bytes).await?
    };

    let content_type = headers.content_type().unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        if let Some(boundary) = multipart::boundary_from_content_type(content_type) {
            if let Ok(decoded) = multipart::decode(&raw, &boundary) {
                return Ok(Body {
                    parts: decoded.parts,
                    partition_headers: decoded.partition_headers,
                    raw: bytes::Bytes::new(),
                });
            }
        }
        return Ok(Body::from_raw(raw));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        if let Ok(text) = std::str::from_utf8(&raw) {
            if let Ok(pairs) = form::parse(text) {
                let mut parts = std::collections::HashMap::new();
                for (key, value) in pairs {
                    parts.insert(key, bytes::Bytes::from(value.into_bytes()));
                }
                return Ok(Body {
                    parts,
                    partition_headers: std::collections::HashMap::new(),
                    raw,
                });
            }
        }
        return Ok(Body::from_raw(raw));
    }

    Ok(Body::from_raw(raw))
}

/// §4.I.7: HTTP/1.1 keeps the connection alive unless `connection: close`
/// was sent; HTTP/1.0 keeps it alive only if `connection: keep-alive` was
/// sent.
fn decide_keep_alive(start_line: &start_line::StartLine, headers: &Headers) -> bool {
    let connection = headers.value_by_key("connection").map(str::to_ascii_lowercase);

    match start_line.version {
        Some(HttpVersion::OneDotOne) | None => connection.as_deref() != Some("close"),
        Some(HttpVersion::OneDotZero) => connection.as_deref() == Some("keep-alive"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::clock::FixedClock;
    use std::time::SystemTime;
    use tokio::io::duplex;

    fn clock() -> FixedClock {
        FixedClock(SystemTime::UNIX_EPOCH)
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn http11_defaults_to_keep_alive() {
        let config = Config::default();
        let sl = start_line::extract(Some("GET / HTTP/1.1"), &config).unwrap();
        assert!(decide_keep_alive(&sl, &Headers::new()));
    }

    #[test]
    fn http11_closes_on_connection_close() {
        let config = Config::default();
        let sl = start_line::extract(Some("GET / HTTP/1.1"), &config).unwrap();
        let mut headers = Headers::new();
        headers.push("connection", "close");
        assert!(!decide_keep_alive(&sl, &headers));
    }

    #[test]
    fn http10_defaults_to_close() {
        let config = Config::default();
        let sl = start_line::extract(Some("GET / HTTP/1.0"), &config).unwrap();
        assert!(!decide_keep_alive(&sl, &Headers::new()));
    }

    #[test]
    fn http10_keeps_alive_when_requested() {
        let config = Config::default();
        let sl = start_line::extract(Some("GET / HTTP/1.0"), &config).unwrap();
        let mut headers = Headers::new();
        headers.push("connection", "keep-alive");
        assert!(decide_keep_alive(&sl, &headers));
    }

    #[test]
    fn content_type_without_framing_is_no_body() {
        let mut headers = Headers::new();
        headers.push("content-type", "application/json");
        assert!(!has_body(&headers).unwrap());
    }

    #[test]
    fn zero_content_length_is_no_body() {
        let mut headers = Headers::new();
        headers.push("content-type", "application/json");
        headers.push("content-length", "0");
        assert!(!has_body(&headers).unwrap());
    }

    #[test]
    fn chunked_is_a_body_regardless_of_content_type() {
        let mut headers = Headers::new();
        headers.push("transfer-encoding", "chunked");
        assert!(has_body(&headers).unwrap());
    }

    #[test]
    fn bad_content_length_without_content_type_is_no_body() {
        // No usable framing regardless of what content-length says (§9 open
        // question) — the malformed value is never even inspected.
        let mut headers = Headers::new();
        headers.push("content-length", "abc");
        assert!(!has_body(&headers).unwrap());
    }

    #[test]
    fn bad_content_length_with_content_type_is_an_error() {
        let mut headers = Headers::new();
        headers.push("content-type", "application/json");
        headers.push("content-length", "abc");
        assert!(matches!(has_body(&headers), Err(HeadersError::BadContentLength { .. })));
    }

    #[tokio::test]
    async fn bad_content_length_surfaces_as_bad_request() {
        let router = Router::new();
        let config = Config::default();
        let (mut client, server_side) = duplex(4096);
        client
            .write_all(b"POST /x HTTP/1.1\r\ncontent-type: application/json\r\ncontent-length: abc\r\n\r\n")
            .await
            .unwrap();

        let handle = tokio::spawn(async move {
            serve(server_side, peer(), &router, &config, &clock()).await.unwrap();
        });

        let mut out = Vec::new();
        client.shutdown().await.unwrap();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out).await.unwrap();
        handle.await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 BAD REQUEST\r\n"));
    }

    #[tokio::test]
    async fn idle_connection_closes_after_read_timeout() {
        let router = Router::new();
        let mut config = Config::default();
        config.keep_alive_timeout_seconds = 1;
        let (client, server_side) = duplex(4096);

        let handle = tokio::spawn(async move {
            serve(server_side, peer(), &router, &config, &clock()).await.unwrap();
        });

        // The client stays open and silent — only the read timeout, never a
        // peer-initiated close, should end this connection.
        let result = timeout(Duration::from_secs(3), handle).await;
        drop(client);
        result
            .expect("server did not close the idle connection before its own timeout")
            .unwrap();
    }

    #[tokio::test]
    async fn scenario_one_query_endpoint_round_trip() {
        let mut router = Router::new();
        router.register(crate::http::start_line::Verb::Get, "add_two_numbers", |req: Request| async move {
            let a: i64 = req.query_param("a").unwrap_or("0").parse().unwrap_or(0);
            let b: i64 = req.query_param("b").unwrap_or("0").parse().unwrap_or(0);
            Response::html_ok((a + b).to_string())
        });

        let config = Config::default();
        let (mut client, server_side) = duplex(4096);
        client
            .write_all(b"GET /add_two_numbers?a=42&b=44 HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let handle = tokio::spawn(async move {
            serve(server_side, peer(), &router, &config, &clock()).await.unwrap();
        });

        let mut out = Vec::new();
        client.shutdown().await.unwrap();
        tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out).await.unwrap();
        handle.await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\n86"));
    }
}
