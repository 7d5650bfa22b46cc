//! Plaintext-port redirect handler (component J): a single-shot read of the
//! first line, answered with a `303 SEE OTHER` pointing at the HTTPS host.
//! This core never terminates TLS itself — this handler exists only to bump
//! a browser from the plaintext listener onto the TLS one.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::config::Config;
use crate::http::clock::Clock;
use crate::http::reader;
use crate::http::status_line::StatusCode;

/// Reads one line from `stream`. If it is absent or empty, returns without
/// writing anything. Otherwise writes a `303 SEE OTHER` with a `location`
/// pointing at `https://<hostname>:<ssl_server_port>`.
pub async fn handle<S>(mut stream: S, config: &Config, clock: &dyn Clock) -> Result<(), std::io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let line = reader::read_line(&mut stream, config.max_line_bytes).await.ok().flatten();

    let Some(line) = line else {
        debug!("redirect handler got no input, writing nothing");
        return Ok(());
    };

    if line.is_empty() {
        debug!("redirect handler got an empty line, writing nothing");
        return Ok(());
    }

    let location = format!("https://{}:{}", config.hostname, config.ssl_server_port);

    let mut buf = Vec::new();
    buf.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", StatusCode::SeeOther.as_u16(), StatusCode::SeeOther.canonical_reason()).as_bytes());
    buf.extend_from_slice(format!("date: {}\r\n", clock.now_http_date()).as_bytes());
    buf.extend_from_slice(b"server: minum\r\n");
    buf.extend_from_slice(format!("location: {location}\r\n").as_bytes());
    buf.extend_from_slice(b"content-length: 0\r\n\r\n");

    stream.write_all(&buf).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::clock::FixedClock;
    use std::time::SystemTime;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt as _};

    fn clock() -> FixedClock {
        FixedClock(SystemTime::UNIX_EPOCH)
    }

    #[tokio::test]
    async fn non_empty_line_produces_303() {
        let config = Config::default();
        let (mut client, server_side) = duplex(1024);
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        client.shutdown().await.unwrap();

        handle(server_side, &config, &clock()).await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("303 SEE OTHER"));
        assert!(text.contains("location: https://localhost:8443\r\n"));
    }

    #[tokio::test]
    async fn empty_line_writes_nothing() {
        let config = Config::default();
        let (mut client, server_side) = duplex(1024);
        client.write_all(b"\r\n").await.unwrap();
        client.shutdown().await.unwrap();

        handle(server_side, &config, &clock()).await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn closed_socket_writes_nothing() {
        let config = Config::default();
        let (mut client, server_side) = duplex(1024);
        client.shutdown().await.unwrap();

        handle(server_side, &config, &clock()).await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
