//! Byte-stream reader — line reads with CR/LF tolerance, bounded reads, and the
//! chunked-transfer decoder (RFC 7230 §4.1).
//!
//! Every operation here suspends at exactly the points the source describes as
//! blocking reads; wrapping them in `async fn` over [`tokio::io::AsyncRead`]
//! realizes that suspension as an `.await` point instead of a blocked OS
//! thread, per the concurrency model's invitation to substitute suspension
//! points on an async runtime without changing semantics.

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Errors raised while reading from the byte stream.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("line exceeds maximum of {max} bytes")]
    LineTooLong { max: usize },

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("stream closed unexpectedly while reading")]
    Incomplete,

    #[error("body of {requested} bytes exceeds maximum of {max} bytes")]
    BodyTooLarge { requested: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads one line from `reader`, stopping at the next `\n`.
///
/// A trailing `\r` is stripped so both `\r\n` and bare `\n` line terminators
/// are accepted on input (output always emits `\r\n` — see [`crate::http::response`]).
/// The line is capped at `max_line_bytes`; exceeding it is a bad-input error.
/// Returns `Ok(None)` on a clean end-of-stream with zero bytes read.
pub async fn read_line<R>(reader: &mut R, max_line_bytes: usize) -> Result<Option<String>, ReaderError>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut read_any = false;

    loop {
        let mut byte = [0u8; 1];
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            if !read_any {
                return Ok(None);
            }
            break;
        }
        read_any = true;
        if byte[0] == b'\n' {
            break;
        }
        if line.len() >= max_line_bytes {
            return Err(ReaderError::LineTooLong { max: max_line_bytes });
        }
        line.push(byte[0]);
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }

    String::from_utf8(line).map(Some).map_err(|_| ReaderError::InvalidUtf8)
}

/// Reads exactly `n` bytes from `reader`, bounded by `max_bytes` (the
/// content-length cap). Fails if `n` exceeds the cap or the stream closes
/// before `n` bytes arrive.
pub async fn read_exact<R>(reader: &mut R, n: usize, max_bytes: usize) -> Result<Bytes, ReaderError>
where
    R: AsyncRead + Unpin,
{
    if n > max_bytes {
        return Err(ReaderError::BodyTooLarge {
            requested: n,
            max: max_bytes,
        });
    }
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf).await.map_err(|_| ReaderError::Incomplete)?;
    Ok(Bytes::from(buf))
}

/// Decodes a `Transfer-Encoding: chunked` body per RFC 7230 §4.1.
///
/// Repeatedly reads a chunk-size line (hex length before any `;` chunk
/// extension), reads that many payload bytes, and consumes the trailing
/// `\r\n`. Terminates on a zero-length chunk, then consumes any trailer
/// headers up to the blank line that ends the message. Binary-safe — the
/// accumulated payload is never interpreted as text.
pub async fn read_chunked<R>(
    reader: &mut R,
    max_line_bytes: usize,
    max_body_bytes: usize,
) -> Result<Bytes, ReaderError>
where
    R: AsyncRead + Unpin,
{
    let mut out = BytesMut::new();

    loop {
        let line = read_line(reader, max_line_bytes).await?.ok_or(ReaderError::Incomplete)?;
        let size_str = line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16).map_err(|_| ReaderError::Incomplete)?;

        if size == 0 {
            // Drain trailer headers, if any, up to the blank line.
            loop {
                let trailer = read_line(reader, max_line_bytes).await?.ok_or(ReaderError::Incomplete)?;
                if trailer.is_empty() {
                    break;
                }
            }
            break;
        }

        if out.len() + size > max_body_bytes {
            return Err(ReaderError::BodyTooLarge {
                requested: out.len() + size,
                max: max_body_bytes,
            });
        }

        let mut chunk = vec![0u8; size];
        reader
            .read_exact(&mut chunk)
            .await
            .map_err(|_| ReaderError::Incomplete)?;
        out.extend_from_slice(&chunk);

        let mut crlf = [0u8; 2];
        reader
            .read_exact(&mut crlf)
            .await
            .map_err(|_| ReaderError::Incomplete)?;
        if &crlf != b"\r\n" {
            return Err(ReaderError::Incomplete);
        }
    }

    Ok(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn read_line_strips_crlf() {
        let mut cursor = Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n".to_vec());
        let line = read_line(&mut cursor, 1024).await.unwrap().unwrap();
        assert_eq!(line, "GET / HTTP/1.1");
    }

    #[tokio::test]
    async fn read_line_accepts_bare_lf() {
        let mut cursor = Cursor::new(b"one\ntwo\n".to_vec());
        assert_eq!(read_line(&mut cursor, 1024).await.unwrap().unwrap(), "one");
        assert_eq!(read_line(&mut cursor, 1024).await.unwrap().unwrap(), "two");
    }

    #[tokio::test]
    async fn read_line_eof_returns_none() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_line(&mut cursor, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_line_too_long_errors() {
        let mut cursor = Cursor::new(vec![b'a'; 20]);
        let err = read_line(&mut cursor, 8).await.unwrap_err();
        assert!(matches!(err, ReaderError::LineTooLong { max: 8 }));
    }

    #[tokio::test]
    async fn read_exact_reads_bytes() {
        let mut cursor = Cursor::new(b"hello world".to_vec());
        let bytes = read_exact(&mut cursor, 5, 1024).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn read_exact_rejects_over_cap() {
        let mut cursor = Cursor::new(b"hello".to_vec());
        let err = read_exact(&mut cursor, 5, 4).await.unwrap_err();
        assert!(matches!(err, ReaderError::BodyTooLarge { .. }));
    }

    #[tokio::test]
    async fn chunked_decode_matches_rfc_example() {
        let raw = b"4\r\nWiki\r\n6\r\npedia \r\nE\r\nin \r\n\r\nchunks.\r\n0\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let decoded = read_chunked(&mut cursor, 1024, 1_000_000).await.unwrap();
        assert_eq!(&decoded[..], b"Wikipedia in \r\n\r\nchunks.");
    }

    #[tokio::test]
    async fn chunked_decode_sums_to_total_length() {
        // Build a chunked stream out of three chunks of known total length.
        let payloads: [&[u8]; 3] = [b"abc", b"defgh", b"ij"];
        let mut raw = Vec::new();
        for p in &payloads {
            raw.extend_from_slice(format!("{:x}\r\n", p.len()).as_bytes());
            raw.extend_from_slice(p);
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"0\r\n\r\n");

        let mut cursor = Cursor::new(raw);
        let decoded = read_chunked(&mut cursor, 1024, 1_000_000).await.unwrap();
        let expected: Vec<u8> = payloads.concat();
        assert_eq!(decoded.len(), expected.len());
        assert_eq!(&decoded[..], &expected[..]);
    }

    #[tokio::test]
    async fn chunked_decode_rejects_oversized_body() {
        let raw = b"10\r\n0123456789abcdef\r\n0\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = read_chunked(&mut cursor, 1024, 8).await.unwrap_err();
        assert!(matches!(err, ReaderError::BodyTooLarge { .. }));
    }
}
