//! Explicit configuration, threaded by reference.
//!
//! The source this crate generalizes threads a process-wide "context" through
//! nearly every constructor. That global is replaced here with a plain
//! [`Config`] value the caller builds once (from whatever out-of-scope loader
//! the enclosing application uses — env, TOML, a flags parser) and passes by
//! reference to the parsers and the connection handler. No hidden global
//! state is reintroduced.

use serde::{Deserialize, Serialize};

/// The subset of `tracing` levels this crate's log sites use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Server limits and addressing, loaded by the (out-of-scope) configuration
/// source at startup and held immutably for the lifetime of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the plaintext (non-TLS) listener binds to.
    pub nonssl_server_port: u16,
    /// Port the TLS listener binds to. The core never terminates TLS itself
    /// (see [`crate::server::redirect`]) — this field exists so the redirect
    /// handler can build the `location` it points browsers at.
    pub ssl_server_port: u16,
    /// Hostname used when building the HTTPS redirect `location`.
    pub hostname: String,
    /// Directory the enclosing application's (out-of-scope) persistence
    /// layer would use. The core never reads or writes it; carried here
    /// only so `Config` is a drop-in for the full application config.
    pub dbdir: String,
    /// Maximum number of `&`-delimited pairs accepted in a query string.
    pub max_query_string_keys_count: usize,
    /// Maximum number of header lines accepted per message.
    pub max_headers: usize,
    /// Maximum cumulative byte size of header lines per message.
    pub max_header_bytes: usize,
    /// Maximum byte length of any single line (start line, header line,
    /// chunk-size line).
    pub max_line_bytes: usize,
    /// Maximum byte length of a request body, after any chunked decoding.
    pub max_body_bytes: usize,
    /// Keep-alive timeout advertised to clients and used as the socket read
    /// timeout.
    pub keep_alive_timeout_seconds: u64,
    /// Minimum level this crate's `tracing` events are emitted at. The
    /// subscriber itself remains the caller's concern.
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nonssl_server_port: 8080,
            ssl_server_port: 8443,
            hostname: "localhost".to_string(),
            dbdir: "db".to_string(),
            max_query_string_keys_count: 50,
            max_headers: 100,
            max_header_bytes: 64 * 1024,
            max_line_bytes: 8 * 1024,
            max_body_bytes: 10 * 1024 * 1024,
            keep_alive_timeout_seconds: 3,
            log_level: LogLevel::Info,
        }
    }
}
