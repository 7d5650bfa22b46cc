//! # minum
//!
//! A from-scratch async HTTP/1.x server core: a byte-stream reader, start-line
//! and status-line parsers, a header parser, URL-encoded form and multipart
//! body decoders, an exact/longest-prefix router, and a connection handler
//! tying them together behind an injectable handler ABI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use minum::config::Config;
//! use minum::http::clock::SystemClock;
//! use minum::http::response::Response;
//! use minum::http::start_line::Verb;
//! use minum::router::Router;
//! use minum::server::Server;
//! use minum::server::connection;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.register(Verb::Get, "hello", |_req| async {
//!         Response::html_ok("Hello, World!")
//!     });
//!     let router = Arc::new(router);
//!     let config = Arc::new(Config::default());
//!
//!     let server = Server::start("127.0.0.1:0", move |stream, peer| {
//!         let router = Arc::clone(&router);
//!         let config = Arc::clone(&config);
//!         async move {
//!             let _ = connection::serve(stream, peer, &router, &config, &SystemClock).await;
//!         }
//!     })
//!     .await?;
//!     println!("listening on {}", server.local_addr());
//!     server.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod http;
pub mod router;
pub mod server;

pub use config::Config;
pub use http::{Body, Headers, Request, Response, StartLine, StatusCode, Verb};
pub use router::Router;
pub use server::{Server, ServerError};
