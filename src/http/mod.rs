//! HTTP/1.x protocol types and parsing: the byte-stream reader, start-line
//! and status-line parsers, the header parser, the URL-encoded form and
//! multipart body decoders, and the request/response model.

pub mod body;
pub mod clock;
pub mod form;
pub mod headers;
pub mod multipart;
pub mod reader;
pub mod request;
pub mod response;
pub mod start_line;
pub mod status_line;

pub use body::Body;
pub use headers::Headers;
pub use request::Request;
pub use response::Response;
pub use start_line::{HttpVersion, StartLine, Verb};
pub use status_line::StatusCode;
