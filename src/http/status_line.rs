//! Status codes and status-line parsing — used when this core acts as an
//! HTTP client (the request side is [`crate::http::start_line`]).

use std::fmt;

use thiserror::Error;

use super::start_line::HttpVersion;

/// An HTTP response status code, restricted to the subset this system uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    Continue = 100,
    SwitchingProtocols = 101,

    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    PartialContent = 206,

    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,

    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    UnprocessableEntity = 422,
    TooManyRequests = 429,

    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Continue => "CONTINUE",
            Self::SwitchingProtocols => "SWITCHING PROTOCOLS",
            Self::Ok => "OK",
            Self::Created => "CREATED",
            Self::Accepted => "ACCEPTED",
            Self::NoContent => "NO CONTENT",
            Self::PartialContent => "PARTIAL CONTENT",
            Self::MovedPermanently => "MOVED PERMANENTLY",
            Self::Found => "FOUND",
            Self::SeeOther => "SEE OTHER",
            Self::NotModified => "NOT MODIFIED",
            Self::TemporaryRedirect => "TEMPORARY REDIRECT",
            Self::PermanentRedirect => "PERMANENT REDIRECT",
            Self::BadRequest => "BAD REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT FOUND",
            Self::MethodNotAllowed => "METHOD NOT ALLOWED",
            Self::Conflict => "CONFLICT",
            Self::Gone => "GONE",
            Self::LengthRequired => "LENGTH REQUIRED",
            Self::PayloadTooLarge => "PAYLOAD TOO LARGE",
            Self::UriTooLong => "URI TOO LONG",
            Self::UnsupportedMediaType => "UNSUPPORTED MEDIA TYPE",
            Self::UnprocessableEntity => "UNPROCESSABLE ENTITY",
            Self::TooManyRequests => "TOO MANY REQUESTS",
            Self::InternalServerError => "INTERNAL SERVER ERROR",
            Self::NotImplemented => "NOT IMPLEMENTED",
            Self::BadGateway => "BAD GATEWAY",
            Self::ServiceUnavailable => "SERVICE UNAVAILABLE",
            Self::GatewayTimeout => "GATEWAY TIMEOUT",
            Self::HttpVersionNotSupported => "HTTP VERSION NOT SUPPORTED",
        }
    }

    /// Looks up a `StatusCode` by its numeric value. `None` for any integer
    /// outside the enumerated subset.
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            100 => Self::Continue,
            101 => Self::SwitchingProtocols,
            200 => Self::Ok,
            201 => Self::Created,
            202 => Self::Accepted,
            204 => Self::NoContent,
            206 => Self::PartialContent,
            301 => Self::MovedPermanently,
            302 => Self::Found,
            303 => Self::SeeOther,
            304 => Self::NotModified,
            307 => Self::TemporaryRedirect,
            308 => Self::PermanentRedirect,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            409 => Self::Conflict,
            410 => Self::Gone,
            411 => Self::LengthRequired,
            413 => Self::PayloadTooLarge,
            414 => Self::UriTooLong,
            415 => Self::UnsupportedMediaType,
            422 => Self::UnprocessableEntity,
            429 => Self::TooManyRequests,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            505 => Self::HttpVersionNotSupported,
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// A parsed HTTP response status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub status: StatusCode,
    pub version: HttpVersion,
    pub raw_value: String,
}

/// Errors raised parsing a status line whose status code is not in the
/// enumerated subset. A line that does not match the status-line grammar at
/// all is a programmer error and panics instead (see [`extract`]).
#[derive(Debug, Error)]
pub enum StatusLineError {
    #[error("no such element: status code {code} is not recognized")]
    NoSuchElement { code: u16 },
}

const PATTERN_DESCRIPTION: &str = r"^HTTP/(1\.1|1\.0) (\d{3}) (.*)$";

/// Parses a response status line. A line that doesn't match
/// `^HTTP/(1\.1|1\.0) (\d{3}) (.*)$` is an invariant violation (this parser is
/// only ever handed lines we ourselves wrote, or trusted wire data) and
/// panics, quoting the line and the expected pattern. A line that matches the
/// grammar but names an unrecognized status code fails with
/// [`StatusLineError::NoSuchElement`].
pub fn extract(line: &str) -> Result<StatusLine, StatusLineError> {
    let Some((version, code_str, _reason)) = split_status_line(line) else {
        panic!("StatusLine::extract: line {line:?} does not match pattern {PATTERN_DESCRIPTION}");
    };

    let code: u16 = code_str
        .parse()
        .unwrap_or_else(|_| panic!("StatusLine::extract: non-numeric status code in {line:?}"));
    let status = StatusCode::from_u16(code).ok_or(StatusLineError::NoSuchElement { code })?;

    Ok(StatusLine {
        status,
        version,
        raw_value: line.to_string(),
    })
}

fn split_status_line(line: &str) -> Option<(HttpVersion, &str, &str)> {
    let rest = line.strip_prefix("HTTP/")?;
    let (version_str, rest) = rest.split_once(' ')?;
    let version = match version_str {
        "1.1" => HttpVersion::OneDotOne,
        "1.0" => HttpVersion::OneDotZero,
        _ => return None,
    };
    let (code, reason) = rest.split_once(' ')?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((version, code, reason))
}
