//! Start-line parsing — verb, path, query string, and version.
//!
//! Deliberately lenient: malformed input yields [`StartLine::empty`] rather
//! than an error, so the router can cleanly emit `404` for garbage (see the
//! error-handling design notes). The one exception is a query string with
//! more pairs than the configured cap, which is a forbidden-use error.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::config::Config;

/// The closed set of HTTP methods this core understands. Anything else is a
/// parse failure — there is no `Custom` escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
            Verb::Head => "HEAD",
            Verb::Options => "OPTIONS",
            Verb::Trace => "TRACE",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            "PATCH" => Ok(Verb::Patch),
            "HEAD" => Ok(Verb::Head),
            "OPTIONS" => Ok(Verb::Options),
            "TRACE" => Ok(Verb::Trace),
            _ => Err(()),
        }
    }
}

/// The two HTTP versions this core speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    OneDotZero,
    OneDotOne,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVersion::OneDotZero => "HTTP/1.0",
            HttpVersion::OneDotOne => "HTTP/1.1",
        }
    }
}

impl std::str::FromStr for HttpVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/1.0" => Ok(HttpVersion::OneDotZero),
            "HTTP/1.1" => Ok(HttpVersion::OneDotOne),
            _ => Err(()),
        }
    }
}

/// The path, split from its query string, with the query decoded into pairs.
///
/// `isolated_path` never begins with `/` — the leading slash is stripped
/// during parsing — and `"/"` parses to an empty `isolated_path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathDetails {
    pub isolated_path: String,
    pub raw_query_string: String,
    pub query_pairs: BTreeMap<String, String>,
}

/// The first line of an HTTP request, e.g. `GET /path HTTP/1.1`.
///
/// Equality and hashing are defined over `(verb, path_details, version)` —
/// `raw_value` is excluded — so the distinguished empty sentinel compares
/// equal to itself regardless of which malformed input produced it.
#[derive(Debug, Clone)]
pub struct StartLine {
    pub verb: Option<Verb>,
    pub path_details: PathDetails,
    pub version: Option<HttpVersion>,
    pub raw_value: String,
}

impl StartLine {
    /// The distinguished empty sentinel: all fields empty/default. Returned
    /// whenever `extract` cannot make sense of its input.
    pub fn empty() -> Self {
        Self {
            verb: None,
            path_details: PathDetails::default(),
            version: None,
            raw_value: String::new(),
        }
    }

    /// `true` for the empty sentinel, regardless of how it was produced.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

impl PartialEq for StartLine {
    fn eq(&self, other: &Self) -> bool {
        self.verb == other.verb && self.path_details == other.path_details && self.version == other.version
    }
}

impl Eq for StartLine {}

impl Hash for StartLine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.verb.hash(state);
        self.path_details.hash(state);
        self.version.hash(state);
    }
}

/// Errors that stop start-line parsing outright — everything else folds into
/// [`StartLine::empty`].
#[derive(Debug, Error)]
pub enum StartLineError {
    #[error("query string has more than {max} keys")]
    TooManyQueryKeys { max: usize },
}

/// Parses a start line. `line` being `None` is a programmer error (a caller
/// handed us a stream that produced no line at all) and panics; a present but
/// malformed `line` yields [`StartLine::empty`] rather than an error.
pub fn extract(line: Option<&str>, config: &Config) -> Result<StartLine, StartLineError> {
    let line = line.expect("StartLine::extract called with no line — caller invariant violated");

    let Some((verb_str, target, version_str)) = split_request_line(line) else {
        return Ok(StartLine::empty());
    };

    let Ok(verb) = verb_str.parse::<Verb>() else {
        return Ok(StartLine::empty());
    };
    let Ok(version) = version_str.parse::<HttpVersion>() else {
        return Ok(StartLine::empty());
    };

    let path_details = parse_path_details(target, config)?;

    Ok(StartLine {
        verb: Some(verb),
        path_details,
        version: Some(version),
        raw_value: line.to_string(),
    })
}

/// Splits `METHOD /target HTTP/x.y` into its three tokens. Requires the
/// target to begin with `/`, matching `^(verb) /([^ ]*) HTTP/(1\.1|1\.0)$`.
fn split_request_line(line: &str) -> Option<(&str, &str, &str)> {
    if line.is_empty() {
        return None;
    }
    let mut parts = line.splitn(3, ' ');
    let verb = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if !target.starts_with('/') {
        return None;
    }
    Some((verb, target, version))
}

fn parse_path_details(target: &str, config: &Config) -> Result<PathDetails, StartLineError> {
    let without_leading_slash = &target[1..];
    let (isolated_path, raw_query_string) = match without_leading_slash.find('?') {
        Some(pos) => (&without_leading_slash[..pos], &without_leading_slash[pos + 1..]),
        None => (without_leading_slash, ""),
    };

    let mut query_pairs = BTreeMap::new();
    if !raw_query_string.is_empty() {
        let mut pair_count = 0usize;
        for pair in raw_query_string.split('&') {
            // Pairs with no `=` are silently dropped and don't count against
            // the cap — the cap is on query pairs, not `&`-delimited tokens.
            let Some(eq) = pair.find('=') else {
                continue;
            };

            pair_count += 1;
            if pair_count > config.max_query_string_keys_count {
                return Err(StartLineError::TooManyQueryKeys {
                    max: config.max_query_string_keys_count,
                });
            }

            let (key, value) = (&pair[..eq], &pair[eq + 1..]);
            query_pairs.insert(key.to_string(), value.to_string());
        }
    }

    Ok(PathDetails {
        isolated_path: isolated_path.to_string(),
        raw_query_string: raw_query_string.to_string(),
        query_pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn parses_simple_get() {
        let sl = extract(Some("GET /hello HTTP/1.1"), &config()).unwrap();
        assert_eq!(sl.verb, Some(Verb::Get));
        assert_eq!(sl.version, Some(HttpVersion::OneDotOne));
        assert_eq!(sl.path_details.isolated_path, "hello");
    }

    #[test]
    fn root_path_has_empty_isolated_path() {
        let sl = extract(Some("GET / HTTP/1.1"), &config()).unwrap();
        assert_eq!(sl.path_details.isolated_path, "");
    }

    #[test]
    fn parses_query_pairs() {
        let sl = extract(Some("GET /add_two_numbers?a=42&b=44 HTTP/1.1"), &config()).unwrap();
        assert_eq!(sl.path_details.isolated_path, "add_two_numbers");
        assert_eq!(sl.path_details.query_pairs.get("a").map(String::as_str), Some("42"));
        assert_eq!(sl.path_details.query_pairs.get("b").map(String::as_str), Some("44"));
    }

    #[test]
    fn pairs_without_equals_are_dropped() {
        let sl = extract(Some("GET /x?a&b=1 HTTP/1.1"), &config()).unwrap();
        assert_eq!(sl.path_details.query_pairs.len(), 1);
        assert_eq!(sl.path_details.query_pairs.get("b").map(String::as_str), Some("1"));
    }

    #[test]
    fn unknown_verb_is_empty_sentinel() {
        let sl = extract(Some("FROB / HTTP/1.1"), &config()).unwrap();
        assert!(sl.is_empty());
    }

    #[test]
    fn unknown_version_is_empty_sentinel() {
        let sl = extract(Some("GET / HTTP/2.0"), &config()).unwrap();
        assert!(sl.is_empty());
    }

    #[test]
    fn missing_path_slash_is_empty_sentinel() {
        let sl = extract(Some("GET nowhere HTTP/1.1"), &config()).unwrap();
        assert!(sl.is_empty());
    }

    #[test]
    fn empty_string_is_empty_sentinel() {
        let sl = extract(Some(""), &config()).unwrap();
        assert!(sl.is_empty());
    }

    #[test]
    #[should_panic]
    fn null_input_is_invariant_violation() {
        let _ = extract(None, &config());
    }

    #[test]
    fn empty_sentinel_is_a_fixed_point() {
        // Parsing the "serialization" of malformed input twice yields the same sentinel.
        let a = extract(Some("garbage"), &config()).unwrap();
        let b = extract(Some("also garbage"), &config()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, StartLine::empty());
    }

    #[test]
    fn too_many_query_keys_is_forbidden_use_error() {
        let mut cfg = config();
        cfg.max_query_string_keys_count = 2;
        let err = extract(Some("GET /x?a=1&b=2&c=3 HTTP/1.1"), &cfg).unwrap_err();
        assert!(matches!(err, StartLineError::TooManyQueryKeys { max: 2 }));
    }

    #[test]
    fn dropped_pairs_do_not_count_against_the_query_key_cap() {
        // Three `&`-delimited tokens, but only two actual `key=value` pairs —
        // this must not trip a cap of 2.
        let mut cfg = config();
        cfg.max_query_string_keys_count = 2;
        let sl = extract(Some("GET /x?a=1&noequals&b=2 HTTP/1.1"), &cfg).unwrap();
        assert_eq!(sl.path_details.query_pairs.len(), 2);
    }

    #[test]
    fn well_known_prefix_path_splits_correctly() {
        let sl = extract(
            Some("GET /.well-known/acme-challenge/foobar HTTP/1.1"),
            &config(),
        )
        .unwrap();
        assert_eq!(sl.path_details.isolated_path, ".well-known/acme-challenge/foobar");
    }
}
