//! `application/x-www-form-urlencoded` body parsing.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors raised parsing a URL-encoded form body. The messages are part of
/// the observable contract — callers match on them, not just the variant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("The key must not be blank")]
    BlankKey,

    #[error("{key} was duplicated in the post body - had values of {first} and {second}")]
    DuplicateKey { key: String, first: String, second: String },

    #[error("token {token:?} has no '=' separator")]
    MissingEquals { token: String },

    #[error("percent-decoding failed for {token:?}")]
    BadPercentEncoding { token: String },
}

/// Parses `body` as `application/x-www-form-urlencoded`: split on `&`, then
/// each token on the first `=`.
///
/// - A token with no `=` is a parse error.
/// - A blank key (token starts with `=`) fails with [`FormError::BlankKey`].
/// - A blank value (token ends with `=`) maps the key to the empty string.
/// - A value of literal `%NULL%` normalizes to the empty string.
/// - A repeated key fails with [`FormError::DuplicateKey`].
/// - Keys and values are otherwise percent-decoded as UTF-8. `+` is taken
///   literally — this parser does not substitute it for space.
pub fn parse(body: &str) -> Result<BTreeMap<String, String>, FormError> {
    let mut map = BTreeMap::new();

    if body.is_empty() {
        return Ok(map);
    }

    for token in body.split('&') {
        let Some(eq) = token.find('=') else {
            return Err(FormError::MissingEquals {
                token: token.to_string(),
            });
        };

        let raw_key = &token[..eq];
        let raw_value = &token[eq + 1..];

        if raw_key.is_empty() {
            return Err(FormError::BlankKey);
        }

        let key = percent_decode(raw_key)?;
        let value = if raw_value == "%NULL%" {
            String::new()
        } else {
            percent_decode(raw_value)?
        };

        if let Some(existing) = map.get(&key) {
            return Err(FormError::DuplicateKey {
                key,
                first: existing.clone(),
                second: value,
            });
        }

        map.insert(key, value);
    }

    Ok(map)
}

fn percent_decode(token: &str) -> Result<String, FormError> {
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    return Err(FormError::BadPercentEncoding {
                        token: token.to_string(),
                    });
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| FormError::BadPercentEncoding {
        token: token.to_string(),
    })
}
