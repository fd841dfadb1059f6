use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::Result;

// https://tools.ietf.org/html/rfc5849#section-3.6
// * ALPHA, DIGIT, '-', '.', '_', '~' MUST NOT be encoded.
// * All other characters MUST be encoded.
// * The two hexadecimal characters used to represent encoded
//   characters MUST be uppercase.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value as RFC 5849 section 3.6 requires.
pub fn percent_encode(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).into()
}

/// Serialize parameters into an `application/x-www-form-urlencoded` string.
pub fn qs_string<T: Serialize + ?Sized>(params: &T) -> Result<String> {
    Ok(serde_urlencoded::to_string(params)?)
}

/// Parse a form-encoded body into a map.
///
/// Empty segments are skipped, a key without `=` maps to an empty value,
/// and a repeated key keeps its last value.
pub fn string_qs(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

pub(crate) fn to_pairs<T: Serialize + ?Sized>(params: &T) -> Result<Vec<(String, String)>> {
    let encoded = qs_string(params)?;
    Ok(url::form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect())
}
