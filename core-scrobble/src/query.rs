//! Query string and form body encoding.
//!
//! Blank values are dropped, keys and values are percent-encoded (RFC 3986
//! unreserved characters pass through) and pairs are joined with `&` in key
//! order. Encoding runs on the already signed set.

use crate::signing::RequestParameters;

/// Encode `params` as `k=v&k=v` for a GET query string.
pub fn to_query_string(params: &RequestParameters) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode `params` as an `application/x-www-form-urlencoded` body.
pub fn to_form_body(params: &RequestParameters) -> String {
    to_query_string(params)
}
