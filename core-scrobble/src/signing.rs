//! Request Signing
//!
//! Every authenticated call carries an `api_sig` parameter: the MD5 of all
//! other parameters, sorted by key and concatenated as `keyvalue`, followed by
//! the shared secret. The digest is rendered as uppercase hex.

use md5::{Digest, Md5};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Name of the signature parameter
pub const SIGNATURE_PARAM: &str = "api_sig";

/// Parameter set for one request.
///
/// Keys are unique and iterate in byte order, which is the order the
/// signature is computed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters(BTreeMap<String, String>);

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume the unsigned set and return it with `api_sig` appended.
    ///
    /// Any `api_sig` already present is replaced, never signed over.
    pub fn signed(mut self, secret: &str) -> Self {
        self.0.remove(SIGNATURE_PARAM);
        let signature = sign(&self, secret);
        self.0.insert(SIGNATURE_PARAM.to_string(), signature);
        self
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for RequestParameters {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Compute the request signature over `params` and `secret`.
///
/// Pure: the result depends only on the key/value pairs, never on the order
/// they were inserted in. An `api_sig` entry in `params` is ignored.
pub fn sign(params: &RequestParameters, secret: &str) -> String {
    let mut hasher = Md5::new();

    for (key, value) in params.iter().filter(|(key, _)| *key != SIGNATURE_PARAM) {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.update(secret.as_bytes());

    format!("{:X}", hasher.finalize())
}
