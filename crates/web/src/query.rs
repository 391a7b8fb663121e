//! Query strings as an ordered `key -> value` mapping.

use serde::de::DeserializeOwned;

/// The parsed query string of a request.
///
/// Keys and values are kept exactly as they appear on the wire, without
/// percent-decoding. [`Query::deserialize`] decodes into a typed value when
/// decoding is wanted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    raw: String,
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Parses the part of a URL after `?`.
    ///
    /// Pairs are split on `&` and each pair on its first `=`. A pair
    /// without `=` maps to an empty value, empty pairs are skipped and a
    /// repeated key keeps its first position with the last value.
    pub fn parse(query: &str) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match pairs.iter_mut().find(|(existing, _)| existing == key) {
                Some((_, existing)) => value.clone_into(existing),
                None => pairs.push((key.to_owned(), value.to_owned())),
            }
        }

        Self { raw: query.to_owned(), pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The query string as received.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Decodes the raw query string with `serde_urlencoded`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(&self.raw)
    }
}
