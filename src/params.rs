//! Path and query parameters carried by matched segments.
//!
//! - [`RouteParams`]: values captured from dynamic segments (`:id` in
//!   `users/:id`). Nested matches inherit their parent's values through
//!   [`merge`](RouteParams::merge).
//! - [`QueryParams`]: the `?key=value&...` part of a location. Keys may
//!   repeat (`?tag=a&tag=b`).
//!
//! Both use ordered maps so that two matches of the same location compare
//! equal and serialize identically. The reconciler relies on that equality
//! to recognise a stack that already mirrors its target.
//!
//! # Example
//!
//! ```
//! use route_reconciler::{QueryParams, RouteParams};
//!
//! let mut params = RouteParams::new();
//! params.insert("id", "42");
//! assert_eq!(params.get_as::<u32>("id"), Some(42));
//!
//! let query = QueryParams::from_query_string("page=1&sort=name");
//! assert_eq!(query.get("sort"), Some("name"));
//! assert_eq!(query.to_query_string(), "page=1&sort=name");
//! ```

use std::collections::BTreeMap;

/// Parameters extracted from dynamic path segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteParams {
    params: BTreeMap<String, String>,
}

impl RouteParams {
    /// Create empty route parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over all `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Merge parent parameters with child parameters.
    ///
    /// Child values win on collision.
    ///
    /// ```
    /// use route_reconciler::RouteParams;
    ///
    /// let mut parent = RouteParams::new();
    /// parent.insert("workspace", "7");
    /// parent.insert("view", "list");
    ///
    /// let mut child = RouteParams::new();
    /// child.insert("view", "grid");
    ///
    /// let merged = RouteParams::merge(&parent, &child);
    /// assert_eq!(merged.get("workspace"), Some("7"));
    /// assert_eq!(merged.get("view"), Some("grid"));
    /// ```
    pub fn merge(parent: &RouteParams, child: &RouteParams) -> RouteParams {
        let mut merged = parent.clone();
        for (key, value) in &child.params {
            merged.params.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Query parameters parsed from a location's query string.
///
/// Supports multiple values for the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create empty query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a query string (without the leading `?`).
    ///
    /// Pairs without `=` are kept as keys with an empty value.
    pub fn from_query_string(query: &str) -> Self {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(decode_uri_component(key))
                .or_default()
                .push(decode_uri_component(value));
        }

        Self { params }
    }

    /// Get the first value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Get all values for a key.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Get the first value for a key, parsed as type `T`.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value for the given key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Serialize back into a query string, keys in sorted order.
    pub fn to_query_string(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    format!(
                        "{}={}",
                        encode_uri_component(key),
                        encode_uri_component(value)
                    )
                })
            })
            .collect();

        pairs.join("&")
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of unique parameter keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Value of one ASCII hex digit. Signs and other characters are rejected.
fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).and_then(|v| u8::try_from(v).ok())
}

fn decode_uri_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(high), Some(low)) => {
                    decoded.push((high << 4) | low);
                    i += 3;
                }
                _ => {
                    decoded.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_basic() {
        let mut params = RouteParams::new();
        params.insert("id", "123");

        assert_eq!(params.get("id"), Some("123"));
        assert!(params.contains("id"));
        assert!(!params.contains("missing"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_route_params_get_as() {
        let params: RouteParams = [("id", "123"), ("active", "true")].into_iter().collect();

        assert_eq!(params.get_as::<i32>("id"), Some(123));
        assert_eq!(params.get_as::<bool>("active"), Some(true));
        assert_eq!(params.get_as::<i32>("missing"), None);
    }

    #[test]
    fn test_route_params_equality_ignores_insertion_order() {
        let a: RouteParams = [("a", "1"), ("b", "2")].into_iter().collect();
        let b: RouteParams = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_params_multiple_values() {
        let query = QueryParams::from_query_string("tag=rust&tag=ui&page=2");

        assert_eq!(query.get_all("tag").map(<[String]>::len), Some(2));
        assert_eq!(query.get("tag"), Some("rust"));
        assert_eq!(query.get_as::<u32>("page"), Some(2));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_query_params_flag_without_value() {
        let query = QueryParams::from_query_string("debug&page=1");
        assert_eq!(query.get("debug"), Some(""));
    }

    #[test]
    fn test_uri_encoding() {
        assert_eq!(encode_uri_component("hello world"), "hello%20world");
        assert_eq!(encode_uri_component("a@b"), "a%40b");
        assert_eq!(encode_uri_component("é"), "%C3%A9");
    }

    #[test]
    fn test_uri_decoding() {
        assert_eq!(decode_uri_component("hello%20world"), "hello world");
        assert_eq!(decode_uri_component("hello+world"), "hello world");
        assert_eq!(decode_uri_component("%C3%A9"), "é");
        assert_eq!(decode_uri_component("100%"), "100%");
        assert_eq!(decode_uri_component("%2f%2F"), "//");
    }

    #[test]
    fn test_uri_decoding_rejects_signed_escapes() {
        assert_eq!(decode_uri_component("%+1x"), "% 1x");
        assert_eq!(decode_uri_component("a%-1b"), "a%-1b");
        assert_eq!(decode_uri_component("%zz"), "%zz");
    }

    #[test]
    fn test_to_query_string_sorted() {
        let mut query = QueryParams::new();
        query.insert("sort", "name");
        query.insert("page", "1");
        assert_eq!(query.to_query_string(), "page=1&sort=name");
    }

    #[test]
    fn test_empty_query_string() {
        assert!(QueryParams::from_query_string("").is_empty());
    }
}
