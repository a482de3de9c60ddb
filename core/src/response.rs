//! The normalized result of one HTTP exchange.
//!
//! # Design
//! `Response` is a passive carrier: no validation on construction, no JSON
//! decoding. Header names are stored in the case they were received and a
//! later duplicate overwrites an earlier one. `header` looks up by exact case;
//! `header_ignore_case` exists for callers that talk to servers which
//! lowercase everything (hyper does).

use std::collections::BTreeMap;

/// Header name to header value, case as received, last write wins.
pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    body: String,
    headers: Headers,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>, headers: Headers) -> Self {
        Self {
            status,
            body: body.into(),
            headers,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Exact-case header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// ASCII case-insensitive lookup. When several stored names differ only
    /// by case, the last one in map order is returned.
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .last()
    }

    /// True for 200..=299.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn accessors_return_what_was_stored() {
        let resp = Response::new(201, "{}", headers(&[("Location", "/x")]));
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.body(), "{}");
        assert_eq!(resp.header("Location"), Some("/x"));
        assert!(resp.is_success());
    }

    #[test]
    fn header_lookup_is_exact_case() {
        let resp = Response::new(200, "", headers(&[("content-type", "text/html")]));
        assert_eq!(resp.header("Content-Type"), None);
        assert_eq!(resp.header_ignore_case("Content-Type"), Some("text/html"));
    }

    #[test]
    fn success_range_boundaries() {
        for (status, ok) in [(199, false), (200, true), (299, true), (300, false)] {
            assert_eq!(Response::new(status, "", Headers::new()).is_success(), ok);
        }
    }

    #[test]
    fn into_body_moves_the_raw_text_out() {
        let resp = Response::new(200, "<html></html>", Headers::new());
        assert_eq!(resp.into_body(), "<html></html>");
    }
}
