use reqwest::Method;
use serde::Serialize;

use crate::{Result, ServiceError};

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Raw bytes sent as-is.
    Bytes(Vec<u8>),
    /// JSON document serialized at send time.
    Json(serde_json::Value),
}

/// Immutable description of one HTTP call, replayable across retries.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl Request {
    /// A request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Shorthand for `Request::new(Method::GET, url)`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for `Request::new(Method::POST, url)`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Sets a header, replacing any existing one with the same name in any case.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets every header of `headers`, in order.
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |request, (name, value)| request.header(name, value))
    }

    /// Serializes `value` as the JSON body.
    ///
    /// Adds `content-type: application/json` unless a content type is already set.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|err| ServiceError::Encode(format!("cannot encode request body: {err}")))?;
        if self.header_value("content-type").is_none() {
            self = self.header("content-type", "application/json");
        }
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    /// Sets a raw body with its content type.
    pub fn bytes(self, content_type: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let mut request = self.header("content-type", content_type);
        request.body = Some(Body::Bytes(bytes.into()));
        request
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers in the order they were set, names as given.
    pub fn header_list(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Payload, if one was attached with [`Request::json`] or [`Request::bytes`].
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::{Body, Request};
    use crate::ServiceError;

    #[test]
    fn header_replaces_case_insensitively() {
        let request = Request::get("https://svc/x")
            .header("Api-Key", "one")
            .header("api-key", "two");
        assert_eq!(request.header_list().len(), 1);
        assert_eq!(request.header_value("API-KEY"), Some("two"));
    }

    #[test]
    fn json_sets_content_type_once() {
        let request = Request::post("https://svc/x")
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&json!({"a": 1}))
            .expect("must encode");
        assert_eq!(
            request.header_value("content-type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(request.body(), Some(&Body::Json(json!({"a": 1}))));

        let plain = Request::post("https://svc/x")
            .json(&json!([1, 2]))
            .expect("must encode");
        assert_eq!(plain.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn unserializable_body_is_an_encode_error() {
        let mut body = BTreeMap::new();
        body.insert(vec![1u8, 2], "byte-string keys are not JSON object keys");

        let err = Request::post("https://svc/x")
            .json(&body)
            .expect_err("non-string map keys must be rejected");

        assert!(matches!(err, ServiceError::Encode(message) if message.contains("request body")));
    }

    #[test]
    fn bytes_body_carries_content_type() {
        let request = Request::post("https://svc/x").bytes("image/jpeg", vec![0xff, 0xd8]);
        assert_eq!(request.header_value("content-type"), Some("image/jpeg"));
        assert_eq!(request.body(), Some(&Body::Bytes(vec![0xff, 0xd8])));
    }
}
