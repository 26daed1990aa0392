use std::collections::HashMap;

use http::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::ids::RequestId;

/// An inbound request, built once per dispatch cycle and read-only afterwards.
///
/// Header names are stored lowercased so lookups are case-insensitive. The
/// body is parsed once, at construction, according to `Content-Type`.
#[derive(Debug, Clone)]
pub struct Request {
    request_id: RequestId,
    method: Method,
    path: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: Value,
    client_addr: Option<String>,
    secure: bool,
}

impl Request {
    /// Start building a request. `target` may carry a query string
    /// (`/cards?page=2`); it is split off and parsed.
    #[must_use]
    pub fn builder(method: Method, target: &str) -> RequestBuilder {
        RequestBuilder::new(method, target)
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path with leading slash and without query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Parsed body: a JSON value for `application/json`, an object of strings
    /// for form posts, an empty object otherwise.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Top-level body field as a string, if present.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn client_addr(&self) -> Option<&str> {
        self.client_addr.as_deref()
    }

    /// Whether the transport received this request over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Bearer token from `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Collects transport data and produces a [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    raw_body: Vec<u8>,
    json_body: Option<Value>,
    client_addr: Option<String>,
    secure: bool,
}

impl RequestBuilder {
    fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query_params(query)),
            None => (target, HashMap::new()),
        };
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method,
            path: path.to_string(),
            query,
            headers: HashMap::new(),
            raw_body: Vec::new(),
            json_body: None,
            client_addr: None,
            secure: false,
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Raw body bytes, parsed at [`build`](Self::build) according to `Content-Type`.
    #[must_use]
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.raw_body = bytes.into();
        self
    }

    /// Already-parsed JSON body; also sets `Content-Type: application/json`.
    #[must_use]
    pub fn json(mut self, value: Value) -> Self {
        self.json_body = Some(value);
        self.header("content-type", "application/json")
    }

    #[must_use]
    pub fn client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn build(self) -> Request {
        let content_type = self
            .headers
            .get("content-type")
            .map(|ct| ct.to_ascii_lowercase());
        let body = match self.json_body {
            Some(value) => value,
            None => parse_body(content_type.as_deref(), &self.raw_body),
        };
        let cookies = parse_cookies(&self.headers);
        let request_id = RequestId::from_headers(&self.headers);

        Request {
            request_id,
            method: self.method,
            path: self.path,
            headers: self.headers,
            query: self.query,
            cookies,
            body,
            client_addr: self.client_addr,
            secure: self.secure,
        }
    }
}

/// Parse query string parameters (`limit=10&offset=20`), URL-decoding names and values.
#[must_use]
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Parse the `Cookie` header into name/value pairs.
#[must_use]
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim();
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_body(content_type: Option<&str>, raw: &[u8]) -> Value {
    if raw.is_empty() {
        return Value::Object(Map::new());
    }
    match content_type {
        Some(ct) if ct.starts_with("application/json") => {
            serde_json::from_slice(raw).unwrap_or_else(|e| {
                debug!(error = %e, "Request body is not valid JSON, treating as empty");
                Value::Object(Map::new())
            })
        }
        Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => Value::Object(
            url::form_urlencoded::parse(raw)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}
