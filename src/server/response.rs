use serde_json::Value;

/// Response under construction during one dispatch cycle.
///
/// Gates write into it when they halt (or decorate it when they pass); the
/// dispatcher fills in the handler's reply. The host then writes it to the
/// wire unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl Response {
    /// Empty 200 response with no headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON response with `Content-Type: application/json`.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        let mut res = Self::new();
        res.write_json(status, body);
        res
    }

    /// Error envelope `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        let mut res = Self::new();
        res.reject(status, message);
        res
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Header lookup, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Append a header, keeping any existing ones with the same name
    /// (`Set-Cookie`).
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_string(), value.into()));
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8, lossy.
    #[must_use]
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    #[must_use]
    pub fn into_parts(self) -> (u16, Vec<(String, String)>, Vec<u8>) {
        (self.status, self.headers, self.body)
    }

    /// Serialize `body` as JSON and set the content type.
    pub fn write_json(&mut self, status: u16, body: &Value) {
        self.status = status;
        self.set_header("Content-Type", "application/json");
        self.body = body.to_string().into_bytes();
    }

    /// Write the standard error envelope. Gates call this before returning
    /// `false`.
    pub fn reject(&mut self, status: u16, message: &str) {
        self.write_json(status, &serde_json::json!({ "error": message }));
    }
}
