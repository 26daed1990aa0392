use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use http::Method;

use super::Gate;
use crate::server::{Request, Response};

/// Double-submit CSRF check.
///
/// Safe methods (GET, HEAD, OPTIONS) pass untouched. For anything else the
/// token in the request header must equal the token in the cookie, otherwise
/// the gate answers `403 {"error":"Invalid CSRF token"}`.
pub struct CsrfGate {
    header_name: String,
    cookie_name: String,
}

impl Default for CsrfGate {
    fn default() -> Self {
        Self {
            header_name: "x-csrf-token".to_string(),
            cookie_name: "csrf_token".to_string(),
        }
    }
}

impl CsrfGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into().to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// `Set-Cookie` value carrying `token` under this gate's cookie name.
    /// `Secure` is added when the request arrived over TLS.
    #[must_use]
    pub fn cookie_for(&self, req: &Request, token: &str) -> String {
        let mut cookie = format!("{}={token}; Path=/; SameSite=Strict", self.cookie_name);
        if req.is_secure() {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Fresh token: 32 random bytes, URL-safe base64 without padding.
#[must_use]
pub fn issue_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

fn is_safe(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl Gate for CsrfGate {
    fn handle(&self, req: &Request, res: &mut Response) -> bool {
        if is_safe(req.method()) {
            return true;
        }
        let header = req.header(&self.header_name);
        let cookie = req.cookie(&self.cookie_name);
        match (header, cookie) {
            (Some(h), Some(c)) if !h.is_empty() && constant_time_eq(h.as_bytes(), c.as_bytes()) => {
                true
            }
            _ => {
                res.reject(403, "Invalid CSRF token");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "csrf"
    }
}
