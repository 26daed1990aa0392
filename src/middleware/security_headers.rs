use super::Gate;
use crate::server::{Request, Response};

/// Adds hardening headers to every response that passes through it.
/// Never halts.
pub struct SecurityHeadersGate {
    headers: Vec<(String, String)>,
    hsts: Option<String>,
}

impl Default for SecurityHeadersGate {
    fn default() -> Self {
        Self {
            headers: vec![
                ("X-Content-Type-Options".into(), "nosniff".into()),
                ("X-Frame-Options".into(), "DENY".into()),
                ("Referrer-Policy".into(), "strict-origin-when-cross-origin".into()),
                (
                    "Content-Security-Policy".into(),
                    "default-src 'self'; frame-ancestors 'none'".into(),
                ),
            ],
            hsts: Some("max-age=31536000; includeSubDomains".into()),
        }
    }
}

impl SecurityHeadersGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or override a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// `Strict-Transport-Security` value sent on secure requests; `None` disables it.
    #[must_use]
    pub fn hsts(mut self, value: Option<String>) -> Self {
        self.hsts = value;
        self
    }
}

impl Gate for SecurityHeadersGate {
    fn handle(&self, req: &Request, res: &mut Response) -> bool {
        for (name, value) in &self.headers {
            res.set_header(name, value.as_str());
        }
        if let Some(hsts) = self.hsts.as_deref().filter(|_| req.is_secure()) {
            res.set_header("Strict-Transport-Security", hsts);
        }
        true
    }

    fn name(&self) -> &str {
        "security_headers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_defaults_applied() {
        let mut res = Response::new();
        let req = Request::builder(Method::GET, "/").build();
        assert!(SecurityHeadersGate::new().handle(&req, &mut res));
        assert_eq!(res.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(res.header("x-frame-options"), Some("DENY"));
        assert!(res.header("strict-transport-security").is_none());
    }

    #[test]
    fn test_hsts_only_on_secure_requests() {
        let mut res = Response::new();
        let req = Request::builder(Method::GET, "/").secure(true).build();
        SecurityHeadersGate::new().handle(&req, &mut res);
        assert!(res.header("Strict-Transport-Security").is_some());
    }

    #[test]
    fn test_override() {
        let mut res = Response::new();
        let req = Request::builder(Method::GET, "/").build();
        SecurityHeadersGate::new()
            .header("x-frame-options", "SAMEORIGIN")
            .handle(&req, &mut res);
        assert_eq!(res.header("X-Frame-Options"), Some("SAMEORIGIN"));
        assert_eq!(
            res.headers()
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("x-frame-options"))
                .count(),
            1
        );
    }
}
