use std::collections::HashSet;

use tracing::debug;

use super::Gate;
use crate::server::{Request, Response};

/// Rejects requests that do not carry a known API token.
///
/// The token is read from `Authorization: Bearer <token>` first, then from
/// the configured header (default `x-api-key`). A miss yields
/// `401 {"error":"Unauthorized"}`.
pub struct AuthGate {
    tokens: HashSet<String>,
    header_name: String,
}

impl AuthGate {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            header_name: "x-api-key".to_string(),
        }
    }

    /// Configure the fallback header name. Default: `x-api-key`
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into().to_ascii_lowercase();
        self
    }

    fn extract<'a>(&self, req: &'a Request) -> Option<&'a str> {
        req.bearer_token()
            .or_else(|| req.header(&self.header_name))
    }
}

impl Gate for AuthGate {
    fn handle(&self, req: &Request, res: &mut Response) -> bool {
        match self.extract(req) {
            Some(token) if self.tokens.contains(token) => true,
            presented => {
                debug!(
                    request_id = %req.request_id(),
                    token_present = presented.is_some(),
                    "Authentication failed"
                );
                res.reject(401, "Unauthorized");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "auth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_bearer_and_header_tokens() {
        let gate = AuthGate::new(["t0k3n"]);

        let bearer = Request::builder(Method::GET, "/")
            .header("Authorization", "Bearer t0k3n")
            .build();
        assert!(gate.handle(&bearer, &mut Response::new()));

        let header = Request::builder(Method::GET, "/")
            .header("X-API-Key", "t0k3n")
            .build();
        assert!(gate.handle(&header, &mut Response::new()));
    }

    #[test]
    fn test_missing_or_wrong_token_is_401() {
        let gate = AuthGate::new(vec!["t0k3n".to_string()]).header_name("X-Card-Key");

        let mut res = Response::new();
        let anon = Request::builder(Method::GET, "/").build();
        assert!(!gate.handle(&anon, &mut res));
        assert_eq!(res.status(), 401);
        assert_eq!(res.body_str(), r#"{"error":"Unauthorized"}"#);

        let wrong = Request::builder(Method::GET, "/")
            .header("x-card-key", "nope")
            .build();
        assert!(!gate.handle(&wrong, &mut Response::new()));
    }
}
