use super::Gate;
use crate::server::{Request, Response};

/// Refuses plain-HTTP requests with `403 {"error":"HTTPS required"}`.
///
/// A request counts as secure when the transport flagged it so, or, with
/// `trust_proxy` enabled, when `X-Forwarded-Proto` is `https`. Proxies are
/// not trusted by default: any client can send that header. Loopback
/// clients can be let through for local development.
pub struct RequireTlsGate {
    trust_proxy: bool,
    allow_loopback: bool,
}

impl Default for RequireTlsGate {
    fn default() -> Self {
        Self {
            trust_proxy: false,
            allow_loopback: false,
        }
    }
}

impl RequireTlsGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    #[must_use]
    pub fn allow_loopback(mut self, allow: bool) -> Self {
        self.allow_loopback = allow;
        self
    }

    fn forwarded_https(&self, req: &Request) -> bool {
        self.trust_proxy
            && req
                .header("x-forwarded-proto")
                .and_then(|v| v.split(',').next())
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
    }

    fn is_loopback(req: &Request) -> bool {
        req.client_addr()
            .and_then(|addr| {
                addr.parse::<std::net::SocketAddr>()
                    .map(|sa| sa.ip())
                    .or_else(|_| addr.parse::<std::net::IpAddr>())
                    .ok()
            })
            .is_some_and(|ip| ip.is_loopback())
    }
}

impl Gate for RequireTlsGate {
    fn handle(&self, req: &Request, res: &mut Response) -> bool {
        if req.is_secure() || self.forwarded_https(req) {
            return true;
        }
        if self.allow_loopback && Self::is_loopback(req) {
            return true;
        }
        res.reject(403, "HTTPS required");
        false
    }

    fn name(&self) -> &str {
        "require_tls"
    }
}
