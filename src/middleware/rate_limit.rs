use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

use super::Gate;
use crate::server::{Request, Response};

/// Above this many keys, expired windows are pruned at most once per window.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window counter keyed by an arbitrary string.
///
/// Each key may be hit `max_requests` times per window. The first hit after
/// the window has elapsed resets the count and starts a new window at that
/// instant. Rejected hits are not counted.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
    prune_threshold: usize,
    last_prune: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
            prune_threshold: PRUNE_THRESHOLD,
            last_prune: Mutex::new(None),
        }
    }

    /// Key count above which expired windows are swept. Default: 10 000
    #[must_use]
    pub fn with_prune_threshold(mut self, keys: usize) -> Self {
        self.prune_threshold = keys;
        self
    }

    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if self.windows.len() > self.prune_threshold {
            self.maybe_prune(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.max_requests {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.started));
            return RateDecision::Limited { retry_after };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    /// Sweep unless another thread is sweeping or the last sweep was less
    /// than one window ago.
    fn maybe_prune(&self, now: Instant) {
        let Ok(mut last) = self.last_prune.try_lock() else {
            return;
        };
        let due = last.map_or(true, |at| now.saturating_duration_since(at) >= self.window);
        if due {
            *last = Some(now);
            drop(last);
            self.prune(now);
        }
    }

    /// Drop windows that have already expired.
    pub fn prune(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Gate answering `429 {"error":"Too many requests"}` once a client exceeds
/// its budget. Clients are keyed by address, prefixed with the gate's scope
/// so separate gates keep separate budgets.
pub struct RateLimitGate {
    scope: String,
    limiter: RateLimiter,
}

impl RateLimitGate {
    #[must_use]
    pub fn new(scope: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            scope: scope.into(),
            limiter: RateLimiter::new(max_requests, window),
        }
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn key(&self, req: &Request) -> String {
        let client = req
            .client_addr()
            .map(|addr| {
                addr.parse::<std::net::SocketAddr>()
                    .map(|sa| sa.ip().to_string())
                    .unwrap_or_else(|_| addr.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());
        format!("{}:{}", self.scope, client)
    }
}

impl Gate for RateLimitGate {
    fn handle(&self, req: &Request, res: &mut Response) -> bool {
        let key = self.key(req);
        match self.limiter.check(&key) {
            RateDecision::Allowed { remaining } => {
                res.set_header("X-RateLimit-Limit", self.limiter.max_requests().to_string());
                res.set_header("X-RateLimit-Remaining", remaining.to_string());
                true
            }
            RateDecision::Limited { retry_after } => {
                // Round up so clients never retry before the window resets.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                warn!(
                    request_id = %req.request_id(),
                    key = %key,
                    retry_after_secs = secs,
                    "Rate limit exceeded"
                );
                res.reject(429, "Too many requests");
                res.set_header("Retry-After", secs.to_string());
                false
            }
        }
    }

    fn name(&self) -> &str {
        "rate_limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_exact_threshold() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("k", t0), RateDecision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_at("k", t0), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("k", t0), RateDecision::Allowed { remaining: 0 });
        assert_eq!(
            limiter.check_at("k", t0 + Duration::from_secs(10)),
            RateDecision::Limited {
                retry_after: Duration::from_secs(50)
            }
        );
    }

    #[test]
    fn test_window_resets_on_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(matches!(limiter.check_at("k", t0), RateDecision::Allowed { .. }));
        assert!(matches!(
            limiter.check_at("k", t0 + Duration::from_secs(59)),
            RateDecision::Limited { .. }
        ));
        // New window starts at the first hit after expiry, not at t0 + 60.
        let t1 = t0 + Duration::from_secs(75);
        assert_eq!(limiter.check_at("k", t1), RateDecision::Allowed { remaining: 0 });
        assert!(matches!(
            limiter.check_at("k", t1 + Duration::from_secs(59)),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(matches!(limiter.check_at("a", t0), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at("b", t0), RateDecision::Allowed { .. }));
        assert_eq!(limiter.tracked_keys(), 2);
        limiter.prune(t0 + Duration::from_secs(61));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_prune_runs_at_most_once_per_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10)).with_prune_threshold(2);
        let t0 = Instant::now();
        for key in ["a", "b", "c"] {
            limiter.check_at(key, t0);
        }
        // Over the threshold: sweeps, but nothing has expired yet.
        limiter.check_at("d", t0 + Duration::from_secs(1));
        assert_eq!(limiter.tracked_keys(), 4);

        // a, b and c have expired, but the last sweep was under a window ago.
        limiter.check_at("e", t0 + Duration::from_millis(10_500));
        assert_eq!(limiter.tracked_keys(), 5);

        limiter.check_at("f", t0 + Duration::from_secs(11));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_gate_rejects_with_retry_after() {
        let gate = RateLimitGate::new("login", 2, Duration::from_secs(60));
        let req = Request::builder(Method::POST, "/login")
            .client_addr("198.51.100.7:40000")
            .build();

        let mut first = Response::new();
        assert!(gate.handle(&req, &mut first));
        assert_eq!(first.header("X-RateLimit-Remaining"), Some("1"));
        assert!(gate.handle(&req, &mut Response::new()));

        let mut res = Response::new();
        assert!(!gate.handle(&req, &mut res));
        assert_eq!(res.status(), 429);
        assert_eq!(res.body_str(), r#"{"error":"Too many requests"}"#);
        let retry: u64 = res.header("Retry-After").unwrap().parse().unwrap();
        assert!(retry > 0 && retry <= 60);
    }

    #[test]
    fn test_gate_keys_by_ip_not_port() {
        let gate = RateLimitGate::new("api", 1, Duration::from_secs(60));
        let a = Request::builder(Method::GET, "/").client_addr("198.51.100.7:1").build();
        let b = Request::builder(Method::GET, "/").client_addr("198.51.100.7:2").build();
        assert!(gate.handle(&a, &mut Response::new()));
        assert!(!gate.handle(&b, &mut Response::new()));
    }
}
