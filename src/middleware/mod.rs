//! # Middleware Module
//!
//! Gates that run before a route's handler. Every gate implements [`Gate`];
//! a route carries one flattened [`Chain`] of them, evaluated in order until
//! one returns `false`.
//!
//! Built-in gates:
//! - [`AuthGate`] - API token check, 401
//! - [`CsrfGate`] - double-submit token check on unsafe methods, 403
//! - [`RateLimitGate`] - fixed-window budget per client, 429
//! - [`RequireTlsGate`] - refuses plain HTTP, 403
//! - [`SecurityHeadersGate`] - response hardening headers, never halts

mod auth;
mod core;
mod csrf;
mod rate_limit;
mod security_headers;
mod tls;

pub use auth::AuthGate;
pub use core::{Chain, ChainOutcome, Gate, SharedGate};
pub use csrf::{issue_token, CsrfGate};
pub use rate_limit::{RateDecision, RateLimitGate, RateLimiter};
pub use security_headers::SecurityHeadersGate;
pub use tls::RequireTlsGate;
