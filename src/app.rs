//! The card API served by the `cardikit` binary.
//!
//! | Method | Path | Gates |
//! |---|---|---|
//! | GET | `/` | |
//! | GET | `/api/health` | |
//! | GET | `/api/csrf-token` | api |
//! | GET | `/api/cards` | api |
//! | GET | `/api/cards/:id` | api |
//! | POST | `/api/cards` | api, auth, csrf, required fields |
//! | PUT | `/api/cards/:id` | api, auth, csrf |
//! | DELETE | `/api/cards/:id` | api, auth, csrf |
//! | POST | `/api/echo` | api |
//! | GET | `/api/posts/:postId/comments/:commentId` | api |
//!
//! "api" is the shared list: security headers, TLS enforcement when
//! `security.require_tls` is set, then the rate limit.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::config::AppConfig;
use crate::controllers::CardController;
use crate::dispatcher::{Handler, Reply};
use crate::middleware::{
    issue_token, AuthGate, Chain, CsrfGate, Gate, RateLimitGate, RequireTlsGate,
    SecurityHeadersGate,
};
use crate::router::{Method, PatternError, RouteTable};
use crate::server::{Request, Response};

/// Rejects bodies missing any of the listed top-level string fields with
/// `422 {"error":"Missing field: <name>"}`.
pub struct RequireFields {
    fields: Vec<&'static str>,
}

impl RequireFields {
    #[must_use]
    pub fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }
}

impl Gate for RequireFields {
    fn handle(&self, req: &Request, res: &mut Response) -> bool {
        let missing = self
            .fields
            .iter()
            .find(|field| req.input(field).map_or(true, |v| v.trim().is_empty()));
        match missing {
            None => true,
            Some(field) => {
                debug!(request_id = %req.request_id(), field = %field, "Required field missing");
                res.reject(422, &format!("Missing field: {field}"));
                false
            }
        }
    }

    fn name(&self) -> &str {
        "required_fields"
    }
}

/// Gates shared by every `/api` route except the health check.
#[must_use]
pub fn api_gates(config: &AppConfig) -> Chain {
    let mut chain = Chain::new();
    if config.security.security_headers {
        chain.push(Arc::new(SecurityHeadersGate::new()));
    }
    if config.security.require_tls {
        chain.push(Arc::new(
            RequireTlsGate::new()
                .trust_proxy(config.security.trust_proxy)
                .allow_loopback(config.security.allow_loopback),
        ));
    }
    chain.push(Arc::new(RateLimitGate::new(
        "api",
        config.rate_limit.max_requests,
        config.rate_limit.window(),
    )));
    chain
}

fn csrf_gate(config: &AppConfig) -> CsrfGate {
    CsrfGate::new()
        .header_name(config.csrf.header.clone())
        .cookie_name(config.csrf.cookie.clone())
}

/// Gates for routes that change cards.
#[must_use]
pub fn write_gates(config: &AppConfig) -> Chain {
    let mut chain = Chain::new().with(Arc::new(AuthGate::new(
        config.security.api_tokens.iter().cloned(),
    )));
    if config.csrf.enabled {
        chain.push(Arc::new(csrf_gate(config)));
    }
    chain
}

/// `GET /api/csrf-token`: a fresh token in the body and in the cookie the
/// CSRF gate compares against.
fn csrf_token_handler(config: &AppConfig) -> Handler {
    let gate = csrf_gate(config);
    Handler::new(move |req, _params| {
        let token = issue_token();
        let cookie = gate.cookie_for(req, &token);
        Ok(Reply::Json(json!({ "token": token })).with_header("Set-Cookie", cookie))
    })
}

/// Build the route table for the card API.
///
/// # Errors
///
/// Fails if a route pattern does not compile.
pub fn build_routes(
    config: &AppConfig,
    cards: &Arc<CardController>,
) -> Result<RouteTable, PatternError> {
    let mut table = RouteTable::new();
    table
        .get("/", Handler::new(|_req, _params| Ok("Cardikit API")))?
        .get(
            "/api/health",
            Handler::new(|_req, _params| Ok(json!({ "status": "ok" }))),
        )?;

    let writes = write_gates(config);
    table.group("/api", api_gates(config), |api| {
        api.get("/csrf-token", csrf_token_handler(config))?
            .get("/cards", Handler::controller(cards, CardController::list))?
            .get("/cards/:id", Handler::controller(cards, CardController::show))?
            .post("/echo", Handler::new(|req, _params| Ok(req.body().clone())))?
            .get(
                "/posts/:postId/comments/:commentId",
                Handler::new(|_req, params| {
                    Ok(format!(
                        "{}-{}",
                        params.by_name("postId").unwrap_or_default(),
                        params.by_name("commentId").unwrap_or_default()
                    ))
                }),
            )?;

        api.group("/cards", writes, |w| {
            w.route(
                Method::Post,
                "",
                Handler::controller(cards, CardController::create),
                Chain::new().with(Arc::new(RequireFields::new(&["name", "email"]))),
            )?
            .put("/:id", Handler::controller(cards, CardController::update))?
            .delete("/:id", Handler::controller(cards, CardController::delete))?;
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(table)
}
