use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::handler::Reply;
use crate::middleware::ChainOutcome;
use crate::router::{Method, RouteTable};
use crate::server::{Request, Response};

/// Body sent when no route matches.
pub const NOT_FOUND_MESSAGE: &str = "Route not found";

/// A fault raised by a handler, propagated out of the dispatcher untouched.
/// The host decides how to answer it.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler for {method} {pattern} failed")]
    Handler {
        method: Method,
        pattern: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Terminal state reached by a dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No route in the method's bucket matched; a 404 envelope was written.
    NotFound,
    /// A gate returned `false`; the response is whatever it wrote.
    Halted { gate: String },
    /// The handler ran and its reply was written.
    Responded,
}

/// Runs resolve, match, gate, invoke and respond for one request at a time.
///
/// The route table is held behind an [`ArcSwap`]: each dispatch reads one
/// snapshot, and [`replace_table`](Self::replace_table) swaps the whole table
/// at once.
pub struct Dispatcher {
    table: ArcSwap<RouteTable>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(RouteTable::new())
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: RouteTable) -> Self {
        info!(routes_count = table.len(), "Routing table loaded");
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Swap in a new table. In-flight dispatches keep the snapshot they
    /// started with.
    pub fn replace_table(&self, table: RouteTable) {
        info!(routes_count = table.len(), "Routing table replaced");
        self.table.store(Arc::new(table));
    }

    /// Current table snapshot.
    #[must_use]
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Dispatch `req` and return the response to send.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Handler`] when the matched handler fails.
    /// NotFound and gate halts are not errors.
    pub fn dispatch(&self, req: &Request) -> Result<Response, DispatchError> {
        self.dispatch_with_outcome(req).map(|(_, res)| res)
    }

    /// Like [`dispatch`](Self::dispatch), also reporting which terminal
    /// state was reached.
    pub fn dispatch_with_outcome(
        &self,
        req: &Request,
    ) -> Result<(Outcome, Response), DispatchError> {
        let table = self.table.load();
        let request_id = req.request_id();

        debug!(
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
            "Route match attempt"
        );
        let match_start = Instant::now();
        let Some(matched) = table.find(req.method(), req.path()) else {
            warn!(
                request_id = %request_id,
                method = %req.method(),
                path = %req.path(),
                duration_us = match_start.elapsed().as_micros(),
                "No route matched"
            );
            return Ok((Outcome::NotFound, Response::error(404, NOT_FOUND_MESSAGE)));
        };
        let route = matched.route;
        let match_duration = match_start.elapsed();
        if match_duration > Duration::from_millis(1) {
            warn!(
                request_id = %request_id,
                route_pattern = %route.pattern,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        }
        info!(
            request_id = %request_id,
            method = %route.method,
            path = %req.path(),
            route_pattern = %route.pattern,
            path_params = ?matched.params,
            "Route matched"
        );

        let mut res = Response::new();
        if let ChainOutcome::Halted { gate, .. } = route.gates.run(req, &mut res) {
            if res.body().is_empty() && res.status() == 200 {
                warn!(
                    request_id = %request_id,
                    gate = %gate,
                    "Gate halted without writing a response"
                );
            }
            return Ok((Outcome::Halted { gate }, res));
        }

        let start = Instant::now();
        let reply = route.handler.call(req, &matched.params).map_err(|source| {
            error!(
                request_id = %request_id,
                route_pattern = %route.pattern,
                error = %source,
                "Handler failed"
            );
            DispatchError::Handler {
                method: route.method,
                pattern: route.pattern.as_str().to_string(),
                source,
            }
        })?;
        debug!(
            request_id = %request_id,
            route_pattern = %route.pattern,
            latency_us = start.elapsed().as_micros(),
            "Handler execution complete"
        );

        write_reply(&mut res, reply);
        Ok((Outcome::Responded, res))
    }
}

fn write_reply(res: &mut Response, reply: Reply) {
    match reply {
        Reply::Json(value) => {
            res.set_header("Content-Type", "application/json");
            res.set_body(value.to_string());
        }
        Reply::Raw(body) => res.set_body(body),
        Reply::Empty => {}
        Reply::Full {
            status,
            headers,
            body,
        } => {
            res.set_status(status);
            for (name, value) in headers {
                res.add_header(&name, value);
            }
            write_reply(res, *body);
        }
    }
}
