use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use super::{Request, Response};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::ids::REQUEST_ID_HEADER;

/// Body of the generic reply sent when a handler fails.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Host-side wrapper around a [`Dispatcher`].
///
/// This is where handler faults stop: an error returned from dispatch, or a
/// panic unwinding out of it, becomes `500 {"error":"Internal Server Error"}`.
/// Every response is tagged with the request id.
#[derive(Clone)]
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run one dispatch cycle and produce the response to write.
    #[must_use]
    pub fn call(&self, req: &Request) -> Response {
        let start = Instant::now();
        let request_id = req.request_id();

        let result = catch_unwind(AssertUnwindSafe(|| self.dispatcher.dispatch(req)));
        let mut res = match result {
            Ok(Ok(res)) => res,
            Ok(Err(DispatchError::Handler {
                method,
                pattern,
                source,
            })) => {
                error!(
                    request_id = %request_id,
                    method = %method,
                    route_pattern = %pattern,
                    error = ?source,
                    "Handler fault, answering 500"
                );
                Response::error(500, INTERNAL_ERROR_MESSAGE)
            }
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    request_id = %request_id,
                    path = %req.path(),
                    panic_message = %panic_message,
                    "Handler panicked, answering 500"
                );
                Response::error(500, INTERNAL_ERROR_MESSAGE)
            }
        };

        res.set_header(REQUEST_ID_HEADER, request_id.to_string());
        info!(
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
            status = res.status(),
            latency_us = start.elapsed().as_micros(),
            "Request completed"
        );
        res
    }
}
