//! # Dispatcher Module
//!
//! Runs one request through the pipeline:
//!
//! 1. **Resolve** - pick the route bucket for the request method
//! 2. **Match** - first route in registration order whose pattern matches
//! 3. **Gate** - run the route's gate chain, stop on the first `false`
//! 4. **Invoke** - call the handler with the request and path params
//! 5. **Respond** - turn the [`Reply`] into the response body
//!
//! ## Terminal states
//!
//! - No match: `404 {"error":"Route not found"}`
//! - Gate halt: the halting gate's own response, untouched
//! - Handler reply: JSON, raw text, or nothing
//!
//! Handler errors are returned as [`DispatchError`] and never turned into a
//! response here; the HTTP host maps them to a 500.
//!
//! ## Example
//!
//! ```rust
//! use cardikit::dispatcher::{Dispatcher, Handler};
//! use cardikit::router::RouteTable;
//! use cardikit::server::Request;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut table = RouteTable::new();
//! table.post("/echo", Handler::new(|req, _| Ok(req.body().clone())))?;
//! let dispatcher = Dispatcher::new(table);
//!
//! let req = Request::builder(http::Method::POST, "/echo")
//!     .header("Content-Type", "application/json")
//!     .body(r#"{"foo":"bar"}"#)
//!     .build();
//! let res = dispatcher.dispatch(&req)?;
//! assert_eq!(res.body(), br#"{"foo":"bar"}"#);
//! # Ok(())
//! # }
//! ```

mod core;
mod handler;

pub use core::{DispatchError, Dispatcher, Outcome, NOT_FOUND_MESSAGE};
pub use handler::{Handler, Reply};
