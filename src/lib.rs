//! # Cardikit
//!
//! Request dispatch core for the Cardikit card API: an incoming request is
//! matched against a per-method route table, run through the route's gate
//! chain, and handed to its handler, whose return value becomes the
//! response body.
//!
//! ## Architecture
//!
//! - **[`router`]** - Route table and path pattern matcher (`/cards/:id`)
//! - **[`middleware`]** - The [`Gate`](middleware::Gate) trait, ordered
//!   chains, and the built-in auth, CSRF, rate limit, TLS and header gates
//! - **[`dispatcher`]** - Resolve, match, gate, invoke, respond
//! - **[`server`]** - Request/response model and a `tiny_http` host
//! - **[`config`]** - TOML configuration with `CARDIKIT_*` overrides
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`app`]** / **[`controllers`]** - The card API itself
//!
//! ## Dispatch cycle
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as HttpServer
//!     participant D as Dispatcher
//!     participant T as RouteTable
//!     participant C as Chain
//!     participant H as Handler
//!
//!     Host->>D: dispatch(&Request)
//!     D->>T: find(method, path)
//!     alt no route
//!         T-->>D: None
//!         D-->>Host: 404 {"error":"Route not found"}
//!     else matched
//!         T-->>D: RouteMatch { route, params }
//!         D->>C: run(&Request, &mut Response)
//!         alt gate returned false
//!             C-->>D: Halted
//!             D-->>Host: gate's own response
//!         else all gates passed
//!             D->>H: call(&Request, &Params)
//!             H-->>D: Reply / error
//!             D-->>Host: Response / DispatchError
//!         end
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cardikit::dispatcher::{Dispatcher, Handler};
//! use cardikit::middleware::{Chain, Gate};
//! use cardikit::router::{Method, RouteTable};
//! use cardikit::server::{Request, Response};
//!
//! struct DenyAll;
//! impl Gate for DenyAll {
//!     fn handle(&self, _req: &Request, res: &mut Response) -> bool {
//!         res.reject(401, "Unauthorized");
//!         false
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut table = RouteTable::new();
//! table
//!     .get("/posts/:postId/comments/:commentId", Handler::new(|_req, p| {
//!         Ok(format!("{}-{}", &p[0], &p[1]))
//!     }))?
//!     .register(
//!         Method::Get,
//!         "/secure",
//!         Handler::new(|_req, _p| Ok("secret")),
//!         Chain::new().with(Arc::new(DenyAll)),
//!     )?;
//!
//! let dispatcher = Dispatcher::new(table);
//! let res = dispatcher.dispatch(&Request::builder(http::Method::GET, "/posts/5/comments/8").build())?;
//! assert_eq!(res.body(), b"5-8");
//!
//! let res = dispatcher.dispatch(&Request::builder(http::Method::GET, "/secure").build())?;
//! assert_eq!(res.status(), 401);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod server;

pub use dispatcher::{DispatchError, Dispatcher, Handler, Reply};
pub use ids::{RequestId, REQUEST_ID_HEADER};
pub use router::{Method, PathPattern, PatternError, RouteTable};
pub use server::{Request, Response};
