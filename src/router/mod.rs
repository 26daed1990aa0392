//! # Router Module
//!
//! Route registration and path matching for the Cardikit API.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Keeping one ordered bucket of routes per HTTP method
//! - Compiling `:name` path patterns at registration time
//! - Matching a request path against a bucket, first registered route wins
//! - Extracting path parameters as strings, in pattern order
//!
//! ## Example
//!
//! ```rust
//! use cardikit::dispatcher::Handler;
//! use cardikit::router::{Method, RouteTable};
//! use cardikit::middleware::Chain;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut table = RouteTable::new();
//! table.register(
//!     Method::Get,
//!     "/posts/:postId/comments/:commentId",
//!     Handler::new(|_req, p| Ok(format!("{}-{}", &p[0], &p[1]))),
//!     Chain::new(),
//! )?;
//!
//! let m = table.find(&http::Method::GET, "/posts/5/comments/8").unwrap();
//! assert_eq!(m.params.get(0), Some("5"));
//! assert_eq!(m.params.by_name("commentId"), Some("8"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Matching rules
//!
//! - Trailing slashes are insignificant, except that `/` stays `/`
//! - A path matches only a pattern with the same number of segments
//! - Literal segments are compared byte-for-byte, case-sensitive

mod params;
mod pattern;
mod table;

pub use params::{ParamVec, Params, MAX_INLINE_PARAMS};
pub use pattern::{normalize, PathPattern, PatternError};
pub use table::{Method, Route, RouteGroup, RouteMatch, RouteTable, UnsupportedMethod};
