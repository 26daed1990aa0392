//! Request/response model and the HTTP host that feeds the dispatcher.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{from_tiny_http, HttpServer, ReadError, ServerHandle};
pub use request::{parse_cookies, parse_query_params, Request, RequestBuilder};
pub use response::Response;
pub use service::{AppService, INTERNAL_ERROR_MESSAGE};
