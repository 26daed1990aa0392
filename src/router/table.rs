use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use super::params::Params;
use super::pattern::{PathPattern, PatternError};
use crate::dispatcher::Handler;
use crate::middleware::Chain;

/// HTTP methods the route table keeps buckets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Map a transport method onto a bucket. Methods without a bucket
    /// (HEAD, PATCH, ...) return `None` and therefore never match a route.
    #[must_use]
    pub fn from_http(method: &http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }

    fn bucket(self) -> usize {
        match self {
            Method::Get => 0,
            Method::Post => 1,
            Method::Put => 2,
            Method::Delete => 3,
        }
    }
}

#[derive(Debug, Error)]
#[error("unsupported method `{0}`")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered route. Immutable once it is in a table.
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: Handler,
    pub gates: Chain,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("gates", &self.gates.names())
            .finish()
    }
}

/// A route selected for a request, together with its extracted parameters.
#[derive(Debug)]
pub struct RouteMatch<'t> {
    pub route: &'t Route,
    pub params: Params,
}

/// Routes bucketed by method, each bucket in registration order.
///
/// Duplicates are not rejected: matching stops at the first hit, so a later
/// route with the same pattern is shadowed.
#[derive(Default)]
pub struct RouteTable {
    buckets: [Vec<Route>; 4],
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route to its method bucket.
    ///
    /// # Errors
    ///
    /// Fails with [`PatternError`] if `pattern` does not compile.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        gates: Chain,
    ) -> Result<&mut Self, PatternError> {
        let pattern = PathPattern::compile(pattern)?;
        info!(
            method = %method,
            pattern = %pattern,
            params = ?pattern.param_names(),
            gates = ?gates.names(),
            "Route registered"
        );
        self.buckets[method.bucket()].push(Route {
            method,
            pattern,
            handler,
            gates,
        });
        Ok(self)
    }

    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::Get, pattern, handler, Chain::new())
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::Post, pattern, handler, Chain::new())
    }

    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::Put, pattern, handler, Chain::new())
    }

    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.register(Method::Delete, pattern, handler, Chain::new())
    }

    /// Register several routes that share a path prefix and a gate list.
    ///
    /// Group gates are flattened in front of each route's own gates, so the
    /// attached chain is `group gates ++ route gates`.
    ///
    /// ```rust,ignore
    /// table.group("/api", Chain::new().with(auth), |g| {
    ///     g.get("/cards", list_cards)?;
    ///     g.route(Method::Post, "/cards", create_card, Chain::new().with(csrf))?;
    ///     Ok(())
    /// })?;
    /// ```
    pub fn group<F>(&mut self, prefix: &str, gates: Chain, build: F) -> Result<&mut Self, PatternError>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), PatternError>,
    {
        let mut group = RouteGroup {
            table: self,
            prefix: prefix.trim_end_matches('/').to_string(),
            gates,
        };
        build(&mut group)?;
        Ok(self)
    }

    /// Routes registered for `method`, in registration order.
    #[must_use]
    pub fn routes_for(&self, method: Method) -> &[Route] {
        &self.buckets[method.bucket()]
    }

    /// First route in the method's bucket whose pattern matches `path`.
    #[must_use]
    pub fn find(&self, method: &http::Method, path: &str) -> Option<RouteMatch<'_>> {
        let Some(bucket) = Method::from_http(method) else {
            debug!(method = %method, "No bucket for method");
            return None;
        };
        self.routes_for(bucket).iter().find_map(|route| {
            route
                .pattern
                .matches(path)
                .map(|params| RouteMatch { route, params })
        })
    }

    /// All routes, grouped by method then in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.buckets.iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration scope handed out by [`RouteTable::group`].
pub struct RouteGroup<'t> {
    table: &'t mut RouteTable,
    prefix: String,
    gates: Chain,
}

impl RouteGroup<'_> {
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        gates: Chain,
    ) -> Result<&mut Self, PatternError> {
        let full = format!("{}{}", self.prefix, pattern);
        let chain = self.gates.clone().append(&gates);
        self.table.register(method, &full, handler, chain)?;
        Ok(self)
    }

    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.route(Method::Get, pattern, handler, Chain::new())
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.route(Method::Post, pattern, handler, Chain::new())
    }

    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.route(Method::Put, pattern, handler, Chain::new())
    }

    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self, PatternError> {
        self.route(Method::Delete, pattern, handler, Chain::new())
    }

    /// Nested group: prefixes and gate lists concatenate.
    pub fn group<F>(&mut self, prefix: &str, gates: Chain, build: F) -> Result<&mut Self, PatternError>
    where
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), PatternError>,
    {
        let mut nested = RouteGroup {
            table: &mut *self.table,
            prefix: format!("{}{}", self.prefix, prefix.trim_end_matches('/')),
            gates: self.gates.clone().append(&gates),
        };
        build(&mut nested)?;
        Ok(self)
    }
}
