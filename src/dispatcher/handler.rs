use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::router::Params;
use crate::server::Request;

/// What a handler wants written back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Emitted byte-for-byte, no content type forced.
    Raw(String),
    /// No body.
    Empty,
    /// A body with an explicit status and extra response headers.
    Full {
        status: u16,
        headers: Vec<(String, String)>,
        body: Box<Reply>,
    },
}

impl Reply {
    /// Serialize any `Serialize` value into a JSON reply.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<Self> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }

    /// The standard `{"error": message}` envelope with `status`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Reply::Json(json!({ "error": message })).with_status(status)
    }

    /// Override the default 200.
    #[must_use]
    pub fn with_status(self, status: u16) -> Self {
        match self {
            Reply::Full { headers, body, .. } => Reply::Full {
                status,
                headers,
                body,
            },
            body => Reply::Full {
                status,
                headers: Vec::new(),
                body: Box::new(body),
            },
        }
    }

    /// Add a response header. Repeated names are all sent.
    #[must_use]
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            Reply::Full {
                status,
                mut headers,
                body,
            } => {
                headers.push((name.into(), value.into()));
                Reply::Full {
                    status,
                    headers,
                    body,
                }
            }
            body => Reply::Full {
                status: 200,
                headers: vec![(name.into(), value.into())],
                body: Box::new(body),
            },
        }
    }
}

/// Objects and arrays become JSON, strings and other scalars are emitted
/// raw, `null` means no body.
impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Reply::Empty,
            Value::String(s) => Reply::Raw(s),
            v @ (Value::Bool(_) | Value::Number(_)) => Reply::Raw(v.to_string()),
            v @ (Value::Array(_) | Value::Object(_)) => Reply::Json(v),
        }
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Raw(s)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Raw(s.to_string())
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Empty
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reply::Empty, Into::into)
    }
}

type HandlerFn = dyn Fn(&Request, &Params) -> anyhow::Result<Reply> + Send + Sync;

/// A route action: called with the request and the path parameters in
/// pattern order.
///
/// Closures and controller methods both end up as this one function value;
/// the choice is made at registration time.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Wrap a closure. Its return value converts into a [`Reply`].
    ///
    /// ```rust
    /// use cardikit::dispatcher::Handler;
    /// use serde_json::json;
    ///
    /// let show = Handler::new(|_req, params| Ok(json!({ "id": params.get(0) })));
    /// let ping = Handler::new(|_req, _params| Ok("pong"));
    /// # let _ = (show, ping);
    /// ```
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Request, &Params) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Self(Arc::new(move |req: &Request, params: &Params| {
            f(req, params).map(Into::into)
        }))
    }

    /// Bind a controller method to a shared controller instance.
    ///
    /// ```rust,ignore
    /// let cards = Arc::new(CardController::default());
    /// table.get("/cards/:id", Handler::controller(&cards, CardController::show))?;
    /// ```
    pub fn controller<C, R>(
        instance: &Arc<C>,
        action: fn(&C, &Request, &Params) -> anyhow::Result<R>,
    ) -> Self
    where
        C: Send + Sync + 'static,
        R: Into<Reply> + 'static,
    {
        let instance = Arc::clone(instance);
        Self::new(move |req, params| action(&instance, req, params))
    }

    /// Invoke the handler. Errors are returned untouched.
    pub fn call(&self, req: &Request, params: &Params) -> anyhow::Result<Reply> {
        (self.0)(req, params)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}
