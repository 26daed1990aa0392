use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{AppService, Request, Response};

/// How long a worker waits in `recv` before re-checking the shutdown flag.
const RECV_POLL: Duration = Duration::from_millis(100);

/// Why a raw request could not become a [`Request`].
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unsupported method")]
    Method(#[from] http::method::InvalidMethod),
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body")]
    Io(#[from] io::Error),
}

/// Synchronous HTTP host built on `tiny_http`.
///
/// A fixed set of worker threads pull requests off one listener; each request
/// is a complete dispatch cycle on the worker that received it.
pub struct HttpServer {
    service: AppService,
    workers: usize,
    max_body_bytes: usize,
}

/// Handle to a running HTTP server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address actually bound (useful when binding port 0).
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listener until it accepts connections.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server is not reachable within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Signal the workers to exit and wait for them.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("HTTP worker exited with a panic");
            }
        }
        info!(addr = %self.addr, "HTTP server stopped");
    }

    /// Block until every worker exits.
    pub fn join(self) {
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("HTTP worker exited with a panic");
            }
        }
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(service: AppService) -> Self {
        Self {
            service,
            workers: 4,
            max_body_bytes: 1024 * 1024,
        }
    }

    /// Number of worker threads. Default: 4
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Largest accepted request body. Default: 1 MiB
    #[must_use]
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Bind `addr` and start the workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let requested = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = Arc::new(tiny_http::Server::http(requested).map_err(io::Error::other)?);
        let addr = server.server_addr().to_ip().unwrap_or(requested);
        let shutdown = Arc::new(AtomicBool::new(false));

        let workers = (0..self.workers)
            .map(|idx| {
                let server = Arc::clone(&server);
                let shutdown = Arc::clone(&shutdown);
                let service = self.service.clone();
                let max_body = self.max_body_bytes;
                thread::Builder::new()
                    .name(format!("cardikit-http-{idx}"))
                    .spawn(move || worker_loop(&server, &service, &shutdown, max_body))
            })
            .collect::<io::Result<Vec<_>>>()?;

        info!(addr = %addr, workers = workers.len(), "HTTP server listening");
        Ok(ServerHandle {
            addr,
            shutdown,
            workers,
        })
    }
}

fn worker_loop(
    server: &tiny_http::Server,
    service: &AppService,
    shutdown: &AtomicBool,
    max_body: usize,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(RECV_POLL) {
            Ok(Some(raw)) => serve_one(service, raw, max_body),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Failed to receive request");
            }
        }
    }
    debug!("HTTP worker exiting");
}

fn serve_one(service: &AppService, mut raw: tiny_http::Request, max_body: usize) {
    let res = match from_tiny_http(&mut raw, max_body) {
        Ok(req) => service.call(&req),
        Err(e) => {
            debug!(error = %e, "Rejecting request before dispatch");
            rejection(&e)
        }
    };
    if let Err(e) = raw.respond(to_tiny_http(res)) {
        warn!(error = %e, "Failed to write response");
    }
}

/// Response for a request that never reached the dispatcher.
fn rejection(err: &ReadError) -> Response {
    match err {
        ReadError::TooLarge { .. } => Response::error(413, "Payload too large"),
        ReadError::Method(_) | ReadError::Io(_) => Response::error(400, "Bad request"),
    }
}

/// Build a [`Request`] from a `tiny_http` request, reading at most
/// `max_body` bytes of body.
///
/// # Errors
///
/// [`ReadError::TooLarge`] when the body exceeds `max_body`, otherwise the
/// method parse or read failure.
pub fn from_tiny_http(raw: &mut tiny_http::Request, max_body: usize) -> Result<Request, ReadError> {
    let method = http::Method::from_bytes(raw.method().to_string().as_bytes())?;

    let mut builder = Request::builder(method, raw.url());
    for header in raw.headers() {
        builder = builder.header(header.field.as_str().as_str(), header.value.as_str());
    }
    if let Some(addr) = raw.remote_addr() {
        builder = builder.client_addr(addr.to_string());
    }

    let mut body = Vec::new();
    let limit = u64::try_from(max_body).unwrap_or(u64::MAX).saturating_add(1);
    Read::take(raw.as_reader(), limit).read_to_end(&mut body)?;
    if body.len() > max_body {
        return Err(ReadError::TooLarge { limit: max_body });
    }

    Ok(builder.body(body).build())
}

fn to_tiny_http(res: Response) -> tiny_http::Response<io::Cursor<Vec<u8>>> {
    let (status, headers, body) = res.into_parts();
    let mut out = tiny_http::Response::from_data(body).with_status_code(status);
    for (name, value) in headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => out.add_header(header),
            Err(()) => warn!(header = %name, "Dropping invalid response header"),
        }
    }
    out
}
