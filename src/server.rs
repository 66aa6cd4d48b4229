//! HTTP server and graceful shutdown.
//!
//! [`Server::serve`] runs the accept loop until either the `stop` future
//! resolves (a shutdown notice, an OS signal) or the listener itself fails.
//! Both paths end the same way:
//!
//! 1. Stop accepting. The listener is dropped, new connections are refused.
//! 2. Cancel every request scope and ask each connection to finish its
//!    in-flight request and close.
//! 3. Wait up to the shutdown timeout. Connections still open after that are
//!    aborted and [`Error::ShutdownTimeout`] is returned, so a single stuck
//!    request cannot hold the process hostage.

use std::convert::Infallible;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::Scope;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);

// ── Service ───────────────────────────────────────────────────────────────────

/// Anything the server can dispatch requests to.
///
/// `scope` is cancelled when the client disconnects or the server starts
/// draining.
pub trait Service: Send + Sync + 'static {
    fn serve(&self, scope: Scope, req: Request) -> impl Future<Output = Response> + Send;
}

// ── Server ────────────────────────────────────────────────────────────────────

/// A bound listener waiting to be served.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
    shutdown_timeout: Duration,
    read_timeout: Option<Duration>,
}

impl Server {
    /// Bind to `addr`. Use port `0` to let the OS pick one, then read it back
    /// with [`local_addr`](Server::local_addr).
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        Ok(Self {
            listener,
            addr,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            read_timeout: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// How long in-flight connections get to finish once stopping begins.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Maximum time a client may take to send request headers (HTTP/1).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Accept connections and dispatch them through `service` until `stop`
    /// resolves or the listener fails, then drain.
    pub async fn serve<S, F>(self, service: S, stop: F) -> Result<(), Error>
    where
        S: Service,
        F: Future<Output = ()> + Send,
    {
        let Server { listener, addr, shutdown_timeout, read_timeout } = self;
        let service = Arc::new(service);

        let mut builder = ConnBuilder::new(TokioExecutor::new());
        if let Some(timeout) = read_timeout {
            builder.http1().timer(TokioTimer::new()).header_read_timeout(timeout);
        }

        // Cancelled once, when draining begins. Every connection and request
        // scope hangs off it.
        let stopping = CancellationToken::new();

        info!(%addr, "listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(stop);

        let outcome = loop {
            tokio::select! {
                // Check the stop future first so a notice immediately stops
                // accepting, even if more connections are queued.
                biased;

                () = &mut stop => {
                    info!(%addr, in_flight = tasks.len(), "shutdown started, draining connections");
                    break Ok(());
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) if is_transient(&e) => {
                            warn!("accept error: {e}");
                            continue;
                        }
                        Err(e) => {
                            error!(%addr, "listener failed: {e}");
                            break Err(Error::Transport(e));
                        }
                    };

                    let service = Arc::clone(&service);
                    let builder = builder.clone();
                    let stopping = stopping.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let request_stop = stopping.clone();
                        let svc = service_fn(move |req| {
                            let service = Arc::clone(&service);
                            let stopping = request_stop.clone();
                            async move {
                                Ok::<_, Infallible>(
                                    dispatch(&*service, req, remote_addr, &stopping).await,
                                )
                            }
                        });

                        let conn = builder.serve_connection(io, svc);
                        tokio::pin!(conn);

                        let res = tokio::select! {
                            res = conn.as_mut() => res,
                            () = stopping.cancelled() => {
                                conn.as_mut().graceful_shutdown();
                                conn.await
                            }
                        };
                        if let Err(e) = res {
                            debug!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        };

        drop(listener);
        stopping.cancel();

        let drained = tokio::time::timeout(shutdown_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(%addr, remaining = tasks.len(), "graceful stop timed out, closing connections");
            tasks.shutdown().await;
            return Err(Error::ShutdownTimeout(shutdown_timeout));
        }

        info!(%addr, "server stopped");
        outcome
    }
}

// ── Accept errors ─────────────────────────────────────────────────────────────

/// Per-connection accept failures that do not mean the listener is broken.
///
/// A peer that resets before `accept` returns is its own problem. Treating it
/// as fatal would let one flaky client take the whole process down.
fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted
    )
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Read the body, build a [`Request`] and hand it to the service.
///
/// Never fails from hyper's point of view: a broken body is answered with
/// `400` here, and everything else is the service's to turn into a response.
async fn dispatch<S: Service>(
    service: &S,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    stopping: &CancellationToken,
) -> http::Response<Full<Bytes>> {
    // Dropping this future (client went away) cancels the request scope.
    let cancel = stopping.child_token();
    let _guard = cancel.clone().drop_guard();

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(peer = %remote_addr, "reading request body: {e}");
            return Response::status(StatusCode::BAD_REQUEST).into_inner();
        }
    };

    let req = Request::from_parts(parts, body, remote_addr);
    service.serve(Scope::new(cancel), req).await.into_inner()
}
