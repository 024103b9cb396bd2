//! HTTP server implementation.
//!
//! The server owns a TCP listener and a [`Handler`], built on Hyper and
//! Tokio for async I/O.
//!
//! # Architecture
//!
//! - TCP listener bound to the configured address
//! - One spawned task per connection, tracked for graceful shutdown
//! - Every request is collected into a [`Request`] and passed to the
//!   handler; its result becomes the wire response
//!
//! # Example
//!
//! ```rust,ignore
//! use stoa_http::{Request, Response, Server, ServerConfig};
//!
//! async fn hello(_request: Request) -> Result<Response, stoa_http::BoxError> {
//!     Ok(Response::text("hello"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(ServerConfig::default(), hello);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::error_to_response;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;
use crate::shutdown::{wait_for_os_signal, ConnectionTracker, ShutdownSignal};

type WireResponse = http::Response<Full<Bytes>>;

/// The Stoa HTTP server.
///
/// Accepts connections and feeds every request through the configured
/// [`Handler`]. Shutdown is cooperative: [`Server::stop`] (or an OS
/// signal while [`Server::run`] is in charge) stops the accept loop and
/// waits for in-flight connections up to the configured grace period.
pub struct Server {
    /// Server configuration.
    config: ServerConfig,

    /// Handler invoked for every request.
    handler: Arc<dyn Handler>,

    /// Shutdown signal shared with the accept loop.
    shutdown: ShutdownSignal,

    /// In-flight connection count.
    tracker: ConnectionTracker,
}

impl Server {
    /// Creates a server with the given configuration and handler.
    #[must_use]
    pub fn new(config: ServerConfig, handler: impl Handler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            shutdown: ShutdownSignal::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns a clone of the shutdown signal.
    ///
    /// Triggering it from anywhere stops the server.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Returns the number of connections currently being served.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.tracker.active()
    }

    /// Binds the listener and starts accepting connections in the
    /// background.
    ///
    /// Returns the bound address, which is the way to discover the port
    /// when the configuration asked for port `0`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured address does not parse or
    /// the listener cannot bind.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddr {
                addr: self.config.addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        tracing::info!("server listening on {}", local_addr);

        let acceptor = Acceptor {
            handler: Arc::clone(&self.handler),
            shutdown: self.shutdown.clone(),
            tracker: self.tracker.clone(),
            request_timeout: self.config.request_timeout(),
        };
        tokio::spawn(acceptor.accept_loop(listener));

        Ok(local_addr)
    }

    /// Stops the server and waits for in-flight connections.
    ///
    /// Safe to call more than once; later calls only wait.
    pub async fn stop(&self) {
        self.shutdown.trigger();
        self.drain().await;
    }

    /// Runs the server until shutdown is triggered or an OS signal
    /// arrives, then drains in-flight connections.
    ///
    /// # Errors
    ///
    /// Returns an error when the server cannot start.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.start().await?;

        tokio::select! {
            _ = self.shutdown.recv() => {
                tracing::info!("shutdown signal received, stopping server");
            }
            _ = wait_for_os_signal() => {
                self.shutdown.trigger();
            }
        }

        self.drain().await;
        tracing::info!("server stopped");
        Ok(())
    }

    /// Waits for in-flight connections, up to the shutdown grace period.
    async fn drain(&self) {
        let grace = self.config.shutdown_grace();
        tracing::info!(
            "waiting up to {:?} for {} connections to close",
            grace,
            self.tracker.active()
        );

        tokio::select! {
            _ = self.tracker.wait_idle() => {
                tracing::info!("all connections closed");
            }
            _ = tokio::time::sleep(grace) => {
                tracing::warn!(
                    "shutdown grace period elapsed, {} connections still active",
                    self.tracker.active()
                );
            }
        }
    }
}

/// Shared state for the spawned accept loop.
#[derive(Clone)]
struct Acceptor {
    handler: Arc<dyn Handler>,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
    request_timeout: Option<Duration>,
}

impl Acceptor {
    /// Accepts connections until shutdown.
    async fn accept_loop(self, listener: TcpListener) {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let acceptor = self.clone();
                            let guard = self.tracker.acquire();

                            tokio::spawn(async move {
                                if let Err(e) = acceptor.serve_connection(stream, peer_addr).await {
                                    tracing::error!("connection error from {}: {}", peer_addr, e);
                                }
                                drop(guard);
                            });
                        }
                        Err(e) => {
                            tracing::error!("failed to accept connection: {}", e);
                        }
                    }
                }

                _ = self.shutdown.recv() => {
                    tracing::info!("no longer accepting connections");
                    break;
                }
            }
        }
    }

    /// Serves a single connection until it closes or shutdown arrives.
    async fn serve_connection(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let acceptor = self.clone();

        let service = service_fn(move |req: hyper::Request<Incoming>| {
            let acceptor = acceptor.clone();
            async move { acceptor.handle_request(req, peer_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        tokio::select! {
            result = conn => {
                result
            }
            _ = self.shutdown.recv() => {
                tracing::debug!("connection from {} closed due to shutdown", peer_addr);
                Ok(())
            }
        }
    }

    /// Handles a single HTTP request.
    async fn handle_request(
        &self,
        req: hyper::Request<Incoming>,
        peer_addr: SocketAddr,
    ) -> Result<WireResponse, Infallible> {
        let (parts, body) = req.into_parts();
        tracing::debug!("{} {}", parts.method, parts.uri.path());

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::error!("failed to collect request body: {}", e);
                let response = Response::text("Bad Request").status(StatusCode::BAD_REQUEST);
                return Ok(response.into_http());
            }
        };

        let request = Request::from_hyper(parts, body, Some(peer_addr));
        let method = request.method().clone();
        let path = request.path().to_string();

        let result = match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.handler.handle(request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("handler timed out for {} {}", method, path);
                    let response =
                        Response::text("Gateway Timeout").status(StatusCode::GATEWAY_TIMEOUT);
                    return Ok(response.into_http());
                }
            },
            None => self.handler.handle(request).await,
        };

        match result {
            Ok(response) => Ok(response.into_http()),
            Err(e) => {
                tracing::error!("handler error for {} {}: {}", method, path, e);
                Ok(error_to_response(&e).into_http())
            }
        }
    }
}

/// Server error types.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured listen address does not parse.
    #[error("invalid listen address '{addr}'")]
    InvalidAddr {
        /// The address as configured.
        addr: String,
        /// The underlying parse failure.
        #[source]
        source: AddrParseError,
    },

    /// Binding the listener failed.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address the server tried to bind.
        addr: SocketAddr,
        /// The underlying bind failure.
        #[source]
        source: io::Error,
    },

    /// I/O error during server operation.
    #[error("server i/o error")]
    Io(#[from] io::Error),
}
