//! # Stoa HTTP
//!
//! HTTP types and hyper-based server for the Stoa toolkit.
//!
//! This crate provides the HTTP-facing half of Stoa:
//!
//! - Owned [`Request`] and [`Response`] types with header conveniences
//! - A [`Handler`] trait the server is generic over
//! - An HTTP/1.1 server via Hyper with graceful shutdown
//! - Error-to-response mapping that keeps internal detail out of replies
//!
//! ## Example
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
//!     let config = ServerConfig::builder().addr("0.0.0.0:8080").build();
//!     let server = Server::new(config, hello);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/stoa-http/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{error_to_response, HttpError};
pub use handler::Handler;
pub use request::Request;
pub use response::Response;
pub use server::{Server, ServerError};
pub use shutdown::{ConnectionGuard, ConnectionTracker, ShutdownReceiver, ShutdownSignal};

pub use stoa_middleware::{BoxError, BoxFuture};
