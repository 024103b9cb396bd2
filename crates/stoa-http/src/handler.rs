//! Request handler abstraction.
//!
//! The server is generic over anything that turns a [`Request`] into a
//! [`Response`]. Plain async functions qualify through a blanket
//! implementation, so the simplest server needs no types of its own:
//!
//! ```ignore
//! async fn hello(_request: Request) -> Result<Response, BoxError> {
//!     Ok(Response::text("hello"))
//! }
//!
//! let server = Server::new(ServerConfig::default(), hello);
//! ```

use crate::request::Request;
use crate::response::Response;
use std::future::Future;
use stoa_middleware::{BoxError, BoxFuture};

/// Something that turns a request into a response.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    ///
    /// Failures are reported as boxed errors; the server maps them to an
    /// HTTP response with [`crate::error_to_response`].
    fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Result<Response, BoxError>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Result<Response, BoxError>> {
        Box::pin(self(request))
    }
}
