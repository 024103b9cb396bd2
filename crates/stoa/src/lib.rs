//! # Stoa
//!
//! A minimal onion-model middleware framework for HTTP services.
//!
//! An [`Application`] owns an ordered middleware chain and a template of
//! context properties. Each request gets its own [`Context`]; middleware
//! run in mount order, may hand off downstream with `next.run(cx)`, and
//! whatever the outermost middleware returns becomes the response. The
//! bundled [`Server`] speaks HTTP/1.1 over Tokio and drives the
//! application for every request.
//!
//! ## Example
//!
//! ```ignore
//! use stoa::{
//!     Application, BoxFuture, Context, MiddlewareResult, Next, Response, Server, ServerConfig,
//! };
//!
//! fn greet<'a>(
//!     cx: &'a mut Context,
//!     _next: Next<'a, Context, Response>,
//! ) -> BoxFuture<'a, MiddlewareResult<Response>> {
//!     Box::pin(async move {
//!         let greeting = cx.get::<String>("greeting").unwrap();
//!         Ok(Response::text(greeting.to_string()))
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = Application::new();
//!     app.set("greeting", "hello from stoa".to_string());
//!     app.mount_fn("greet", greet);
//!
//!     let server = Server::new(ServerConfig::default(), app);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/stoa/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod application;
pub mod context;

pub use application::Application;
pub use context::{Context, ContextFactory};

pub use stoa_http::{
    error_to_response, Handler, HttpError, Request, Response, Server, ServerConfig,
    ServerConfigBuilder, ServerError, ShutdownSignal,
};
pub use stoa_middleware::{
    compose, BoxError, BoxFuture, Dispatcher, FnMiddleware, Middleware, MiddlewareResult, Next,
    Pipeline,
};
