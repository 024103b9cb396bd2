//! # Stoa Middleware
//!
//! Onion-model middleware composition and dispatch for the Stoa toolkit.
//!
//! This crate provides the generic execution engine: middleware are
//! composed into an immutable pipeline and each run threads a context
//! through the chain, innermost last. The engine knows nothing about HTTP;
//! it is generic over the context type `C` and the result type `T`.
//!
//! ## Execution model
//!
//! ```text
//! dispatch ──> first ──> second ──> third ──> finalizer
//!                │          │          │           │
//!                └──────────┴── result <───────────┘
//! ```
//!
//! Each middleware runs code before and after delegating to the rest of
//! the chain. Control flows inward until a middleware short-circuits or
//! the chain is exhausted, then unwinds back out in reverse order. The
//! outermost middleware's return value is the dispatch result.
//!
//! ## Key Features
//!
//! - **Compose once, run many**: a [`Pipeline`] is immutable and every run
//!   gets a fresh chain position, so runs never interfere
//! - **Compile-once dispatch**: a [`Dispatcher`] compiles its stack on
//!   first dispatch and reuses the pipeline afterwards
//! - **Single-shot continuations**: [`Next::run`] consumes the
//!   continuation, so a middleware cannot resume the chain twice
//! - **Transparent errors**: failures cross the chain as [`BoxError`]
//!   without being wrapped or rewritten
//!
//! ## Example
//!
//! ```ignore
//! use stoa_middleware::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.mount(Logging).mount(CountHops);
//!
//! let mut cx = Visit::default();
//! let result = dispatcher.dispatch(&mut cx).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/stoa-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod dispatcher;
pub mod middleware;
pub mod pipeline;

// Re-export main types at crate root
pub use dispatcher::Dispatcher;
pub use middleware::{BoxError, BoxFuture, Finalizer, FnMiddleware, Middleware, MiddlewareResult, Next};
pub use pipeline::{compose, BoxedMiddleware, Pipeline};
