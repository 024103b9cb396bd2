//! Core middleware trait and the continuation type that drives the chain.
//!
//! Middleware wraps the rest of the chain like layers of an onion: code
//! before `next.run()` executes on the way in, code after it executes on
//! the way out, in reverse registration order.
//!
//! # Design Philosophy
//!
//! The engine is generic over the context type `C` and the result type `T`,
//! so the same composition machinery serves HTTP dispatch and any other
//! staged processing. A middleware that does not invoke its continuation
//! short-circuits the chain; downstream middleware never runs and the
//! short-circuiting middleware's return value becomes the chain result.
//!
//! # Example
//!
//! ```ignore
//! use stoa_middleware::{BoxFuture, Middleware, MiddlewareResult, Next};
//!
//! struct Logging;
//!
//! impl Middleware<Visit, u32> for Logging {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         cx: &'a mut Visit,
//!         next: Next<'a, Visit, u32>,
//!     ) -> BoxFuture<'a, MiddlewareResult<u32>> {
//!         Box::pin(async move {
//!             println!("entering: {}", cx.label);
//!             let result = next.run(cx).await;
//!             println!("leaving: {}", cx.label);
//!             result
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

/// A boxed future as returned by middleware implementations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased error that can cross middleware boundaries.
///
/// Errors raised anywhere in the chain propagate to the dispatch caller
/// unchanged; callers can recover the concrete type with
/// [`Error::downcast_ref`](std::error::Error) through the box.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The result type produced by a middleware chain.
pub type MiddlewareResult<T> = Result<T, BoxError>;

/// A deferred producer invoked when the chain runs past its last middleware.
///
/// The closure itself may borrow for `'a`, but the future it returns must be
/// self-contained.
pub type Finalizer<'a, T> =
    Box<dyn FnOnce() -> BoxFuture<'static, MiddlewareResult<T>> + Send + 'a>;

/// The core middleware trait.
///
/// Each middleware receives exclusive access to the context and a [`Next`]
/// continuation representing everything downstream of it.
///
/// # Invariants
///
/// - Calling `next.run()` more than once is impossible: [`Next::run`]
///   consumes the continuation.
/// - A middleware that returns without calling `next.run()` short-circuits
///   the chain.
/// - Errors from downstream SHOULD be returned as-is so callers can react
///   to the original error.
///
/// # Example
///
/// ```ignore
/// impl Middleware<Visit, u32> for CountHops {
///     fn process<'a>(
///         &'a self,
///         cx: &'a mut Visit,
///         next: Next<'a, Visit, u32>,
///     ) -> BoxFuture<'a, MiddlewareResult<u32>> {
///         Box::pin(async move {
///             cx.hops += 1;
///             next.run(cx).await
///         })
///     }
/// }
/// ```
pub trait Middleware<C, T>: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    ///
    /// Defaults to the implementing type's name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Process the context through this middleware.
    ///
    /// Call `next.run(cx)` to hand control to the rest of the chain, or
    /// return without calling it to short-circuit.
    fn process<'a>(
        &'a self,
        cx: &'a mut C,
        next: Next<'a, C, T>,
    ) -> BoxFuture<'a, MiddlewareResult<T>>;
}

/// Continuation over the remaining middleware chain.
///
/// Passed to every middleware invocation. Running it hands control to the
/// next middleware; when the chain is exhausted the finalizer supplied at
/// composition time produces the result.
pub struct Next<'a, C, T> {
    /// The remaining chain.
    inner: NextInner<'a, C, T>,
}

/// Internal representation of the remaining chain.
enum NextInner<'a, C, T> {
    /// More middleware to process.
    Chain {
        middleware: &'a dyn Middleware<C, T>,
        next: Box<Next<'a, C, T>>,
    },
    /// End of chain: invoke the finalizer.
    Done(Finalizer<'a, T>),
}

impl<'a, C: 'static, T: 'static> Next<'a, C, T> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware<C, T>, next: Next<'a, C, T>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the finalizer.
    pub(crate) fn done(finalizer: Finalizer<'a, T>) -> Self {
        Self {
            inner: NextInner::Done(finalizer),
        }
    }

    /// Invokes the next middleware in the chain, or the finalizer if the
    /// chain is exhausted.
    ///
    /// This consumes `self` to ensure it can only be called once.
    pub async fn run(self, cx: &mut C) -> MiddlewareResult<T> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(cx, *next).await,
            NextInner::Done(finalizer) => finalizer().await,
        }
    }
}

/// A middleware built from an async function.
///
/// This allows defining simple middleware without implementing the trait
/// directly. Plain `fn` items with explicit [`BoxFuture`] signatures
/// satisfy the bound; closure literals usually need type annotations.
///
/// # Example
///
/// ```ignore
/// fn stamp<'a>(
///     cx: &'a mut Visit,
///     next: Next<'a, Visit, u32>,
/// ) -> BoxFuture<'a, MiddlewareResult<u32>> {
///     Box::pin(async move {
///         cx.entered = true;
///         next.run(cx).await
///     })
/// }
///
/// let middleware = FnMiddleware::new("stamp", stamp);
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<C, T, F> Middleware<C, T> for FnMiddleware<F>
where
    C: 'static,
    T: 'static,
    F: for<'a> Fn(&'a mut C, Next<'a, C, T>) -> BoxFuture<'a, MiddlewareResult<T>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        cx: &'a mut C,
        next: Next<'a, C, T>,
    ) -> BoxFuture<'a, MiddlewareResult<T>> {
        (self.func)(cx, next)
    }
}
