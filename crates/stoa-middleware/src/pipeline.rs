//! Middleware composition.
//!
//! [`compose`] turns an ordered list of middleware into a [`Pipeline`], a
//! single reusable unit that runs the whole chain. Each run builds a fresh
//! continuation chain from back to front, so a pipeline can be run
//! repeatedly and concurrently without any shared cursor state.
//!
//! ## Execution order
//!
//! ```text
//! run() ──> first ──> second ──> ... ──> last ──> finalizer
//!             │                                      │
//!             └──────────── result <─────────────────┘
//! ```
//!
//! Middleware registered first runs outermost: its pre-`next` code executes
//! first and its post-`next` code executes last, and its return value is the
//! pipeline result.

use crate::middleware::{BoxFuture, Finalizer, Middleware, MiddlewareResult, Next};
use std::future::Future;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a chain.
pub type BoxedMiddleware<C, T> = Arc<dyn Middleware<C, T>>;

/// Composes an ordered list of middleware into a single [`Pipeline`].
///
/// The list order is the execution order. Composing an empty list is valid;
/// running the resulting pipeline resolves to the finalizer's output, or to
/// `T::default()` when run without one.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use stoa_middleware::{compose, BoxedMiddleware};
///
/// let stack: Vec<BoxedMiddleware<Visit, u32>> =
///     vec![Arc::new(Logging), Arc::new(CountHops)];
/// let pipeline = compose(stack);
///
/// let mut cx = Visit::default();
/// let result = pipeline.run(&mut cx).await?;
/// ```
pub fn compose<C, T>(middlewares: Vec<BoxedMiddleware<C, T>>) -> Pipeline<C, T>
where
    C: 'static,
    T: 'static,
{
    Pipeline::new(middlewares)
}

/// An immutable, reusable middleware chain.
///
/// The chain is fixed at composition time. Running the pipeline never
/// mutates it, so a single pipeline can serve overlapping runs; each run
/// gets its own continuation chain and therefore its own position in it.
pub struct Pipeline<C, T> {
    /// Middleware in execution order.
    chain: Arc<[BoxedMiddleware<C, T>]>,
}

impl<C: 'static, T: 'static> Pipeline<C, T> {
    /// Creates a pipeline from middleware in execution order.
    #[must_use]
    pub fn new(middlewares: Vec<BoxedMiddleware<C, T>>) -> Self {
        Self {
            chain: middlewares.into(),
        }
    }

    /// Runs the chain to completion.
    ///
    /// If every middleware delegates and the chain runs past its end, the
    /// result is `T::default()`. The value returned by the outermost
    /// middleware becomes the pipeline result.
    pub async fn run(&self, cx: &mut C) -> MiddlewareResult<T>
    where
        T: Default + Send + 'static,
    {
        self.run_with(cx, || async { Ok(T::default()) }).await
    }

    /// Runs the chain with a finalizer invoked if the chain is exhausted.
    ///
    /// The finalizer only runs when every middleware delegated all the way
    /// through; a short-circuiting middleware or an error skips it.
    pub async fn run_with<F, Fut>(&self, cx: &mut C, done: F) -> MiddlewareResult<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = MiddlewareResult<T>> + Send + 'static,
    {
        let finalizer: Finalizer<'_, T> = Box::new(move || {
            let fut: BoxFuture<'static, MiddlewareResult<T>> = Box::pin(done());
            fut
        });
        self.build_chain(finalizer).run(cx).await
    }

    /// Builds the continuation chain for one run, from back to front.
    fn build_chain<'a>(&'a self, finalizer: Finalizer<'a, T>) -> Next<'a, C, T> {
        let mut next = Next::done(finalizer);
        for middleware in self.chain.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all middleware in execution order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns `true` if the chain contains no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

// Derived Clone would require C: Clone and T: Clone; the chain itself is
// always shareable.
impl<C, T> Clone for Pipeline<C, T> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
        }
    }
}
