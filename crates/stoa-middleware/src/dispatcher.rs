//! Middleware registration and dispatch.
//!
//! A [`Dispatcher`] collects middleware during a setup phase, then compiles
//! them into a [`Pipeline`] on the first dispatch and reuses that pipeline
//! for every dispatch after it.
//!
//! Registration takes `&mut self` and dispatch takes `&self`, so a
//! dispatcher shared behind an `Arc` can serve concurrent dispatches while
//! the type system rules out concurrent mounts.

use crate::middleware::{FnMiddleware, Middleware, MiddlewareResult};
use crate::pipeline::{BoxedMiddleware, Pipeline};
use std::sync::Arc;
use std::sync::OnceLock;

/// Collects middleware and dispatches contexts through the compiled chain.
///
/// # Compile-once semantics
///
/// The first call to [`dispatch`](Self::dispatch) compiles the mounted
/// middleware into an immutable pipeline. Middleware mounted after that
/// point stays in the registration stack but does not take part in
/// dispatch; such mounts are logged as warnings.
///
/// # Example
///
/// ```ignore
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.mount(Logging).mount(CountHops);
///
/// let mut cx = Visit::default();
/// let result = dispatcher.dispatch(&mut cx).await?;
/// ```
pub struct Dispatcher<C, T> {
    /// Middleware in mount order.
    stack: Vec<BoxedMiddleware<C, T>>,

    /// Pipeline compiled on first dispatch.
    compiled: OnceLock<Pipeline<C, T>>,
}

impl<C: 'static, T: 'static> Dispatcher<C, T> {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Mounts a middleware at the end of the stack.
    ///
    /// Mount order is execution order. Mounting after the first dispatch
    /// leaves the compiled pipeline unchanged.
    pub fn mount<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<C, T>,
    {
        let middleware: BoxedMiddleware<C, T> = Arc::new(middleware);
        if self.compiled.get().is_some() {
            tracing::warn!(
                middleware = middleware.name(),
                "middleware mounted after first dispatch; compiled pipeline is unchanged"
            );
        } else {
            tracing::debug!(middleware = middleware.name(), "mounting middleware");
        }
        self.stack.push(middleware);
        self
    }

    /// Mounts an async function as middleware under the given name.
    ///
    /// See [`FnMiddleware`] for the function signature this accepts.
    pub fn mount_fn<F>(&mut self, name: &'static str, func: F) -> &mut Self
    where
        FnMiddleware<F>: Middleware<C, T>,
    {
        self.mount(FnMiddleware::new(name, func))
    }

    /// Dispatches a context through the middleware chain.
    ///
    /// The first dispatch compiles the pipeline; every later dispatch
    /// reuses it. Concurrent dispatches are independent: each gets its own
    /// chain position.
    pub async fn dispatch(&self, cx: &mut C) -> MiddlewareResult<T>
    where
        T: Default + Send + 'static,
    {
        let pipeline = self.compiled.get_or_init(|| {
            tracing::debug!(
                middleware_count = self.stack.len(),
                "compiling middleware pipeline"
            );
            Pipeline::new(self.stack.clone())
        });
        pipeline.run(cx).await
    }

    /// Returns the names of all mounted middleware in mount order.
    ///
    /// This reflects the registration stack, which can be longer than the
    /// compiled pipeline if middleware was mounted after the first dispatch.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of mounted middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if no middleware has been mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns `true` once the pipeline has been compiled.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }
}

impl<C: 'static, T: 'static> Default for Dispatcher<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, Next};

    #[derive(Default)]
    struct Trace {
        log: Vec<&'static str>,
    }

    struct Record {
        name: &'static str,
    }

    impl Middleware<Trace, i32> for Record {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            cx: &'a mut Trace,
            next: Next<'a, Trace, i32>,
        ) -> BoxFuture<'a, MiddlewareResult<i32>> {
            Box::pin(async move {
                cx.log.push(self.name);
                next.run(cx).await
            })
        }
    }

    #[tokio::test]
    async fn dispatch_runs_mounted_middleware_in_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .mount(Record { name: "first" })
            .mount(Record { name: "second" })
            .mount(Record { name: "third" });

        let mut cx = Trace::default();
        let result = dispatcher.dispatch(&mut cx).await.unwrap();

        assert_eq!(result, 0);
        assert_eq!(cx.log, vec!["first", "second", "third"]);
        assert_eq!(
            dispatcher.middleware_names(),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn empty_dispatcher_resolves_to_default() {
        let dispatcher: Dispatcher<Trace, i32> = Dispatcher::new();
        assert!(dispatcher.is_empty());

        let mut cx = Trace::default();
        let result = dispatcher.dispatch(&mut cx).await.unwrap();

        assert_eq!(result, 0);
    }

    #[tokio::test]
    async fn mount_after_first_dispatch_does_not_take_effect() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.mount(Record { name: "first" });

        let mut cx = Trace::default();
        dispatcher.dispatch(&mut cx).await.unwrap();
        assert_eq!(cx.log, vec!["first"]);
        assert!(dispatcher.is_compiled());

        dispatcher.mount(Record { name: "late" });

        // The stack records the late mount, the compiled pipeline does not.
        assert_eq!(dispatcher.middleware_names(), vec!["first", "late"]);
        assert_eq!(dispatcher.len(), 2);

        let mut cx = Trace::default();
        dispatcher.dispatch(&mut cx).await.unwrap();
        assert_eq!(cx.log, vec!["first"]);
    }

    #[tokio::test]
    async fn dispatch_reuses_the_compiled_pipeline() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .mount(Record { name: "first" })
            .mount(Record { name: "second" });

        assert!(!dispatcher.is_compiled());

        let mut first = Trace::default();
        let mut second = Trace::default();
        dispatcher.dispatch(&mut first).await.unwrap();
        dispatcher.dispatch(&mut second).await.unwrap();

        assert_eq!(first.log, vec!["first", "second"]);
        assert_eq!(second.log, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn mount_fn_wraps_plain_functions() {
        fn record_fn<'a>(
            cx: &'a mut Trace,
            next: Next<'a, Trace, i32>,
        ) -> BoxFuture<'a, MiddlewareResult<i32>> {
            Box::pin(async move {
                cx.log.push("from-fn");
                next.run(cx).await
            })
        }

        let mut dispatcher = Dispatcher::new();
        dispatcher.mount_fn("record", record_fn);

        let mut cx = Trace::default();
        dispatcher.dispatch(&mut cx).await.unwrap();

        assert_eq!(cx.log, vec!["from-fn"]);
        assert_eq!(dispatcher.middleware_names(), vec!["record"]);
    }
}
