//! Application assembly.
//!
//! [`Application`] is the composition root: one [`Dispatcher`] for the
//! middleware chain and one [`ContextFactory`] for per-request contexts.
//! Mount middleware, register context properties, then let the server
//! feed requests through [`Application::handle`].
//!
//! ```ignore
//! use stoa::{Application, Server, ServerConfig};
//!
//! let mut app = Application::new();
//! app.set("app-name", "demo".to_string());
//! app.mount(RequestLog);
//! app.mount(Respond);
//!
//! let server = Server::new(ServerConfig::default(), app);
//! server.run().await?;
//! ```

use std::any::Any;
use std::sync::Arc;

use stoa_http::{Handler, Request, Response};
use stoa_middleware::{BoxError, BoxFuture, Dispatcher, FnMiddleware, Middleware};

use crate::context::{Context, ContextFactory};

/// An onion-model HTTP application.
///
/// Requests are dispatched through the mounted middleware in mount
/// order. A chain that runs out of middleware resolves to the default
/// empty response.
#[derive(Default)]
pub struct Application {
    /// Middleware registration and dispatch.
    dispatcher: Dispatcher<Context, Response>,

    /// Template for per-request contexts.
    context: ContextFactory,
}

impl Application {
    /// Creates an application with no middleware and an empty context
    /// template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts a middleware at the end of the chain.
    pub fn mount<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<Context, Response>,
    {
        self.dispatcher.mount(middleware);
        self
    }

    /// Mounts a plain function as middleware under the given name.
    pub fn mount_fn<F>(&mut self, name: &'static str, func: F) -> &mut Self
    where
        FnMiddleware<F>: Middleware<Context, Response>,
    {
        self.dispatcher.mount_fn(name, func);
        self
    }

    /// Registers a context property shared by every request.
    pub fn set<V>(&self, name: impl Into<String>, value: V) -> &Self
    where
        V: Any + Send + Sync,
    {
        let name = name.into();
        tracing::debug!(property = %name, "registering shared context property");
        self.context.set(name, value);
        self
    }

    /// Registers a lazily computed context property, evaluated at most
    /// once per request.
    pub fn bind<F, V>(&self, name: impl Into<String>, compute: F) -> &Self
    where
        F: Fn(&mut Context) -> V + Send + Sync + 'static,
        V: Any + Send + Sync,
    {
        let name = name.into();
        tracing::debug!(property = %name, "registering lazy context property");
        self.context.bind(name, compute);
        self
    }

    /// Reads a shared property from the context template.
    #[must_use]
    pub fn get<V>(&self, name: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        self.context.get(name)
    }

    /// Returns `true` if the context template has a registration under
    /// `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.context.has(name)
    }

    /// Returns the names of the mounted middleware, in mount order.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.dispatcher.middleware_names()
    }

    /// Handles one request: builds a context and dispatches it through
    /// the middleware chain.
    ///
    /// # Errors
    ///
    /// Returns whatever error the chain failed with, unchanged.
    pub async fn handle(&self, request: Request) -> Result<Response, BoxError> {
        tracing::debug!(method = %request.method(), path = request.path(), "dispatching request");
        let mut cx = self.context.create(request);
        self.dispatcher.dispatch(&mut cx).await
    }
}

impl Handler for Application {
    fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Result<Response, BoxError>> {
        Box::pin(self.handle(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use stoa_middleware::{MiddlewareResult, Next};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn request() -> Request {
        Request::new(Method::GET, "/")
    }

    /// Pushes a tag, then hands off to the rest of the chain.
    struct Tail {
        tag: &'static str,
        log: Log,
    }

    impl Middleware<Context, Response> for Tail {
        fn name(&self) -> &'static str {
            "tail"
        }

        fn process<'a>(
            &'a self,
            cx: &'a mut Context,
            next: Next<'a, Context, Response>,
        ) -> BoxFuture<'a, MiddlewareResult<Response>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.tag);
                next.run(cx).await
            })
        }
    }

    /// Pushes a tag and ends the chain with a fixed response.
    struct Respond {
        tag: &'static str,
        log: Log,
        body: &'static str,
    }

    impl Middleware<Context, Response> for Respond {
        fn name(&self) -> &'static str {
            "respond"
        }

        fn process<'a>(
            &'a self,
            _cx: &'a mut Context,
            _next: Next<'a, Context, Response>,
        ) -> BoxFuture<'a, MiddlewareResult<Response>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.tag);
                Ok(Response::text(self.body))
            })
        }
    }

    /// Writes a note into the context, then continues.
    struct Annotate;

    impl Middleware<Context, Response> for Annotate {
        fn name(&self) -> &'static str {
            "annotate"
        }

        fn process<'a>(
            &'a self,
            cx: &'a mut Context,
            next: Next<'a, Context, Response>,
        ) -> BoxFuture<'a, MiddlewareResult<Response>> {
            Box::pin(async move {
                cx.set("note", "from-annotate".to_string());
                next.run(cx).await
            })
        }
    }

    /// Replies with the note left by an upstream middleware.
    struct ReadNote;

    impl Middleware<Context, Response> for ReadNote {
        fn name(&self) -> &'static str {
            "read-note"
        }

        fn process<'a>(
            &'a self,
            cx: &'a mut Context,
            _next: Next<'a, Context, Response>,
        ) -> BoxFuture<'a, MiddlewareResult<Response>> {
            Box::pin(async move {
                let note = cx.get::<String>("note").unwrap();
                Ok(Response::text(note.to_string()))
            })
        }
    }

    /// Fails the chain.
    struct Explode;

    impl Middleware<Context, Response> for Explode {
        fn name(&self) -> &'static str {
            "explode"
        }

        fn process<'a>(
            &'a self,
            _cx: &'a mut Context,
            _next: Next<'a, Context, Response>,
        ) -> BoxFuture<'a, MiddlewareResult<Response>> {
            Box::pin(async move { Err(anyhow::anyhow!("x").into()) })
        }
    }

    /// Replies with this request's own path.
    struct EchoPath;

    impl Middleware<Context, Response> for EchoPath {
        fn name(&self) -> &'static str {
            "echo-path"
        }

        fn process<'a>(
            &'a self,
            cx: &'a mut Context,
            _next: Next<'a, Context, Response>,
        ) -> BoxFuture<'a, MiddlewareResult<Response>> {
            Box::pin(async move {
                cx.set("path", cx.request().path().to_string());
                let path = cx.get::<String>("path").unwrap();
                Ok(Response::text(path.to_string()))
            })
        }
    }

    #[tokio::test]
    async fn middleware_runs_in_mount_order_until_short_circuit() {
        let log: Log = Log::default();
        let mut app = Application::new();
        app.mount(Tail { tag: "A-in", log: Arc::clone(&log) });
        app.mount(Respond { tag: "B", log: Arc::clone(&log), body: "from b" });

        let response = app.handle(request()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["A-in", "B"]);
        assert_eq!(response.body_bytes().as_ref(), b"from b");
    }

    #[tokio::test]
    async fn context_flows_between_middleware() {
        let mut app = Application::new();
        app.mount(Annotate);
        app.mount(ReadNote);

        let response = app.handle(request()).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"from-annotate");
    }

    #[tokio::test]
    async fn empty_application_resolves_to_no_content() {
        let app = Application::new();
        let response = app.handle(request()).await.unwrap();
        assert_eq!(response.status_code(), http::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn errors_pass_through_unchanged() {
        let log: Log = Log::default();
        let mut app = Application::new();
        app.mount(Tail { tag: "first", log: Arc::clone(&log) });
        app.mount(Explode);

        let err = app.handle(request()).await.unwrap_err();
        assert_eq!(err.to_string(), "x");
        assert_eq!(*log.lock().unwrap(), ["first"]);
    }

    #[tokio::test]
    async fn bound_properties_memoize_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = {
            let mut app = Application::new();
            let counter = Arc::clone(&calls);
            app.bind("serial", move |_cx| counter.fetch_add(1, Ordering::SeqCst));
            app.mount_fn("reply-serial", reply_serial);
            app
        };

        let first = app.handle(request()).await.unwrap();
        let second = app.handle(request()).await.unwrap();

        assert_eq!(first.body_bytes().as_ref(), b"0/0");
        assert_eq!(second.body_bytes().as_ref(), b"1/1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// Reads the bound serial twice; both reads must agree.
    fn reply_serial<'a>(
        cx: &'a mut Context,
        _next: Next<'a, Context, Response>,
    ) -> BoxFuture<'a, MiddlewareResult<Response>> {
        Box::pin(async move {
            let first = *cx.get::<usize>("serial").unwrap();
            let second = *cx.get::<usize>("serial").unwrap();
            Ok(Response::text(format!("{first}/{second}")))
        })
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_share_state() {
        let mut app = Application::new();
        app.mount(EchoPath);
        let app = Arc::new(app);

        let left = app.handle(Request::new(Method::GET, "/left"));
        let right = app.handle(Request::new(Method::GET, "/right"));
        let (left, right) = tokio::join!(left, right);

        assert_eq!(left.unwrap().body_bytes().as_ref(), b"/left");
        assert_eq!(right.unwrap().body_bytes().as_ref(), b"/right");
    }

    #[tokio::test]
    async fn template_registrations_are_introspectable() {
        let mut app = Application::new();
        app.set("k", 7u32).bind("lazy", |_cx| 1u32);
        app.mount(Annotate);

        assert_eq!(*app.get::<u32>("k").unwrap(), 7);
        assert!(app.has("lazy"));
        assert!(!app.has("absent"));
        assert_eq!(app.middleware_names(), ["annotate"]);
    }

    #[tokio::test]
    async fn application_serves_as_a_handler() {
        let mut app = Application::new();
        app.mount(Respond { tag: "only", log: Log::default(), body: "via handler" });

        let handler: &dyn Handler = &app;
        let response = handler.handle(request()).await.unwrap();
        assert_eq!(response.body_bytes().as_ref(), b"via handler");
    }
}
