//! Minimal Stoa application.
//!
//! Run with `cargo run --example hello`, then:
//!
//! ```text
//! curl -i http://127.0.0.1:8080/
//! ```

use stoa::{
    Application, BoxFuture, Context, MiddlewareResult, Next, Response, Server, ServerConfig,
};

/// Logs the request line and how long the rest of the chain took.
fn request_log<'a>(
    cx: &'a mut Context,
    next: Next<'a, Context, Response>,
) -> BoxFuture<'a, MiddlewareResult<Response>> {
    Box::pin(async move {
        let started = std::time::Instant::now();
        let method = cx.request().method().clone();
        let path = cx.request().path().to_string();

        let response = next.run(cx).await?;

        tracing::info!(
            "{} {} -> {} in {:?}",
            method,
            path,
            response.status_code(),
            started.elapsed()
        );
        Ok(response)
    })
}

/// Greets using the shared application name.
fn greet<'a>(
    cx: &'a mut Context,
    _next: Next<'a, Context, Response>,
) -> BoxFuture<'a, MiddlewareResult<Response>> {
    Box::pin(async move {
        let name = cx.get::<String>("app-name").unwrap();
        Ok(Response::text(format!("hello from {name}\n")))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut app = Application::new();
    app.set("app-name", "stoa".to_string());
    app.mount_fn("request-log", request_log);
    app.mount_fn("greet", greet);

    let config = ServerConfig::builder().addr("127.0.0.1:8080").build();
    let server = Server::new(config, app);
    server.run().await?;
    Ok(())
}
