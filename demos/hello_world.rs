//! A minimal server: one exact route, one partial route, and a form echo.

use std::sync::Arc;

use minum::config::Config;
use minum::http::clock::SystemClock;
use minum::http::response::Response;
use minum::http::start_line::Verb;
use minum::router::Router;
use minum::server::connection;
use minum::server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut router = Router::new();

    router.register(Verb::Get, "hello", |_req| async { Response::html_ok("Hello, World!") });

    router.register(Verb::Get, "add_two_numbers", |req| async move {
        let a: i64 = req.query_param("a").unwrap_or("0").parse().unwrap_or(0);
        let b: i64 = req.query_param("b").unwrap_or("0").parse().unwrap_or(0);
        Response::html_ok((a + b).to_string())
    });

    router.register_partial_path(Verb::Get, ".well-known/acme-challenge", |req| async move {
        Response::html_ok(format!("value was {}", req.start_line.path_details.isolated_path))
    });

    let router = Arc::new(router);
    let config = Arc::new(Config::default());

    let server = Server::start("127.0.0.1:8080", move |stream, peer| {
        let router = Arc::clone(&router);
        let config = Arc::clone(&config);
        async move {
            if let Err(e) = connection::serve(stream, peer, &router, &config, &SystemClock).await {
                tracing::warn!(peer = %peer, error = %e, "connection ended with an error");
            }
        }
    })
    .await?;

    println!("listening on http://{}", server.local_addr());
    tokio::signal::ctrl_c().await?;
    server.close().await?;
    Ok(())
}
