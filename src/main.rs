use plainwire::config::Config;
use plainwire::http::headers::CONTENT_TYPE;
use plainwire::http::protocol::StatusCode;
use plainwire::http::request::Method;
use plainwire::{Handler, Listener, Request, Response};

/// Demo handler: greets on every path, echoes bodies posted to `/echo`.
struct Greeter;

impl Handler for Greeter {
    async fn handle(&self, request: Request, response: &mut Response<'_>) -> anyhow::Result<()> {
        match (request.method(), request.path()) {
            (Method::POST, "/echo") => {
                let body = request.body().cloned().unwrap_or_default();
                response
                    .headers_mut()
                    .set(CONTENT_TYPE, "application/octet-stream")?;
                let mut source: &[u8] = &body;
                response.send_from(&mut source, body.len() as u64).await?;
            }
            (Method::GET, path) => {
                response
                    .headers_mut()
                    .set(CONTENT_TYPE, "text/plain; charset=utf-8")?;
                response.write_str(&format!("Hello from {}!", path)).await?;
            }
            (_, path) => {
                response.set_status(StatusCode::MethodNotAllowed)?;
                response
                    .headers_mut()
                    .set(CONTENT_TYPE, "text/plain; charset=utf-8")?;
                response
                    .write_str(&format!("{} does not accept this method.", path))
                    .await?;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let mut listener = Listener::new(cfg.server, Greeter);
    listener.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    listener.stop().await;
    Ok(())
}
