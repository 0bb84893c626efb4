use std::future::Future;

use crate::http::request::Request;
use crate::http::response::Response;

/// Application callback producing the reply to a parsed request.
///
/// Invoked once per request, under the listener's work gate. Returning an
/// error before anything was written turns into a `500 Internal Server Error`
/// carrying the error text; returning an error after the head went out tears
/// the connection down.
///
/// ```ignore
/// struct Hello;
///
/// impl Handler for Hello {
///     async fn handle(&self, request: Request, response: &mut Response<'_>) -> anyhow::Result<()> {
///         response.write_str(&format!("Hello from {}!", request.path())).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(
        &self,
        request: Request,
        response: &mut Response<'_>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
