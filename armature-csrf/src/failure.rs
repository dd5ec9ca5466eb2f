use armature_core::{Error as ArmatureError, HttpRequest, HttpResponse, Next};
use async_trait::async_trait;
use std::future::Future;

/// Body of the default failure response
pub const FAILURE_MESSAGE: &str = "Failed CSRF check!";

/// Produces the response for a request that failed CSRF validation.
///
/// The request already carries the freshly issued token attributes, so a
/// handler may re-render a form or forward to `next` itself.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, ArmatureError>;
}

/// Plain-text 400 response
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureHandler;

#[async_trait]
impl FailureHandler for DefaultFailureHandler {
    async fn handle(&self, _req: HttpRequest, _next: Next) -> Result<HttpResponse, ArmatureError> {
        Ok(HttpResponse::bad_request().with_text(FAILURE_MESSAGE))
    }
}

/// Adapts an async closure into a [`FailureHandler`]
pub struct FnFailureHandler<F>(pub F);

#[async_trait]
impl<F, Fut> FailureHandler for FnFailureHandler<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse, ArmatureError>> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, ArmatureError> {
        (self.0)(req, next).await
    }
}
