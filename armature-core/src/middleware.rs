// Middleware system for request/response processing

use crate::logging::{debug, trace};
use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed response future produced by handlers and continuations
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for the next handler in the middleware chain
pub type Next = Box<dyn FnOnce(HttpRequest) -> ResponseFuture + Send>;

/// Type alias for handler functions
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> ResponseFuture + Send + Sync>;

/// Wrap an async function as a [`HandlerFn`]
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req: HttpRequest| -> ResponseFuture { Box::pin(f(req)) })
}

/// Middleware trait for processing requests before they reach the handler
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass to next middleware
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        (**self).handle(req, next).await
    }
}

/// Middleware chain executor
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        let mut mws = (*self.middlewares).clone();
        mws.push(Arc::new(middleware));
        self.middlewares = Arc::new(mws);
    }

    /// Builder-style variant of [`use_middleware`](Self::use_middleware)
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.use_middleware(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(&self, req: HttpRequest, handler: HandlerFn) -> Result<HttpResponse, Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(&self, index: usize, req: HttpRequest, handler: HandlerFn) -> ResponseFuture {
        let Some(middleware) = self.middlewares.get(index).cloned() else {
            trace!("Middleware chain complete, calling handler");
            return handler(req);
        };

        let chain = self.clone();
        trace!(middleware_index = index, "Executing middleware");
        Box::pin(async move {
            middleware
                .handle(
                    req,
                    Box::new(move |req| chain.execute_from(index + 1, req, handler)),
                )
                .await
        })
    }
}
