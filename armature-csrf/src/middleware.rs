use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use crate::failure::{DefaultFailureHandler, FailureHandler, FnFailureHandler};
use crate::manager::TokenManager;
use crate::session::{SessionTokenStore, SharedSession};
use crate::storage::SharedTokenStore;
use crate::token::{CsrfToken, EntropySource};
use armature_core::{Error as ArmatureError, HttpRequest, HttpResponse, Middleware, Next};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of running the guard over one request
#[derive(Debug)]
pub enum Verdict {
    /// Forward to the next handler with this token attached
    Pass(CsrfToken),
    /// Validation failed; a replacement token is attached
    Reject { token: CsrfToken, reason: CsrfError },
}

impl Verdict {
    /// Token attached to the request
    pub fn token(&self) -> &CsrfToken {
        match self {
            Verdict::Pass(token) | Verdict::Reject { token, .. } => token,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }
}

/// CSRF protection middleware
///
/// Clones share the same store, failure handler and request serialization
/// lock.
///
/// Submitted tokens are read from JSON object or URL-encoded form bodies.
/// `multipart/form-data` bodies are not parsed, so a multipart request only
/// passes when `header_fallback` is enabled and the token travels in the
/// `X-CSRF-Name`/`X-CSRF-Value` headers.
#[derive(Clone)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
    manager: TokenManager,
    failure_handler: Arc<dyn FailureHandler>,
    // Serializes validate/rotate/evict for requests through this guard
    serial: Arc<Mutex<()>>,
}

impl CsrfMiddleware {
    pub fn builder() -> CsrfMiddlewareBuilder {
        CsrfMiddlewareBuilder::default()
    }

    /// Create a guard over an explicit token store
    pub fn new(config: CsrfConfig, storage: SharedTokenStore) -> Result<Self> {
        Self::builder().config(config).storage(storage).build()
    }

    /// Create a guard storing tokens in the active session
    pub fn with_session(config: CsrfConfig, session: SharedSession) -> Result<Self> {
        Self::builder().config(config).session(session).build()
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    pub fn manager(&self) -> &TokenManager {
        &self.manager
    }

    /// Attribute / body key holding the token name
    pub fn token_name_key(&self) -> String {
        self.config.name_key()
    }

    /// Attribute / body key holding the token value
    pub fn token_value_key(&self) -> String {
        self.config.value_key()
    }

    pub fn persistent_token_mode(&self) -> bool {
        self.config.persistent_token_mode
    }

    pub fn storage_limit(&self) -> usize {
        self.config.storage_limit
    }

    /// Issue a new token outside the request flow
    pub fn generate_token(&self) -> Result<CsrfToken> {
        self.manager.generate_token()
    }

    /// Token attached to a request by this guard
    pub fn token_from_request(&self, request: &HttpRequest) -> Option<CsrfToken> {
        let name = request.attribute(&self.config.name_key())?;
        let value = request.attribute(&self.config.value_key())?;
        Some(CsrfToken::new(name, value))
    }

    /// Check if request needs CSRF validation
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        self.config.is_protected_method(&request.method)
            && !self.config.is_excluded_path(&request.path)
    }

    /// Run validation and token rotation, attaching the active token to the
    /// request. Only entropy failures are returned as errors.
    pub fn process(&self, request: &mut HttpRequest) -> Result<Verdict> {
        let _serial = self.serial.lock();

        if self.needs_protection(request) {
            let (name, value) = self.submitted_token(request);
            let failure = match (&name, &value) {
                (Some(name), Some(value)) if self.manager.validate_token(name, value) => None,
                (Some(_), Some(_)) => Some(CsrfError::InvalidToken),
                _ => Some(CsrfError::MissingToken),
            };

            if let Some(reason) = failure {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    %reason,
                    "CSRF validation failed"
                );
                if let Some(name) = &name {
                    self.manager.remove_token(name);
                }
                let token = self.manager.generate_token()?;
                self.attach(request, &token);
                self.manager.enforce_storage_limit();
                return Ok(Verdict::Reject { token, reason });
            }

            if !self.config.persistent_token_mode {
                if let Some(name) = &name {
                    // Consumed; rotation below replaces it
                    self.manager.remove_token(name);
                }
            }
        }

        let token = if self.config.persistent_token_mode {
            match self.manager.load_last_key_pair() {
                Some(token) => {
                    debug!(token_name = %token.name, "Reusing persistent CSRF token");
                    token
                }
                None => self.manager.generate_token()?,
            }
        } else {
            self.manager.generate_token()?
        };

        self.attach(request, &token);
        self.manager.enforce_storage_limit();
        Ok(Verdict::Pass(token))
    }

    fn attach(&self, request: &mut HttpRequest, token: &CsrfToken) {
        request.set_attribute(self.config.name_key(), token.name.clone());
        request.set_attribute(self.config.value_key(), token.value.clone());
    }

    /// Submitted name and value; non-string body members count as absent
    fn submitted_token(&self, request: &HttpRequest) -> (Option<String>, Option<String>) {
        let name_key = self.config.name_key();
        let value_key = self.config.value_key();

        let (mut name, mut value) = match request.parsed_body() {
            Some(fields) => (
                fields.get(&name_key).and_then(Value::as_str).map(String::from),
                fields.get(&value_key).and_then(Value::as_str).map(String::from),
            ),
            None => (None, None),
        };

        if self.config.header_fallback {
            if name.is_none() {
                name = request.header(&self.config.name_header()).map(String::from);
            }
            if value.is_none() {
                value = request.header(&self.config.value_header()).map(String::from);
            }
        }

        (name, value)
    }
}

#[async_trait]
impl Middleware for CsrfMiddleware {
    async fn handle(
        &self,
        mut req: HttpRequest,
        next: Next,
    ) -> std::result::Result<HttpResponse, ArmatureError> {
        match self.process(&mut req)? {
            Verdict::Pass(_) => next(req).await,
            Verdict::Reject { .. } => self.failure_handler.handle(req, next).await,
        }
    }
}

/// Builder for [`CsrfMiddleware`]
#[derive(Default)]
pub struct CsrfMiddlewareBuilder {
    config: CsrfConfig,
    storage: Option<SharedTokenStore>,
    session: Option<SharedSession>,
    failure_handler: Option<Arc<dyn FailureHandler>>,
    entropy: Option<Arc<dyn EntropySource>>,
}

impl CsrfMiddlewareBuilder {
    pub fn config(mut self, config: CsrfConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an explicit token store; takes precedence over a session
    pub fn storage(mut self, storage: SharedTokenStore) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Keep tokens in this session under the configured prefix
    pub fn session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn failure_handler<H: FailureHandler + 'static>(mut self, handler: H) -> Self {
        self.failure_handler = Some(Arc::new(handler));
        self
    }

    /// Use an async closure as the failure handler
    pub fn failure_handler_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<HttpResponse, ArmatureError>> + Send + 'static,
    {
        self.failure_handler(FnFailureHandler(f))
    }

    pub fn entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Validate the configuration and resolve storage
    pub fn build(self) -> Result<CsrfMiddleware> {
        let prefix = self.config.prefix.clone();
        let config = self.config.with_prefix(prefix);
        config.validate()?;

        let store = match (self.storage, self.session) {
            (Some(storage), _) => storage,
            (None, Some(session)) => SessionTokenStore::shared(session, config.prefix.clone()),
            (None, None) => {
                return Err(CsrfError::Configuration(
                    "CSRF middleware failed. No token storage or active session found.".to_string(),
                ));
            }
        };

        let mut manager = TokenManager::new(
            store,
            config.prefix.clone(),
            config.strength,
            config.storage_limit,
        );
        if let Some(entropy) = self.entropy {
            manager = manager.with_entropy(entropy);
        }

        let failure_handler: Arc<dyn FailureHandler> = match self.failure_handler {
            Some(handler) => handler,
            None => Arc::new(DefaultFailureHandler),
        };

        Ok(CsrfMiddleware {
            config: Arc::new(config),
            manager,
            failure_handler,
            serial: Arc::new(Mutex::new(())),
        })
    }
}
