//! # Armature CSRF Protection
//!
//! Synchronizer-token CSRF guard for Armature applications. Every response
//! carries a single-use `(name, value)` token pair bound to the session;
//! mutating requests must echo a live pair back.
//!
//! ## Features
//!
//! - **Single-use tokens** - rotated on every request by default
//! - **Persistent mode** - reuse one pair until a validation fails
//! - **Bounded storage** - oldest tokens evicted past `storage_limit`
//! - **Pluggable storage** - in-memory, session-backed, or your own [`TokenStore`]
//! - **Pluggable failure handling** - plain-text 400 by default
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_csrf::{CsrfConfig, CsrfMiddleware, MemoryTokenStore};
//! use armature_core::HttpRequest;
//!
//! let csrf = CsrfMiddleware::new(CsrfConfig::default(), MemoryTokenStore::shared()).unwrap();
//!
//! // Rendering a form: the guard attaches the active pair to the request
//! let mut req = HttpRequest::new("GET", "/form");
//! csrf.process(&mut req).unwrap();
//! let token = csrf.token_from_request(&req).unwrap();
//! assert_eq!(req.attribute("csrf_name"), Some(token.name.as_str()));
//!
//! // Submitting it back passes validation
//! let mut submit = HttpRequest::new("POST", "/form")
//!     .with_form(&[("csrf_name", token.name.as_str()), ("csrf_value", token.value.as_str())])
//!     .unwrap();
//! assert!(csrf.process(&mut submit).unwrap().is_pass());
//! ```
//!
//! ## Session Storage
//!
//! ```rust
//! use armature_csrf::{CsrfConfig, CsrfMiddleware, Session};
//!
//! let session = Session::shared();
//! let csrf = CsrfMiddleware::with_session(
//!     CsrfConfig::default().with_persistent_token_mode(true),
//!     session.clone(),
//! )
//! .unwrap();
//!
//! let token = csrf.generate_token().unwrap();
//! assert!(session.read().get("csrf").is_some());
//! assert_eq!(csrf.manager().load_last_key_pair(), Some(token));
//! ```
//!
//! ## Usage with Armature
//!
//! ```ignore
//! use armature_core::{MiddlewareChain, HttpResponse, handler_fn};
//! use armature_csrf::{CsrfConfig, CsrfMiddleware};
//!
//! let csrf = CsrfMiddleware::builder()
//!     .config(CsrfConfig::from_env()?)
//!     .session(session)
//!     .failure_handler_fn(|_req, _next| async {
//!         Ok(HttpResponse::forbidden().with_text("Session expired, reload the form"))
//!     })
//!     .build()?;
//!
//! let chain = MiddlewareChain::new().with(csrf);
//! let response = chain.apply(request, handler_fn(render_form)).await?;
//! ```
//!
//! ## Concurrency
//!
//! A guard serializes its own validate/rotate/evict sequence, so requests
//! through one `CsrfMiddleware` (and its clones) never interleave. Separate
//! guards sharing one store are not coordinated: concurrent requests can still
//! lose updates or evict a just-issued token.

pub mod config;
pub mod error;
pub mod failure;
pub mod manager;
pub mod middleware;
pub mod session;
pub mod storage;
pub mod token;

pub use config::{CsrfConfig, DEFAULT_PREFIX, DEFAULT_STORAGE_LIMIT, MIN_STRENGTH};
pub use error::{CsrfError, Result};
pub use failure::{DefaultFailureHandler, FAILURE_MESSAGE, FailureHandler, FnFailureHandler};
pub use manager::TokenManager;
pub use middleware::{CsrfMiddleware, CsrfMiddlewareBuilder, Verdict};
pub use session::{Session, SessionTokenStore, SharedSession};
pub use storage::{MemoryTokenStore, SharedTokenStore, TokenStore};
pub use token::{CsrfToken, EntropySource, OsEntropy};
