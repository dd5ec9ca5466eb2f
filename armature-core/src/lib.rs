//! Request/response model, middleware chain and logging bootstrap shared by
//! Armature guards.

pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod middleware;

pub use error::*;
pub use form::{parse_body_fields, parse_form};
pub use http::*;
pub use middleware::*;
