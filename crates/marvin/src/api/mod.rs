//! API module - HTTP handlers behind `/api`
//!
//! Every handler authenticates first, then validates, then talks to the
//! store, and answers with the `{success, data?, error?, message?}` envelope.

pub mod admin_api;
pub mod chat_api;
pub mod document_api;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod info_api;
pub mod memory_api;
pub mod profile_api;
pub mod session_api;

pub use envelope::{ApiJson, ApiJsonOrDefault, ApiResponse};
pub use error::{ApiError, ErrorKind};
pub use extract::{AdminUser, AuthenticatedUser};
