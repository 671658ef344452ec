//! HTTP surface of the relay: routing, handlers, auth gate, error mapping

mod auth;
mod error;
mod handlers;
mod server;

pub use auth::{BasicAuth, require_basic_auth};
pub use error::{ApiError, MISSING_API_KEY, MISSING_GENERATE_FIELDS};
pub use handlers::{GenerateBody, ModelsBody, ModelsReply};
pub use server::{AppState, GateServer, create_router};
