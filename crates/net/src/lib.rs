pub mod auth;
pub mod error;
pub mod profile;
pub mod router;
pub mod server;

pub use auth::{JwtDecoder, TokenDecoder};
pub use server::{build_app, serve, AppState};
