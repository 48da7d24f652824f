//! claimdesk HTTP surface.
//!
//! [`app::router`] builds the full axum router over a shared [`AppState`];
//! handlers run their database work on the blocking pool against one
//! `rusqlite` connection.

pub mod app;
pub mod error;
pub mod routes;
pub mod session;

pub use app::{AppState, router, serve};
pub use error::ApiError;
