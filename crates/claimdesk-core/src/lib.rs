//! claimdesk-core library.
//!
//! Claim records, their work orders, and the append-only audit trail that
//! follows every status change.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`Result`] with a [`DeskError`];
//!   configuration loading and binaries use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod audit;
pub mod auth;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod model;
pub mod status;
pub mod uploads;
pub mod workflow;

pub use error::{DeskError, ErrorCode, Result};
