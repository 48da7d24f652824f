//! HTTP handlers, one module per resource.

pub mod auth;
pub mod calendar;
pub mod claims;
pub mod contacts;
pub mod health;
pub mod uploads;
pub mod workorders;

use serde::Serialize;

/// A successful mutation: the user-facing message, any best-effort
/// warnings, and the resulting data.
#[derive(Debug, Serialize)]
pub struct Flash<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub data: T,
}

impl<T> Flash<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            warnings: Vec::new(),
            data,
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}
