use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use claimdesk_core::DeskError;

use crate::app::AppState;
use crate::error::ApiError;

fn content_type(filename: &str) -> &'static str {
    let ext = FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Serve an uploaded photo by its stored filename. Photo links are embedded
/// in calendar invites, so this route needs no session.
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mime = content_type(&filename);
    let uploads = state.uploads.clone();
    let bytes = tokio::task::spawn_blocking(move || uploads.read(&filename))
        .await
        .map_err(|e| DeskError::Internal(format!("upload read failed: {e}")))??;
    Ok(([(CONTENT_TYPE, mime)], bytes))
}
