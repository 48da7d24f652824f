use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use claimdesk_core::clock::LocalClock;
use claimdesk_core::config::DeskConfig;
use claimdesk_core::uploads::UploadStore;
use claimdesk_core::workflow::WorkflowContext;
use claimdesk_core::DeskError;
use rusqlite::Connection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::routes;

/// Shared state for axum handlers.
pub struct AppState {
    db: Mutex<Connection>,
    pub config: DeskConfig,
    pub clock: LocalClock,
    pub uploads: UploadStore,
    pub workflow: WorkflowContext,
}

impl AppState {
    #[must_use]
    pub fn new(conn: Connection, config: DeskConfig) -> Self {
        let clock = config.clock();
        Self::with_clock(conn, config, clock)
    }

    /// State with an explicit clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(conn: Connection, config: DeskConfig, clock: LocalClock) -> Self {
        Self {
            db: Mutex::new(conn),
            uploads: UploadStore::new(config.storage.upload_dir.clone()),
            workflow: WorkflowContext::with_clock(&config, clock),
            clock,
            config,
        }
    }

    /// Run `f` against the database on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or an internal error if the lock is
    /// poisoned or the blocking task panics.
    pub async fn with_db<T, F>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Connection, &Self) -> Result<T, DeskError> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let joined = tokio::task::spawn_blocking(move || {
            let mut conn = state
                .db
                .lock()
                .map_err(|_| DeskError::Internal("database lock poisoned".to_string()))?;
            f(&mut *conn, &*state)
        })
        .await
        .map_err(|e| DeskError::Internal(format!("database task failed: {e}")))?;
        joined.map_err(ApiError::from)
    }
}

/// Build the axum router (separated for testing).
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health::health))
        // Accounts
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        // Contacts
        .route(
            "/vendors",
            get(routes::contacts::list_vendors).post(routes::contacts::create_vendor),
        )
        .route(
            "/assignees",
            get(routes::contacts::list_assignees).post(routes::contacts::create_assignee),
        )
        // Claims
        .route(
            "/claims",
            get(routes::claims::dashboard).post(routes::claims::create_claim),
        )
        .route(
            "/claims/:id",
            get(routes::claims::get_claim)
                .put(routes::claims::update_claim)
                .delete(routes::claims::delete_claim),
        )
        .route("/claims/:id/status", post(routes::claims::change_status))
        .route("/claims/:id/defer", post(routes::claims::defer_claim))
        .route("/claims/:id/close", post(routes::claims::close_claim))
        .route("/claims/:id/log", get(routes::claims::claim_log))
        // Work orders
        .route("/claims/:id/workorders", post(routes::workorders::assign))
        .route("/claims/:id/invite", get(routes::workorders::invite))
        .route("/workorders/:id/pdf", get(routes::workorders::pdf))
        .route(
            "/api/update_workorder_date",
            post(routes::workorders::update_date),
        )
        // Calendar and files
        .route("/calendar", get(routes::calendar::month))
        .route("/uploads/:filename", get(routes::uploads::serve_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until ctrl-c.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: Arc<AppState>, bind: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "claimdesk listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
