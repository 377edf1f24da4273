//! HTTP surface for `anchord`.
//!
//! **Browser flow** (HTML, form posts, 303 redirects):
//! - `GET  /`: redirect to the dashboard or the sign-in page
//! - `GET|POST /sign-in`, `GET|POST /sign-up`, `POST /sign-out`
//! - `GET  /dashboard`: greeting, energy selector, capacity plan
//! - `POST /dashboard/energy`: record today's energy level
//! - `POST /dashboard/tasks/{status_id}`: tick or untick a checklist item
//!
//! **JSON API** (session cookie or `Authorization: Bearer <token>`):
//! - `GET  /health`
//! - `GET  /api/me`, `GET /api/dashboard`
//! - `GET  /api/daily-log/today`, `PUT /api/daily-log`,
//!   `PUT /api/daily-log/tasks/{status_id}`
//! - `GET|POST /api/anchor-tasks`, `PATCH /api/anchor-tasks/{id}`
//! - `GET  /api/playbook`, `/api/playbook/dopamine-menu`, `/api/playbook/meals`
//! - `GET|POST /api/goals`, `PATCH /api/goals/{id}`
//! - `GET|POST /api/noodles-logs`

mod api;
mod extract;
mod pages;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use tower_http::cors::CorsLayer;

use crate::error::{AnchorError, StoreError};
use crate::planner::{MSG_DATABASE, Planner};

pub use extract::{CurrentUser, MaybeUser, session_token};

// ── Server state ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct AppState {
    pub planner: Planner,
}

impl AppState {
    pub fn new(planner: Planner) -> Self {
        Self { planner }
    }
}

pub(crate) type HandlerError = (StatusCode, String);

/// Map a typed failure onto a status code and a user-facing message.
pub(crate) fn handler_error(err: AnchorError) -> HandlerError {
    match err {
        AnchorError::Validation(v) => (StatusCode::UNPROCESSABLE_ENTITY, v.message),
        AnchorError::Store(e @ StoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, e.to_string()),
        AnchorError::Store(e @ StoreError::Conflict { .. }) => (StatusCode::CONFLICT, e.to_string()),
        AnchorError::Auth(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
        other => {
            tracing::error!(error = %other, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_DATABASE.to_string())
        }
    }
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Browser flow.
        .route("/", get(pages::index))
        .route("/sign-in", get(pages::sign_in_form).post(pages::sign_in))
        .route("/sign-up", get(pages::sign_up_form).post(pages::sign_up))
        .route("/sign-out", post(pages::sign_out))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/energy", post(pages::set_energy))
        .route("/dashboard/tasks/{status_id}", post(pages::toggle_task))
        // Health.
        .route("/health", get(api::health))
        // Account.
        .route("/api/me", get(api::me))
        .route("/api/dashboard", get(api::dashboard))
        // Daily log.
        .route("/api/daily-log/today", get(api::today))
        .route("/api/daily-log", put(api::upsert_daily_log))
        .route("/api/daily-log/tasks/{status_id}", put(api::set_task_completion))
        // Anchor tasks.
        .route(
            "/api/anchor-tasks",
            get(api::list_anchor_tasks).post(api::create_anchor_task),
        )
        .route("/api/anchor-tasks/{id}", patch(api::update_anchor_task))
        // Playbook. Static paths before the query-driven listing.
        .route("/api/playbook/dopamine-menu", get(api::dopamine_menu))
        .route("/api/playbook/meals", get(api::meals))
        .route("/api/playbook", get(api::playbook))
        // Goals.
        .route("/api/goals", get(api::list_goals).post(api::create_goal))
        .route("/api/goals/{id}", patch(api::update_goal))
        // Dog-care logs.
        .route(
            "/api/noodles-logs",
            get(api::list_noodles_logs).post(api::create_noodles_log),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c.await;

    tracing::info!("anchord shutting down");
}
