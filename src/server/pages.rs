//! HTML handlers for the browser flow.

use std::sync::Arc;

use axum::Form;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::error::{AnchorError, StoreError};
use crate::model::User;
use crate::planner::{ActionState, MSG_DATABASE, SignedIn};
use crate::server::{AppState, MaybeUser};
use crate::validate::{SignInForm, SignUpForm};
use crate::view::html;

pub(super) async fn index(MaybeUser(user): MaybeUser) -> Redirect {
    match user {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/sign-in"),
    }
}

pub(super) async fn sign_in_form(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(html::sign_in_page(&ActionState::default())).into_response()
}

pub(super) async fn sign_up_form(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(html::sign_up_page(&ActionState::default())).into_response()
}

/// Password hashing is CPU-bound, so it runs off the async workers.
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ActionState>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ActionState> + Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || f(&state)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("auth task failed: {e}");
            Err(ActionState::error(MSG_DATABASE))
        }
    }
}

fn signed_in(state: &AppState, signed: SignedIn) -> Response {
    let cookie = state.planner.sessions().cookie(&signed.token);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()
}

pub(super) async fn sign_in(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignInForm>,
) -> Response {
    match blocking(&state, move |s| s.planner.sign_in(&form)).await {
        Ok(signed) => signed_in(&state, signed),
        Err(action) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(html::sign_in_page(&action)),
        )
            .into_response(),
    }
}

pub(super) async fn sign_up(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignUpForm>,
) -> Response {
    match blocking(&state, move |s| s.planner.sign_up(&form)).await {
        Ok(signed) => signed_in(&state, signed),
        Err(action) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(html::sign_up_page(&action)),
        )
            .into_response(),
    }
}

pub(super) async fn sign_out(State(state): State<Arc<AppState>>) -> Response {
    let cookie = state.planner.sign_out();
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

fn render_dashboard(state: &AppState, user: &User, action: &ActionState, status: StatusCode) -> Response {
    match state.planner.dashboard(user) {
        Ok(dashboard) => (status, Html(html::dashboard_page(&dashboard, action))).into_response(),
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "dashboard failed");
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_DATABASE).into_response()
        }
    }
}

pub(super) async fn dashboard(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
) -> Response {
    match user {
        Some(user) => render_dashboard(&state, &user, &ActionState::default(), StatusCode::OK),
        None => Redirect::to("/sign-in").into_response(),
    }
}

#[derive(Deserialize)]
pub(super) struct EnergyForm {
    #[serde(default)]
    energy_level: String,
}

pub(super) async fn set_energy(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<EnergyForm>,
) -> Response {
    let Some(user) = user else {
        return Redirect::to("/sign-in").into_response();
    };
    let action = state.planner.upsert_daily_log(Some(&user), &form.energy_level);
    if action.is_error() {
        return render_dashboard(&state, &user, &action, StatusCode::UNPROCESSABLE_ENTITY);
    }
    Redirect::to("/dashboard").into_response()
}

#[derive(Deserialize)]
pub(super) struct TaskToggleForm {
    completed: bool,
}

pub(super) async fn toggle_task(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(status_id): Path<i64>,
    Form(form): Form<TaskToggleForm>,
) -> Response {
    let Some(user) = user else {
        return Redirect::to("/sign-in").into_response();
    };
    match state
        .planner
        .set_task_completion(user.id, status_id, form.completed)
    {
        Ok(_) => Redirect::to("/dashboard").into_response(),
        Err(AnchorError::Store(StoreError::NotFound { .. })) => {
            (StatusCode::NOT_FOUND, "Task not found.").into_response()
        }
        Err(e) => {
            tracing::error!(user_id = user.id, status_id, error = %e, "task toggle failed");
            render_dashboard(
                &state,
                &user,
                &ActionState::error(MSG_DATABASE),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}
