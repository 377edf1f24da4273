//! JSON API handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnchorError, ValidationError};
use crate::model::{
    AnchorTask, AnchorTaskPatch, DailyLogWithTasks, EnergyLevel, FutureGoal, GoalPatch,
    GoalStatus, NewGoal, NewNoodlesLog, NoodlesLog, PlaybookFilter, PlaybookItem,
    PlaybookItemType, TaskStatusView, User,
};
use crate::server::{AppState, CurrentUser, HandlerError, handler_error};
use crate::view::Dashboard;

type ApiResult<T> = Result<Json<T>, HandlerError>;

fn ok<T>(result: Result<T, AnchorError>) -> ApiResult<T> {
    result.map(Json).map_err(handler_error)
}

// ── Health ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub(super) struct HealthResponse {
    status: String,
    version: String,
    tables: BTreeMap<&'static str, i64>,
}

pub(super) async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let counts = state
        .planner
        .store()
        .table_counts()
        .map_err(|e| handler_error(e.into()))?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tables: counts.into_iter().collect(),
    }))
}

// ── Account ───────────────────────────────────────────────────────────────

pub(super) async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub(super) async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Dashboard> {
    ok(state.planner.dashboard(&user))
}

// ── Daily log ─────────────────────────────────────────────────────────────

pub(super) async fn today(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Option<DailyLogWithTasks>> {
    ok(state.planner.daily_log_for_today(user.id))
}

#[derive(Deserialize)]
pub(super) struct EnergyRequest {
    energy_level: String,
}

#[derive(Serialize)]
pub(super) struct EnergyResponse {
    message: String,
    created: bool,
    statuses_created: usize,
    today: Option<DailyLogWithTasks>,
}

pub(super) async fn upsert_daily_log(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<EnergyRequest>,
) -> ApiResult<EnergyResponse> {
    let level: EnergyLevel = req
        .energy_level
        .parse()
        .map_err(|e: ValidationError| handler_error(e.into()))?;
    let outcome = state
        .planner
        .set_energy(user.id, level)
        .map_err(handler_error)?;
    let today = state
        .planner
        .daily_log_for_today(user.id)
        .map_err(handler_error)?;
    Ok(Json(EnergyResponse {
        message: format!("Energy level set to {level}."),
        created: outcome.created,
        statuses_created: outcome.statuses_created,
        today,
    }))
}

#[derive(Deserialize)]
pub(super) struct CompletionRequest {
    completed: bool,
}

pub(super) async fn set_task_completion(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(status_id): Path<i64>,
    Json(req): Json<CompletionRequest>,
) -> ApiResult<TaskStatusView> {
    ok(state
        .planner
        .set_task_completion(user.id, status_id, req.completed))
}

// ── Anchor tasks ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct AnchorTaskQuery {
    #[serde(default)]
    include_inactive: bool,
}

pub(super) async fn list_anchor_tasks(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<AnchorTaskQuery>,
) -> ApiResult<Vec<AnchorTask>> {
    ok(state.planner.list_anchor_tasks(user.id, q.include_inactive))
}

#[derive(Deserialize)]
pub(super) struct NewAnchorTaskRequest {
    task_name: String,
    #[serde(default)]
    description: Option<String>,
}

pub(super) async fn create_anchor_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<NewAnchorTaskRequest>,
) -> Result<(StatusCode, Json<AnchorTask>), HandlerError> {
    let task = state
        .planner
        .create_anchor_task(user.id, &req.task_name, req.description.as_deref())
        .map_err(handler_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub(super) async fn update_anchor_task(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<AnchorTaskPatch>,
) -> ApiResult<AnchorTask> {
    ok(state.planner.update_anchor_task(user.id, id, &patch))
}

// ── Playbook ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct PlaybookQuery {
    /// Comma-separated item types.
    #[serde(default)]
    types: Option<String>,
    #[serde(default)]
    max_energy: Option<i64>,
}

pub(super) async fn playbook(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Query(q): Query<PlaybookQuery>,
) -> ApiResult<Vec<PlaybookItem>> {
    let types = q
        .types
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse::<PlaybookItemType>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| handler_error(e.into()))?;
    ok(state.planner.playbook(&PlaybookFilter {
        types,
        max_energy: q.max_energy,
    }))
}

pub(super) async fn dopamine_menu(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
) -> ApiResult<Vec<PlaybookItem>> {
    ok(state.planner.dopamine_menu())
}

#[derive(Deserialize)]
pub(super) struct MealQuery {
    #[serde(default)]
    max_energy: Option<i64>,
}

pub(super) async fn meals(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Query(q): Query<MealQuery>,
) -> ApiResult<Vec<PlaybookItem>> {
    ok(state.planner.meals(q.max_energy))
}

// ── Goals ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct GoalQuery {
    #[serde(default)]
    status: Option<GoalStatus>,
}

pub(super) async fn list_goals(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Query(q): Query<GoalQuery>,
) -> ApiResult<Vec<FutureGoal>> {
    ok(state.planner.list_goals(q.status))
}

pub(super) async fn create_goal(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Json(goal): Json<NewGoal>,
) -> Result<(StatusCode, Json<FutureGoal>), HandlerError> {
    let goal = state.planner.create_goal(&goal).map_err(handler_error)?;
    Ok((StatusCode::CREATED, Json(goal)))
}

pub(super) async fn update_goal(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<GoalPatch>,
) -> ApiResult<FutureGoal> {
    ok(state.planner.update_goal(id, &patch))
}

// ── Dog-care logs ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct NoodlesQuery {
    #[serde(default)]
    from: Option<NaiveDate>,
    #[serde(default)]
    to: Option<NaiveDate>,
}

pub(super) async fn list_noodles_logs(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Query(q): Query<NoodlesQuery>,
) -> ApiResult<Vec<NoodlesLog>> {
    ok(state.planner.noodles_logs(q.from, q.to))
}

#[derive(Deserialize)]
pub(super) struct NoodlesRequest {
    /// Defaults to today.
    #[serde(default)]
    log_date: Option<NaiveDate>,
    activity_type: String,
    #[serde(default)]
    duration_minutes: Option<i64>,
    #[serde(default)]
    notes: Option<String>,
}

pub(super) async fn create_noodles_log(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    Json(req): Json<NoodlesRequest>,
) -> Result<(StatusCode, Json<NoodlesLog>), HandlerError> {
    let entry = NewNoodlesLog {
        log_date: req.log_date.unwrap_or_else(|| state.planner.today()),
        activity_type: req.activity_type,
        duration_minutes: req.duration_minutes,
        notes: req.notes,
    };
    let log = state.planner.log_noodles(&entry).map_err(handler_error)?;
    Ok((StatusCode::CREATED, Json(log)))
}
