use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CurrentSession, now, today};
use crate::error::AppError;
use crate::models::*;
use crate::services::{AttendanceUpdate, ScheduleImport, ScheduleItemCreated, SlotView, WeekView};
use crate::state::AppState;

/// Sunday through Thursday.
const WEEK_GRID_DAYS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekParams {
    date: Option<NaiveDate>,
    days: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleImportRequest {
    data: String,
    #[serde(default = "default_image_type")]
    mime_type: String,
}

fn default_image_type() -> String {
    "image/png".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatusResponse {
    schedule_item_id: String,
    date: NaiveDate,
    status: Option<AttendanceStatus>,
}

pub async fn list_schedule(session: CurrentSession) -> Json<Vec<ScheduleItem>> {
    let ctx = session.context.lock().await;
    Json(ctx.schedule().to_vec())
}

pub async fn create_schedule_item(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<NewScheduleItemRequest>,
) -> Result<Json<ScheduleItemCreated>, AppError> {
    let mut ctx = session.context.lock().await;
    let created = ctx.add_schedule_item(req, now())?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(created))
}

pub async fn update_schedule_item(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateScheduleItemRequest>,
) -> Result<Json<ScheduleItem>, AppError> {
    let mut ctx = session.context.lock().await;
    let item = ctx.update_schedule_item(&id, req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(item))
}

pub async fn delete_schedule_item(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut ctx = session.context.lock().await;
    ctx.delete_schedule_item(&id)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn week(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(params): Query<WeekParams>,
) -> Json<WeekView> {
    let today = today();
    let anchor = params.date.unwrap_or(today);
    let days = params.days.unwrap_or(WEEK_GRID_DAYS);

    let ctx = session.context.lock().await;
    Json(ctx.week_view(anchor, days, today, state.grid))
}

pub async fn today_classes(State(state): State<AppState>, session: CurrentSession) -> Json<Vec<SlotView>> {
    let ctx = session.context.lock().await;
    Json(ctx.today_classes(today(), state.grid))
}

/// Extraction runs without holding the workspace lock.
pub async fn import_schedule(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<ScheduleImportRequest>,
) -> Result<Json<ScheduleImport>, AppError> {
    if req.data.trim().is_empty() {
        return Err(AppError::bad_request("image data must not be empty"));
    }
    let classes = state.extractor.extract_schedule(&req.data, &req.mime_type).await?;

    let mut ctx = session.context.lock().await;
    let report = ctx.import_schedule(classes, now());
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(report))
}

pub async fn mark_attendance(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<MarkAttendanceRequest>,
) -> Result<Json<AttendanceUpdate>, AppError> {
    let mut ctx = session.context.lock().await;
    let update = ctx.mark_attendance(req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(update))
}

pub async fn clear_attendance(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let mut ctx = session.context.lock().await;
    let removed = ctx.clear_attendance(&query.schedule_item_id, query.date)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(removed))
}

pub async fn attendance_status(
    session: CurrentSession,
    Query(query): Query<AttendanceQuery>,
) -> Json<AttendanceStatusResponse> {
    let ctx = session.context.lock().await;
    let status = ctx.attendance_status(&query.schedule_item_id, query.date);
    Json(AttendanceStatusResponse {
        schedule_item_id: query.schedule_item_id,
        date: query.date,
        status,
    })
}
