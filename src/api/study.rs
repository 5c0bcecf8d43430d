use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use super::{CurrentSession, today};
use crate::error::AppError;
use crate::extraction::{ExtractionSource, StudyPlan, StudyPlanRequest};
use crate::models::*;
use crate::services::{NoteAnalysisApplied, StudyStats, TimerState};
use crate::state::AppState;
use crate::timer::TimerAction;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureParams {
    course_id: Option<String>,
}

/// Comma-separated filters, e.g. `?courseIds=a,b&types=lab`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogParams {
    course_ids: Option<String>,
    types: Option<String>,
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl From<BacklogParams> for BacklogQuery {
    fn from(params: BacklogParams) -> Self {
        BacklogQuery {
            course_ids: split_list(params.course_ids),
            types: split_list(params.types),
        }
    }
}

pub async fn list_lectures(session: CurrentSession, Query(params): Query<LectureParams>) -> Json<Vec<Lecture>> {
    let ctx = session.context.lock().await;
    let lectures = ctx.lectures(params.course_id.as_deref()).into_iter().cloned().collect();
    Json(lectures)
}

pub async fn get_lecture(session: CurrentSession, Path(id): Path<String>) -> Result<Json<Lecture>, AppError> {
    let ctx = session.context.lock().await;
    Ok(Json(ctx.lecture(&id)?.clone()))
}

pub async fn create_lecture(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<NewLectureRequest>,
) -> Result<Json<Lecture>, AppError> {
    let mut ctx = session.context.lock().await;
    let lecture = ctx.add_lecture(req, today())?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(lecture))
}

pub async fn update_lecture(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateLectureRequest>,
) -> Result<Json<Lecture>, AppError> {
    let mut ctx = session.context.lock().await;
    let lecture = ctx.update_lecture(&id, req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(lecture))
}

pub async fn toggle_lecture(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Lecture>, AppError> {
    let mut ctx = session.context.lock().await;
    let lecture = ctx.toggle_lecture(&id)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(lecture))
}

/// The lock is released while the extractor runs; nothing changes if it fails.
pub async fn analyze_lecture(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<NoteAnalysisApplied>, AppError> {
    let content = {
        let ctx = session.context.lock().await;
        ctx.lecture(&id)?.content.clone()
    };
    if content.trim().is_empty() {
        return Err(AppError::bad_request("lecture has no content to analyze"));
    }

    let analysis = state.extractor.analyze_notes(&content).await?;

    let mut ctx = session.context.lock().await;
    let applied = ctx.apply_note_analysis(&id, analysis, today())?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(applied))
}

pub async fn backlog(session: CurrentSession, Query(params): Query<BacklogParams>) -> Json<Vec<Lecture>> {
    let query = BacklogQuery::from(params);
    let ctx = session.context.lock().await;
    Json(ctx.backlog(&query).into_iter().cloned().collect())
}

pub async fn list_tasks(session: CurrentSession, Query(query): Query<TaskQuery>) -> Json<Vec<Task>> {
    let ctx = session.context.lock().await;
    Json(ctx.tasks(&query).into_iter().cloned().collect())
}

pub async fn get_task(session: CurrentSession, Path(id): Path<String>) -> Result<Json<Task>, AppError> {
    let ctx = session.context.lock().await;
    Ok(Json(ctx.task(&id)?.clone()))
}

pub async fn create_task(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let mut ctx = session.context.lock().await;
    let task = ctx.add_task(req, today())?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let mut ctx = session.context.lock().await;
    let task = ctx.update_task(&id, req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut ctx = session.context.lock().await;
    ctx.delete_task(&id)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn import_tasks(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(source): Json<ExtractionSource>,
) -> Result<Json<Vec<Task>>, AppError> {
    if source.is_blank() {
        return Err(AppError::bad_request("nothing to extract tasks from"));
    }
    let extracted = state.extractor.extract_tasks(&source, today()).await?;

    let mut ctx = session.context.lock().await;
    let tasks = ctx.import_tasks(extracted);
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(tasks))
}

pub async fn record_session(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<RecordSessionRequest>,
) -> Result<Json<StudySession>, AppError> {
    let mut ctx = session.context.lock().await;
    let recorded = ctx.record_session(req, Utc::now())?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(recorded))
}

pub async fn timer(session: CurrentSession) -> Json<TimerState> {
    let ctx = session.context.lock().await;
    Json(ctx.timer_state())
}

/// Timer state is not saved; only a logged session triggers a save.
pub async fn control_timer(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(action): Json<TimerAction>,
) -> Result<Json<TimerState>, AppError> {
    let mut ctx = session.context.lock().await;
    let timer = ctx.control_timer(action, Utc::now())?;
    if timer.recorded.is_some() {
        state.sessions.persist(&session.context, &ctx);
    }
    Ok(Json(timer))
}

pub async fn stats(session: CurrentSession) -> Json<StudyStats> {
    let ctx = session.context.lock().await;
    Json(ctx.stats(today()))
}

/// Plans are returned to the caller and never stored.
pub async fn plan(
    State(state): State<AppState>,
    _session: CurrentSession,
    Json(req): Json<StudyPlanRequest>,
) -> Result<Json<StudyPlan>, AppError> {
    req.validate()?;
    let plan = state.extractor.generate_study_plan(&req).await?;
    Ok(Json(plan))
}
