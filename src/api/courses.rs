use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::CurrentSession;
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub async fn list_courses(session: CurrentSession) -> Json<Vec<Course>> {
    let ctx = session.context.lock().await;
    Json(ctx.courses().to_vec())
}

pub async fn get_course(session: CurrentSession, Path(id): Path<String>) -> Result<Json<Course>, AppError> {
    let ctx = session.context.lock().await;
    Ok(Json(ctx.course(&id)?.clone()))
}

pub async fn create_course(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let mut ctx = session.context.lock().await;
    let course = ctx.add_course(req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let mut ctx = session.context.lock().await;
    let course = ctx.update_course(&id, req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut ctx = session.context.lock().await;
    ctx.delete_course(&id)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_staff(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<NewStaffRequest>,
) -> Result<Json<CourseStaff>, AppError> {
    let mut ctx = session.context.lock().await;
    let staff = ctx.add_staff(&id, req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(staff))
}

pub async fn add_resource(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<NewResourceRequest>,
) -> Result<Json<CourseResource>, AppError> {
    let mut ctx = session.context.lock().await;
    let resource = ctx.add_resource(&id, req)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(Json(resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    session: CurrentSession,
    Path((id, resource_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let mut ctx = session.context.lock().await;
    ctx.delete_resource(&id, &resource_id)?;
    state.sessions.persist(&session.context, &ctx);
    Ok(StatusCode::NO_CONTENT)
}
