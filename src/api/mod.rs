mod auth;
mod courses;
mod schedule;
mod study;

use axum::Json;
use axum::routing::{delete, patch, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub use auth::{CurrentSession, LoginResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/workspace", get(get_workspace))
        .route("/settings", put(update_settings))
        .route("/courses", get(courses::list_courses).post(courses::create_course))
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .patch(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/courses/{id}/staff", post(courses::add_staff))
        .route("/courses/{id}/resources", post(courses::add_resource))
        .route("/courses/{id}/resources/{resource_id}", delete(courses::delete_resource))
        .route("/schedule", get(schedule::list_schedule).post(schedule::create_schedule_item))
        .route(
            "/schedule/{id}",
            patch(schedule::update_schedule_item).delete(schedule::delete_schedule_item),
        )
        .route("/schedule/week", get(schedule::week))
        .route("/schedule/today", get(schedule::today_classes))
        .route("/schedule/import", post(schedule::import_schedule))
        .route(
            "/attendance",
            post(schedule::mark_attendance).delete(schedule::clear_attendance),
        )
        .route("/attendance/status", get(schedule::attendance_status))
        .route("/lectures", get(study::list_lectures).post(study::create_lecture))
        .route("/lectures/{id}", get(study::get_lecture).patch(study::update_lecture))
        .route("/lectures/{id}/toggle", post(study::toggle_lecture))
        .route("/lectures/{id}/analyze", post(study::analyze_lecture))
        .route("/backlog", get(study::backlog))
        .route("/tasks", get(study::list_tasks).post(study::create_task))
        .route(
            "/tasks/{id}",
            get(study::get_task).patch(study::update_task).delete(study::delete_task),
        )
        .route("/tasks/import", post(study::import_tasks))
        .route("/sessions", post(study::record_session))
        .route("/timer", get(study::timer).post(study::control_timer))
        .route("/stats", get(study::stats))
        .route("/planner", post(study::plan))
        .with_state(state)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.sessions.store().health().await?;
    Ok(StatusCode::OK)
}

async fn get_workspace(session: CurrentSession) -> Json<Workspace> {
    let ctx = session.context.lock().await;
    Json(ctx.snapshot())
}

async fn update_settings(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(req): Json<SettingsRequest>,
) -> Json<WorkspaceSettings> {
    let mut ctx = session.context.lock().await;
    let settings = ctx.update_settings(req);
    state.sessions.persist(&session.context, &ctx);
    Json(settings)
}
